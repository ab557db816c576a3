use crate::error::{Result, SortieError};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const PLAN_FILE: &str = "sortie.yaml";

pub fn plan_path(dir: &Path) -> PathBuf {
    dir.join(PLAN_FILE)
}

// ---------------------------------------------------------------------------
// Benchmark name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap())
}

/// Benchmark names end up in metric names, so keep them plain.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(SortieError::InvalidName(name.to_string()));
    }
    Ok(())
}
