use sortie_core::paths::{self, PLAN_FILE};
use std::path::{Path, PathBuf};

fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve the plan file.
///
/// Priority:
/// 1. `--file` flag / `SORTIE_FILE` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `sortie.yaml`
/// 3. Fall back to `cwd/sortie.yaml`
pub fn resolve_plan(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = cwd();
    find_upward(&cwd).unwrap_or_else(|| paths::plan_path(&cwd))
}

/// Where `sortie init` writes. Never walks upward.
pub fn init_target(explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => paths::plan_path(&cwd()),
    }
}

fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(PLAN_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}
