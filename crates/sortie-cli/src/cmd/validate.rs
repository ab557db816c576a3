use crate::output::print_json;
use anyhow::Context;
use sortie_core::config::{Plan, WarnLevel};
use std::path::Path;

pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let plan = Plan::load(path).context("failed to load plan")?;
    let warnings = plan.validate();

    if json {
        let value = serde_json::json!({
            "plan": path.display().to_string(),
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Plan is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("plan validation found errors");
    }
    Ok(())
}
