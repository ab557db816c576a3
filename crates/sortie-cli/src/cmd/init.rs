use anyhow::Context;
use sortie_core::{config::Plan, io};
use std::path::Path;

pub fn run(path: &Path) -> anyhow::Result<()> {
    let yaml = Plan::starter().to_yaml()?;
    let written = io::write_if_missing(path, yaml.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if written {
        println!("Created {}", path.display());
        println!("Next: edit the benchmarks, then 'sortie validate' and 'sortie run'.");
    } else {
        println!("{} already exists; leaving it untouched.", path.display());
    }
    Ok(())
}
