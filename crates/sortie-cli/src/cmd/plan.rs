use crate::output::{print_json, Table};
use anyhow::Context;
use sortie_core::{config::Plan, Benchmark};
use std::path::Path;

pub fn run(path: &Path, json: bool) -> anyhow::Result<()> {
    let plan = Plan::load(path).context("failed to load plan")?;
    let sorties = plan.build(&workdir(path))?;

    let manifest = sorties.manifest();
    let setup_order: Vec<&str> = sorties.unique_sub_benchmarks().map(|b| b.name()).collect();

    if json {
        let value = serde_json::json!({
            "sample_prefix": plan.sample_prefix,
            "run_stages": plan.run_stages,
            "sorties": manifest,
            "setup_order": setup_order,
        });
        return print_json(&value);
    }

    if manifest.is_empty() {
        println!("No sorties defined.");
        return Ok(());
    }

    let mut table = Table::new(&["SORTIE", "MEMBERS"]).align_right(0);
    for (i, members) in manifest.iter().enumerate() {
        table.row(vec![i.to_string(), members.join(", ")]);
    }
    table.print();
    println!();
    println!("Setup order: {}", setup_order.join(", "));
    println!("Run stages:  {}", plan.run_stages);
    Ok(())
}

/// Shell benchmarks run next to the plan file.
pub(crate) fn workdir(plan_path: &Path) -> std::path::PathBuf {
    match plan_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    }
}
