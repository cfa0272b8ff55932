use super::open_store;
use crate::output::print_json;
use anyhow::Context;
use kanban_core::config::WarnLevel;
use kanban_core::paths;
use kanban_core::precompile::{precompile, PrecompileOptions};
use std::path::Path;

pub fn run(root: &Path, strict: bool, check: bool, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;

    let config_issues = store.config().validate();
    for issue in &config_issues {
        eprintln!("kanban.yaml: {}", issue.message);
    }
    if config_issues.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("kanban.yaml has errors; fix them before precompiling");
    }

    let options = PrecompileOptions {
        strict: strict || store.config().strict,
        write: !check,
    };
    let report = precompile(&store, &options).context("precompile failed")?;

    if json {
        print_json(&report)?;
    } else {
        for issue in &report.issues {
            println!("{issue}");
        }
        println!("{}", report.summary());
        if report.emitted {
            println!(
                "Snapshot written to {} ({} files updated, {} removed)",
                paths::output_dir(store.root(), store.config()).display(),
                report.written.len(),
                report.removed.len()
            );
        } else if check {
            println!("Check only; nothing written.");
        }
    }

    if report.failed() {
        anyhow::bail!(
            "{} error(s) in strict mode; snapshot not written",
            report.error_count()
        );
    }
    Ok(())
}
