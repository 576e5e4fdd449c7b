// qualis/src/commands/run.rs
//
// USE CASE: Evaluate the rule registry against the configured dataset.

use std::path::PathBuf;

use anyhow::Context;
use qualis_core::application::{EvaluationOptions, Evaluator};
use qualis_core::infrastructure::config::build_registry;
use qualis_core::infrastructure::fs::write_report;

use super::{load_config, open_source};
use crate::cli::OutputFormat;
use crate::render::report_text;

/// Returns `true` when every rule passed.
pub async fn execute(
    project_dir: PathBuf,
    select: Vec<String>,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<bool> {
    let start = std::time::Instant::now();
    let verbose = format == OutputFormat::Text;

    // A. Load the Config (Infra)
    let config = load_config(&project_dir)?;
    if verbose {
        println!("⚙️  Project: {} (v{})", config.name, config.version);
    }

    // B. Rules and source
    let mut registry = build_registry(&project_dir, &config)
        .context("Failed to build the rule registry")?;
    if !select.is_empty() {
        registry = registry.select(&select)?;
    }
    let source = open_source(&project_dir, &config)?;

    // C. Evaluate (Application Layer)
    let evaluator = Evaluator::new(config.source.table.as_str())
        .with_options(EvaluationOptions::from(&config.evaluation));
    let report = evaluator
        .run(&registry, &source)
        .await
        .with_context(|| format!("Run aborted on dataset '{}'", config.source.table))?;

    // D. Render
    let rendered = match format {
        OutputFormat::Text => report_text(&report, false),
        OutputFormat::Json => report.to_json()?,
    };
    print!("{}", rendered);
    if format == OutputFormat::Json {
        println!();
    }

    if let Some(path) = output {
        let saved = match format {
            OutputFormat::Text => report_text(&report, true),
            OutputFormat::Json => rendered.clone(),
        };
        write_report(&path, &saved)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        if verbose {
            println!("📄 Report saved to {}", path.display());
        }
    }

    if verbose {
        if report.passed() {
            println!("\n✨ SUCCESS! {} rules passed in {:.2?}", report.results.len(), start.elapsed());
        } else {
            eprintln!("\n❌ FAILURE. Dataset '{}' did not pass.", report.dataset);
        }
    }

    Ok(report.passed())
}
