use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use threadsplit_core::render::{record_file_name, TIMESTAMP_FORMAT};
use threadsplit_core::{CompiledConfig, SplitOutcome};

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct InspectOptions {
    /// Message-thread PDF export
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Records, warnings and filter statistics as JSON
    Json,
    /// One row per record
    Table,
}

const PREVIEW_CHARS: usize = 48;

pub async fn run(options: InspectOptions, global: crate::Global) -> Result<()> {
    let config = Arc::new(crate::config::load(global.config.as_deref())?.compile()?);

    let input = options.input.clone();
    let job_config = Arc::clone(&config);
    let outcome = tokio::task::spawn_blocking(move || crate::split::split_file(&input, &job_config))
        .await
        .map_err(|e| Error::Task(options.input.clone(), e.to_string()))??;

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Table => print_table(&outcome, &config),
    }

    if global.verbose {
        eprintln!(
            "{}: {} page(s), {} repeated, {} marker(s), {} counter(s), {} edge blank(s)",
            "Noise filter".green(),
            outcome.report.pages,
            outcome.report.repeated,
            outcome.report.markers,
            outcome.report.counters.len(),
            outcome.report.blank_edges
        );
    }

    Ok(())
}

fn print_table(outcome: &SplitOutcome, config: &CompiledConfig) {
    if outcome.records.is_empty() {
        println!("No messages found.");
    } else {
        let mut table = new_table();
        table.add_row(prettytable::row![
            "File".bold().cyan(),
            "Timestamp".bold().cyan(),
            "Sender".bold().cyan(),
            "Page".bold().cyan(),
            "Attachments".bold().cyan(),
            "Preview".bold().cyan()
        ]);
        for (i, record) in outcome.records.iter().enumerate() {
            let timestamp = record
                .timestamp
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_else(|| "-".to_string());
            let attachments: Vec<&str> = record.attachments.iter().map(|a| a.as_str()).collect();
            table.add_row(prettytable::row![
                record_file_name(i + 1, record, &config.output).green(),
                timestamp.bright_white(),
                record.sender.as_deref().unwrap_or("-").bright_yellow(),
                record.page,
                attachments.join(", ").bright_black(),
                preview(&record.body)
            ]);
        }
        table.printstd();
    }

    for warning in &outcome.warnings {
        eprintln!("{} {}", "warning".yellow().bold(), warning);
    }
}

/// First line of the body, shortened.
fn preview(body: &str) -> String {
    let first = body.lines().next().unwrap_or("");
    if first.chars().count() > PREVIEW_CHARS {
        let cut: String = first.chars().take(PREVIEW_CHARS - 1).collect();
        format!("{cut}\u{2026}")
    } else {
        first.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_takes_first_line() {
        assert_eq!(preview("Hello\nWorld"), "Hello");
        assert_eq!(preview(""), "");
    }

    #[test]
    fn test_preview_shortens_long_lines() {
        let long = "x".repeat(100);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), PREVIEW_CHARS);
        assert!(shown.ends_with('\u{2026}'));
    }
}
