use std::path::PathBuf;

use colored::Colorize;
use threadsplit_core::noise::filter_noise;
use threadsplit_core::Line;

use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct LinesOptions {
    /// Message-thread PDF export
    input: PathBuf,

    /// Show the lines left after boilerplate removal
    #[arg(long)]
    filtered: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Dump extracted lines with their page and position, for tuning patterns.
pub async fn run(options: LinesOptions, global: crate::Global) -> Result<()> {
    let config = crate::config::load(global.config.as_deref())?.compile()?;

    let input = options.input.clone();
    let filtered = options.filtered;
    let (lines, pages, report) = tokio::task::spawn_blocking(move || -> std::result::Result<_, Error> {
        let bytes = crate::split::read_input(&input, &config)?;
        let pages = pdf::page_count(&bytes)?;
        let lines = crate::split::extract_lines(&bytes)?;
        if filtered {
            let out = filter_noise(lines, &config.noise, &config.header);
            Ok((out.lines, pages, Some(out.report)))
        } else {
            Ok((lines, pages, None))
        }
    })
    .await
    .map_err(|e| Error::Task(options.input.clone(), e.to_string()))??;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
    } else {
        print_lines(&lines);
    }

    if global.verbose {
        eprintln!("{}: {} page(s), {} line(s)", "Document".green(), pages, lines.len());
        if let Some(report) = report {
            eprintln!(
                "{}: removed {} line(s) over {} page(s)",
                "Noise filter".green(),
                report.removed(),
                report.pages
            );
        }
    }

    Ok(())
}

fn print_lines(lines: &[Line]) {
    for line in lines {
        let position = format!("{:>3}:{:<3}", line.page, line.index);
        println!("{} {}", position.bright_black(), line.text);
    }
}
