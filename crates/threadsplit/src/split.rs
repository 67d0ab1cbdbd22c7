use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use futures::future::join_all;
use threadsplit_core::{check_input_size, split_lines, CompiledConfig, Line, SplitOutcome, SplitWarning};

use crate::output::{output_keys, sink_for, RecordSink};
use crate::prelude::{eprintln, println, *};

#[derive(Debug, clap::Args)]
pub struct SplitOptions {
    /// Message-thread PDF exports to split
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory; each input gets its own folder or archive inside it
    #[arg(short, long, env = "THREADSPLIT_OUT", default_value = "messages")]
    out: PathBuf,

    /// Write one ZIP archive per input instead of a folder
    #[arg(long)]
    zip: bool,

    /// Extension of the per-message files (overrides the config file)
    #[arg(long)]
    extension: Option<String>,
}

/// What happened to one input.
#[derive(Debug)]
pub struct InputSummary {
    pub input: PathBuf,
    pub destination: PathBuf,
    pub records: usize,
    pub warnings: Vec<SplitWarning>,
    pub removed_lines: usize,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Read an input, refusing files over the size limit before loading them.
pub fn read_input(path: &Path, config: &CompiledConfig) -> Result<Vec<u8>, Error> {
    let size = std::fs::metadata(path)
        .map_err(|e| Error::read(path, e))?
        .len();
    check_input_size(size, config)?;
    std::fs::read(path).map_err(|e| Error::read(path, e))
}

/// PDF bytes -> extracted lines, page numbers kept.
pub fn extract_lines(bytes: &[u8]) -> Result<Vec<Line>, Error> {
    let pages = pdf::extract_pages(bytes)?;
    Ok(Line::collect(pages.into_iter().map(|p| (p.number, p.lines))))
}

pub fn split_bytes(bytes: &[u8], config: &CompiledConfig) -> Result<SplitOutcome, Error> {
    check_input_size(bytes.len() as u64, config)?;
    let lines = extract_lines(bytes)?;
    Ok(split_lines(lines, config)?)
}

pub fn split_file(path: &Path, config: &CompiledConfig) -> Result<SplitOutcome, Error> {
    let bytes = read_input(path, config)?;
    split_bytes(&bytes, config)
}

/// Split one input and hand the rendered files to its sink.
pub fn process_input(
    input: &Path,
    sink: &dyn RecordSink,
    config: &CompiledConfig,
) -> Result<InputSummary, Error> {
    let outcome = split_file(input, config)?;
    let files = outcome.files(&config.output);
    sink.write(&files)?;

    Ok(InputSummary {
        input: input.to_path_buf(),
        destination: sink.location().to_path_buf(),
        records: outcome.records.len(),
        warnings: outcome.warnings,
        removed_lines: outcome.report.removed(),
    })
}

/// Run a synchronous job on the blocking pool.
async fn run_blocking<T, F>(input: PathBuf, f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Task(input, e.to_string()))?
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

pub async fn run(options: SplitOptions, global: crate::Global) -> Result<()> {
    let mut config = crate::config::load(global.config.as_deref())?;
    if let Some(extension) = options.extension {
        config.output.extension = extension;
    }
    let config = Arc::new(config.compile()?);

    let keys = output_keys(&options.inputs);
    let jobs = options.inputs.iter().zip(&keys).map(|(input, key)| {
        let sink = sink_for(&options.out, key, options.zip);
        let config = Arc::clone(&config);
        let input = input.clone();
        run_blocking(input.clone(), move || {
            process_input(&input, sink.as_ref(), &config)
        })
    });

    let results = join_all(jobs).await;

    let mut failed = 0;
    for (input, result) in options.inputs.iter().zip(results) {
        match result {
            Ok(summary) => print_summary(&summary, global.verbose),
            Err(err) => {
                failed += 1;
                eprintln!(
                    "{} {}: {}",
                    "error".red().bold(),
                    input.display().to_string().bright_white(),
                    err
                );
            }
        }
    }

    if failed > 0 {
        return Err(eyre!(
            "{} of {} input(s) could not be split",
            failed,
            options.inputs.len()
        ));
    }

    Ok(())
}

fn print_summary(summary: &InputSummary, verbose: bool) {
    println!(
        "{} {} -> {} ({} message(s))",
        "split".green().bold(),
        summary.input.display().to_string().bright_white(),
        summary.destination.display().to_string().cyan(),
        summary.records.to_string().bright_cyan().bold()
    );

    for warning in &summary.warnings {
        eprintln!("  {} {}", "warning".yellow().bold(), warning);
    }

    if verbose {
        eprintln!(
            "  {}: {}",
            "Noise lines removed".green(),
            summary.removed_lines
        );
    }
}
