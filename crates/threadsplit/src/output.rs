//! Where rendered records go.
//!
//! Every input gets its own destination under the output directory, keyed by
//! a sanitized file stem: `<out>/<key>/` for the directory sink and
//! `<out>/<key>_messages.zip` for the ZIP sink.

use std::collections::HashSet;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use threadsplit_core::render::sanitize_component;
use threadsplit_core::{OutputFile, SplitError};
use zip::{write::FileOptions, CompressionMethod};

pub trait RecordSink: Send {
    /// Destination shown to the user.
    fn location(&self) -> &Path;

    /// Write every file, in order.
    fn write(&self, files: &[OutputFile]) -> Result<(), SplitError>;
}

/// One file per record in a directory. The first failure stops the run;
/// files already written stay on disk.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl RecordSink for DirectorySink {
    fn location(&self) -> &Path {
        &self.dir
    }

    fn write(&self, files: &[OutputFile]) -> Result<(), SplitError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| SplitError::write_failure(self.dir.display().to_string(), e))?;

        for file in files {
            let path = self.dir.join(&file.name);
            fs::write(&path, &file.contents)
                .map_err(|e| SplitError::write_failure(path.display().to_string(), e))?;
            log::debug!("wrote {}", path.display());
        }
        Ok(())
    }
}

/// All records in one archive. The archive is assembled in memory and only
/// moved into place once complete.
pub struct ZipSink {
    path: PathBuf,
}

impl ZipSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn build(&self, files: &[OutputFile]) -> Result<Vec<u8>, SplitError> {
        let target = self.path.display().to_string();
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<'_, ()> =
            FileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            zip.start_file(&file.name, options)
                .map_err(|e| SplitError::write_failure(format!("{target}:{}", file.name), e))?;
            zip.write_all(&file.contents)
                .map_err(|e| SplitError::write_failure(format!("{target}:{}", file.name), e))?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| SplitError::write_failure(target.clone(), e))?;
        Ok(cursor.into_inner())
    }
}

impl RecordSink for ZipSink {
    fn location(&self) -> &Path {
        &self.path
    }

    fn write(&self, files: &[OutputFile]) -> Result<(), SplitError> {
        let bytes = self.build(files)?;
        let target = self.path.display().to_string();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SplitError::write_failure(target.clone(), e))?;
        }

        let partial = self.path.with_extension("zip.part");
        fs::write(&partial, &bytes)
            .and_then(|_| fs::rename(&partial, &self.path))
            .map_err(|e| {
                let _ = fs::remove_file(&partial);
                SplitError::write_failure(target, e)
            })?;
        log::debug!("wrote {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}

/// One sanitized, unique key per input, in input order.
pub fn output_keys(inputs: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let base = sanitize_component(&stem, "export");

            let mut key = base.clone();
            let mut n = 2;
            while !used.insert(key.clone()) {
                key = format!("{base}_{n}");
                n += 1;
            }
            key
        })
        .collect()
}

pub fn sink_for(out: &Path, key: &str, zip: bool) -> Box<dyn RecordSink> {
    if zip {
        Box::new(ZipSink::new(out.join(format!("{key}_messages.zip"))))
    } else {
        Box::new(DirectorySink::new(out.join(key)))
    }
}
