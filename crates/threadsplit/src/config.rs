use std::path::Path;

use threadsplit_core::SplitConfig;

use crate::error::Error;
use crate::prelude::{println, Result};

/// Load the TOML file given with `--config`, or the defaults without one.
/// Missing keys keep their default values.
pub fn load(path: Option<&Path>) -> Result<SplitConfig, Error> {
    let Some(path) = path else {
        return Ok(SplitConfig::default());
    };

    let text = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
    let config = SplitConfig::from_toml_str(&text)?;
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

/// The effective settings as TOML, after validating that they compile.
pub fn effective_toml(path: Option<&Path>) -> Result<String, Error> {
    let config = load(path)?;
    config.compile()?;
    Ok(config.to_toml_string()?)
}

/// Print the effective configuration, a starting point for a `--config` file.
pub async fn run(global: crate::Global) -> Result<()> {
    println!("{}", effective_toml(global.config.as_deref())?.trim_end());
    Ok(())
}
