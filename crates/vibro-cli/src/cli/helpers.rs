use super::CliError;
use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use vibro_core::domain::VibroError;
use vibro_core::export::read_record;
use vibro_core::kernels::{PhononSource, PrecomputedModes};
use vibro_core::phonopy::{ForceConstantsRecord, read_force_constants_record};

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("phonons").required(true).args(["phonopy_dir", "record", "modes"])))]
pub(super) struct PhononArgs {
    /// Directory holding phonopy.yaml and FORCE_CONSTANTS
    #[arg(long)]
    phonopy_dir: Option<PathBuf>,

    /// force_constants.json written by `vibroscopy bridge`
    #[arg(long)]
    record: Option<PathBuf>,

    /// Precomputed modes (JSON) for runs without force constants
    #[arg(long)]
    modes: Option<PathBuf>,
}

pub(super) enum LoadedPhonons {
    ForceConstants(ForceConstantsRecord),
    Precomputed(PrecomputedModes),
}

impl LoadedPhonons {
    pub(super) fn source(&self) -> PhononSource<'_> {
        match self {
            Self::ForceConstants(record) => PhononSource::ForceConstants(record),
            Self::Precomputed(modes) => PhononSource::Precomputed(modes),
        }
    }
}

impl PhononArgs {
    pub(super) fn load(&self) -> Result<LoadedPhonons, CliError> {
        if let Some(dir) = &self.phonopy_dir {
            return Ok(LoadedPhonons::ForceConstants(read_force_constants_record(dir)?));
        }
        if let Some(path) = &self.record {
            let record = read_record(path)?;
            let force_constants = ForceConstantsRecord::from_tree(record.data)?;
            return Ok(LoadedPhonons::ForceConstants(force_constants));
        }
        if let Some(path) = &self.modes {
            return Ok(LoadedPhonons::Precomputed(read_json(path, "precomputed modes")?));
        }
        Err(CliError::Usage(
            "one of --phonopy-dir, --record or --modes is required".to_string(),
        ))
    }
}

pub(super) fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T, CliError> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} '{}'", path.display()))?;
    serde_json::from_str(&text).map_err(|error| {
        CliError::Compute(VibroError::invalid_input(format!(
            "malformed {what} '{}': {error}",
            path.display()
        )))
    })
}

pub(super) fn read_optional_json<T: DeserializeOwned + Default>(
    path: Option<&Path>,
    what: &str,
) -> Result<T, CliError> {
    match path {
        Some(path) => read_json(path, what),
        None => Ok(T::default()),
    }
}

pub(super) fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .context("failed to serialise output")
        .map_err(CliError::from)
}

/// Writes to `output` when given, stdout otherwise.
pub(super) fn emit(text: &str, output: Option<&Path>) -> Result<(), CliError> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create '{}'", parent.display()))?;
            }
            fs::write(path, text).with_context(|| format!("failed to write '{}'", path.display()))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}
