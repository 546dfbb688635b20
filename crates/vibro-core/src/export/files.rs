use super::payload::DownloadPayload;
use super::record::ExportRecord;
use crate::domain::{VibroError, VibroResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

fn ensure_directory(dir: &Path) -> VibroResult<()> {
    fs::create_dir_all(dir).map_err(|source| {
        VibroError::io(format!(
            "failed to create export directory '{}': {}",
            dir.display(),
            source
        ))
    })
}

fn write_bytes(path: &Path, bytes: &[u8]) -> VibroResult<()> {
    fs::write(path, bytes)
        .map_err(|source| VibroError::io(format!("failed to write '{}': {}", path.display(), source)))
}

/// Writes `record` under its canonical file name and returns the path.
pub fn write_record(dir: &Path, record: &ExportRecord) -> VibroResult<PathBuf> {
    ensure_directory(dir)?;
    let path = dir.join(record.file_name());
    write_bytes(&path, record.to_json()?.as_bytes())?;
    info!(path = %path.display(), kind = ?record.kind, "wrote export record");
    Ok(path)
}

/// Writes the decoded bytes of a download payload.
pub fn write_payload(dir: &Path, payload: &DownloadPayload) -> VibroResult<PathBuf> {
    ensure_directory(dir)?;
    let path = dir.join(&payload.filename);
    write_bytes(&path, &payload.decode()?)?;
    Ok(path)
}

pub fn read_record(path: &Path) -> VibroResult<ExportRecord> {
    let text = fs::read_to_string(path)
        .map_err(|source| VibroError::io(format!("failed to read '{}': {}", path.display(), source)))?;
    ExportRecord::from_json(&text)
}
