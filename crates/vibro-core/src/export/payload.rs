use super::record::ExportRecord;
use crate::domain::{Spectrum2D, VibroError, VibroResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

pub const JSON_MIME: &str = "application/json";
pub const PNG_MIME: &str = "image/png";

/// A file offered for download, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadPayload {
    pub filename: String,
    pub mime: String,
    pub base64: String,
}

impl DownloadPayload {
    pub fn from_bytes(filename: impl Into<String>, mime: &str, bytes: &[u8]) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.to_string(),
            base64: STANDARD.encode(bytes),
        }
    }

    pub fn json(record: &ExportRecord) -> VibroResult<Self> {
        let text = record.to_json()?;
        Ok(Self::from_bytes(record.file_name(), JSON_MIME, text.as_bytes()))
    }

    pub fn decode(&self) -> VibroResult<Vec<u8>> {
        STANDARD
            .decode(&self.base64)
            .map_err(|error| VibroError::invalid_input(format!("payload {} is not valid base64: {error}", self.filename)))
    }
}

/// Draws a map to PNG bytes.
pub trait PlotRenderer {
    fn render_png(&self, spectrum: &Spectrum2D, title: &str) -> VibroResult<Vec<u8>>;
}

/// PNG snapshot of a map named after its JSON record.
pub fn png_snapshot(
    renderer: &dyn PlotRenderer,
    record: &ExportRecord,
    spectrum: &Spectrum2D,
) -> VibroResult<DownloadPayload> {
    let stem = record.file_name().trim_end_matches(".json");
    let bytes = renderer.render_png(spectrum, stem)?;
    Ok(DownloadPayload::from_bytes(format!("{stem}.png"), PNG_MIME, &bytes))
}
