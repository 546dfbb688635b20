//! JSON records, download payloads and PNG snapshots of computed results.

pub mod files;
pub mod payload;
pub mod record;

pub use files::{read_record, write_payload, write_record};
pub use payload::{DownloadPayload, JSON_MIME, PNG_MIME, PlotRenderer, png_snapshot};
pub use record::{ExportKind, ExportRecord, PRODUCER, Provenance, select_tier};
