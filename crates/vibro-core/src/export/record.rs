use crate::domain::{AccuracyTier, Spectrum2D, VibrationalData, VibrationalTiers, VibroError, VibroResult};
use crate::kernels::SpectrumResult;
use crate::phonopy::ForceConstantsRecord;
use crate::spectra::SpectrumOutcome;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;

pub const PRODUCER: &str = "vibroscopy";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    ForceConstants,
    SingleCrystal,
    Powder,
    QSection,
    PhononBands,
    PhononDos,
    PhononThermo,
    Spectra,
    Dielectric,
}

impl ExportKind {
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::ForceConstants => "force_constants.json",
            Self::SingleCrystal => "single_crystal.json",
            Self::Powder => "powder.json",
            Self::QSection => "Q_section.json",
            Self::PhononBands => "phonon_bands_data.json",
            Self::PhononDos => "phonon_dos_data.json",
            Self::PhononThermo => "phonon_thermo_data.json",
            Self::Spectra => "spectra.json",
            Self::Dielectric => "dielectric.json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub producer: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<AccuracyTier>,
}

impl Default for Provenance {
    fn default() -> Self {
        Self {
            producer: PRODUCER.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            tier: None,
        }
    }
}

/// A kernel or upstream result with everything needed to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub kind: ExportKind,
    pub data: Value,
    pub parameters: Value,
    #[serde(default)]
    pub units: BTreeMap<String, String>,
    #[serde(default)]
    pub provenance: Provenance,
}

fn to_tree<T: Serialize>(value: &T, what: &str) -> VibroResult<Value> {
    serde_json::to_value(value).map_err(|error| VibroError::invalid_input(format!("cannot serialise {what}: {error}")))
}

impl ExportRecord {
    pub fn new(kind: ExportKind, data: Value, parameters: Value) -> Self {
        Self {
            kind,
            data,
            parameters,
            units: BTreeMap::new(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_unit(mut self, quantity: &str, unit: &str) -> Self {
        self.units.insert(quantity.to_string(), unit.to_string());
        self
    }

    pub fn with_tier(mut self, tier: AccuracyTier) -> Self {
        self.provenance.tier = Some(tier);
        self
    }

    pub fn file_name(&self) -> &'static str {
        self.kind.file_name()
    }

    fn spectrum_units(self, spectrum: &Spectrum2D) -> Self {
        self.with_unit("x", &spectrum.x().unit)
            .with_unit("y", &spectrum.y().unit)
            .with_unit("z", spectrum.z_unit())
    }

    /// Powder and Q-plane maps, exported whole.
    pub fn from_spectrum(kind: ExportKind, result: &SpectrumResult) -> VibroResult<Self> {
        let data = to_tree(&result.spectrum, "spectrum")?;
        Ok(Self::new(kind, data, result.parameters.clone()).spectrum_units(&result.spectrum))
    }

    /// Single-crystal maps, split into one piece per path segment.
    pub fn single_crystal(result: &SpectrumResult) -> VibroResult<Self> {
        let pieces = match &result.segments {
            Some(segments) if segments.len() > 1 => result.spectrum.split_rows(segments)?,
            _ => vec![result.spectrum.clone()],
        };
        debug!(pieces = pieces.len(), "split single-crystal map");
        let data = json!({ "segments": to_tree(&pieces, "spectrum segments")? });
        Ok(Self::new(ExportKind::SingleCrystal, data, result.parameters.clone()).spectrum_units(&result.spectrum))
    }

    pub fn force_constants(record: &ForceConstantsRecord) -> VibroResult<Self> {
        let data = to_tree(record, "force constants")?;
        let parameters = json!({
            "supercell_matrix": record.supercell().matrix,
            "num_atoms": record.num_atoms(),
            "nac": record.nac().is_some(),
        });
        Ok(Self::new(ExportKind::ForceConstants, data, parameters)
            .with_unit("force_constants", "eV/Å²")
            .with_unit("masses", "amu"))
    }

    pub fn spectra(outcome: &SpectrumOutcome, settings: Value, tier: AccuracyTier) -> VibroResult<Self> {
        let data = to_tree(outcome, "spectrum")?;
        Ok(Self::new(ExportKind::Spectra, data, settings)
            .with_unit("frequencies", "cm⁻¹")
            .with_unit("intensities", "arb. units")
            .with_tier(tier))
    }

    /// Band, DOS and thermal trees from the workflow outputs, passed through.
    pub fn upstream(kind: ExportKind, tree: &Value) -> Self {
        Self::new(kind, tree.clone(), Value::Null)
    }

    pub fn to_json(&self) -> VibroResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|error| VibroError::invalid_input(format!("cannot serialise {} record: {error}", self.file_name())))
    }

    pub fn from_json(text: &str) -> VibroResult<Self> {
        serde_json::from_str(text).map_err(|error| VibroError::invalid_input(format!("malformed export record: {error}")))
    }

    /// Decodes `data` back into a map, for records holding a single spectrum.
    pub fn spectrum(&self) -> VibroResult<Spectrum2D> {
        serde_json::from_value(self.data.clone())
            .map_err(|error| VibroError::invalid_input(format!("record does not hold a spectrum: {error}")))
    }
}

/// Highest-priority accuracy tier of a vibrational result set.
pub fn select_tier(tiers: &VibrationalTiers) -> VibroResult<(AccuracyTier, &VibrationalData)> {
    tiers
        .best()
        .ok_or_else(|| VibroError::invalid_input("no vibrational data tier available for export"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Axis, XTick};

    fn result() -> SpectrumResult {
        let spectrum = Spectrum2D::new(
            Axis::new(vec![0.0, 0.1, 0.2, 0.3, 0.4], "1/Å"),
            Axis::new(vec![0.0, 1.0, 2.0], "meV"),
            vec![vec![1.0, 0.0], vec![0.5, 0.5], vec![0.0, 1.0], vec![0.25, 0.75]],
            "arb. units",
        )
        .and_then(|spectrum| {
            spectrum.with_ticks(vec![XTick::new(0, "Γ"), XTick::new(2, "X"), XTick::new(3, "M")])
        })
        .expect("spectrum should build");
        SpectrumResult {
            spectrum,
            parameters: json!({"q_spacing": 0.1}),
            segments: Some(vec![(0, 3), (3, 4)]),
        }
    }

    #[test]
    fn file_names_follow_the_output_layout() {
        assert_eq!(ExportKind::QSection.file_name(), "Q_section.json");
        assert_eq!(ExportKind::PhononDos.file_name(), "phonon_dos_data.json");
    }

    #[test]
    fn single_crystal_records_split_at_segments() {
        let record = ExportRecord::single_crystal(&result()).expect("record should build");
        let segments = record.data["segments"].as_array().expect("segments array");
        assert_eq!(segments.len(), 2);
        assert_eq!(record.units["y"], "meV");
        assert_eq!(record.parameters["q_spacing"], 0.1);
    }

    #[test]
    fn records_round_trip_through_json() {
        let record = ExportRecord::from_spectrum(ExportKind::Powder, &result()).expect("record should build");
        let decoded = ExportRecord::from_json(&record.to_json().expect("json")).expect("record should parse");
        assert_eq!(decoded, record);
        assert_eq!(decoded.spectrum().expect("spectrum"), result().spectrum);
    }
}
