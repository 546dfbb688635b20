use super::force_constants::{FORCE_CONSTANTS_FILE, read_force_constants, write_force_constants};
use super::model::{ForceConstantsRecord, NacParameters, PhonopySettings};
use super::produce::{DisplacementDataset, produce_force_constants};
use super::supercell::SupercellMap;
use super::yaml::{PHONOPY_YAML_FILE, PhonopyDocument, default_masses, read_phonopy_yaml, write_phonopy_yaml};
use crate::common::coherent_scattering_length;
use crate::domain::{Structure, VibroError, VibroResult};
use crate::numerics::vector::Mat3;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Phonopy-level results of a finished phonon calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonopyData {
    pub unit_cell: Structure,
    pub supercell_matrix: [u32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masses: Option<Vec<f64>>,
    #[serde(default)]
    pub dataset: DisplacementDataset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_constants: Option<Vec<Vec<Mat3>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nac: Option<NacParameters>,
}

/// Force constants stored directly on a calculation, without a displacement dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawForceConstants {
    pub unit_cell: Structure,
    pub supercell_matrix: [u32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masses: Option<Vec<f64>>,
    pub force_constants: Vec<Vec<Mat3>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nac: Option<NacParameters>,
}

/// Handle on a completed phonon calculation.
pub trait PhononCalculation {
    fn phonopy_data(&self) -> Option<PhonopyData>;
    fn force_constants(&self) -> Option<RawForceConstants>;
    fn settings(&self) -> PhonopySettings;
}

/// Serialisable calculation outputs, as handed over by a workflow engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalculationSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonopy_data: Option<PhonopyData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_constants: Option<RawForceConstants>,
    #[serde(default)]
    pub settings: PhonopySettings,
}

impl PhononCalculation for CalculationSnapshot {
    fn phonopy_data(&self) -> Option<PhonopyData> {
        self.phonopy_data.clone()
    }

    fn force_constants(&self) -> Option<RawForceConstants> {
        self.force_constants.clone()
    }

    fn settings(&self) -> PhonopySettings {
        self.settings
    }
}

pub enum BridgeInput<'a> {
    Calculation(&'a dyn PhononCalculation),
    /// Uploaded `phonopy.yaml` and force-constants bytes; empty force constants
    /// are produced from the displacement dataset.
    Files {
        phonopy_yaml: &'a [u8],
        force_constants: &'a [u8],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeMode {
    #[default]
    Stream,
    Download,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadFile {
    pub name: String,
    pub base64: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DownloadBundle {
    pub files: Vec<DownloadFile>,
}

impl DownloadBundle {
    pub fn decode(&self, name: &str) -> VibroResult<Vec<u8>> {
        let file = self
            .files
            .iter()
            .find(|file| file.name == name)
            .ok_or_else(|| VibroError::invalid_input(format!("bundle has no file '{name}'")))?;
        STANDARD
            .decode(&file.base64)
            .map_err(|error| VibroError::invalid_input(format!("'{name}' is not valid base64: {error}")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutput {
    Record(ForceConstantsRecord),
    Download(DownloadBundle),
}

impl BridgeOutput {
    pub fn into_record(self) -> Option<ForceConstantsRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Download(_) => None,
        }
    }
}

struct PhonopyModel {
    document: PhonopyDocument,
    supercell: SupercellMap,
    force_constants: Vec<Vec<Mat3>>,
}

impl PhonopyModel {
    fn from_calculation(calculation: &dyn PhononCalculation) -> VibroResult<Self> {
        let settings = calculation.settings();
        let (data, force_constants) = if let Some(data) = calculation.phonopy_data() {
            let force_constants = data.force_constants.clone();
            (data, force_constants)
        } else if let Some(raw) = calculation.force_constants() {
            let data = PhonopyData {
                unit_cell: raw.unit_cell,
                supercell_matrix: raw.supercell_matrix,
                masses: raw.masses,
                dataset: DisplacementDataset::default(),
                force_constants: None,
                nac: raw.nac,
            };
            (data, Some(raw.force_constants))
        } else {
            return Err(VibroError::bad_phonopy_input(
                "calculation exposes neither phonopy data nor force constants",
            ));
        };

        let masses = match data.masses {
            Some(masses) => masses,
            None => default_masses(&data.unit_cell)?,
        };
        let document = PhonopyDocument {
            unit_cell: data.unit_cell,
            masses,
            supercell_matrix: data.supercell_matrix,
            nac: data.nac,
            settings,
            dataset: data.dataset,
        };
        Self::assemble(document, force_constants)
    }

    fn from_files(phonopy_yaml: &[u8], force_constants: &[u8]) -> VibroResult<Self> {
        let yaml = std::str::from_utf8(phonopy_yaml)
            .map_err(|_| VibroError::bad_phonopy_input("phonopy.yaml is not UTF-8"))?;
        let document = read_phonopy_yaml(yaml)?;
        if force_constants.iter().all(u8::is_ascii_whitespace) {
            return Self::assemble(document, None);
        }
        let text = std::str::from_utf8(force_constants)
            .map_err(|_| VibroError::corrupt_force_constants("force constants are not text"))?;
        let supercell = SupercellMap::build(&document.unit_cell, document.supercell_matrix)?;
        let force_constants = read_force_constants(text, &supercell.p2s, supercell.num_atoms())?;
        Self::assemble(document, Some(force_constants))
    }

    fn assemble(
        mut document: PhonopyDocument,
        force_constants: Option<Vec<Vec<Mat3>>>,
    ) -> VibroResult<Self> {
        let settings = document.settings;
        document.nac = document.nac.map(|nac| {
            let mut nac = if settings.symmetrize_nac { nac.symmetrized() } else { nac };
            if let Some(factor) = settings.factor_nac {
                nac.factor = factor;
            }
            nac
        });
        if let Some(nac) = &document.nac {
            nac.validate(document.unit_cell.num_sites())?;
        }
        if document.masses.len() != document.unit_cell.num_sites() {
            return Err(VibroError::bad_phonopy_input(format!(
                "{} masses for {} atoms",
                document.masses.len(),
                document.unit_cell.num_sites()
            )));
        }

        let supercell = SupercellMap::build(&document.unit_cell, document.supercell_matrix)?;
        let force_constants = match force_constants {
            Some(full) if full.len() == supercell.num_atoms() && full.len() != supercell.p2s.len() => {
                supercell.p2s.iter().map(|&image| full[image].clone()).collect()
            }
            Some(compact) => compact,
            None => {
                if !document.dataset.has_forces() {
                    return Err(VibroError::bad_phonopy_input(
                        "no force constants and no displacement forces to produce them from",
                    ));
                }
                info!(
                    displacements = document.dataset.records.len(),
                    "producing force constants from displacement dataset"
                );
                produce_force_constants(
                    &supercell,
                    &document.dataset,
                    settings.subtract_residual_forces,
                )?
            }
        };
        Ok(Self {
            document,
            supercell,
            force_constants,
        })
    }

    fn stage(&self, dir: &Path) -> VibroResult<()> {
        let yaml = write_phonopy_yaml(&self.document)?;
        let force_constants = write_force_constants(&self.force_constants, &self.supercell.p2s);
        write_file(&dir.join(PHONOPY_YAML_FILE), yaml.as_bytes())?;
        write_file(&dir.join(FORCE_CONSTANTS_FILE), force_constants.as_bytes())?;
        debug!(dir = %dir.display(), "staged phonopy files");
        Ok(())
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> VibroResult<()> {
    fs::write(path, bytes)
        .map_err(|error| VibroError::io(format!("failed to write {}: {error}", path.display())))
}

/// Loads a record from a directory holding `phonopy.yaml` and `FORCE_CONSTANTS`.
///
/// NAC parameters are attached as stored; nothing is folded into the force
/// constants.
pub fn read_force_constants_record(dir: &Path) -> VibroResult<ForceConstantsRecord> {
    let yaml = fs::read_to_string(dir.join(PHONOPY_YAML_FILE))
        .map_err(|error| VibroError::bad_phonopy_input(format!("cannot read phonopy.yaml: {error}")))?;
    let document = read_phonopy_yaml(&yaml)?;
    let supercell = SupercellMap::build(&document.unit_cell, document.supercell_matrix)?;
    let text = fs::read_to_string(dir.join(FORCE_CONSTANTS_FILE)).map_err(|error| {
        VibroError::corrupt_force_constants(format!("cannot read {FORCE_CONSTANTS_FILE}: {error}"))
    })?;
    let force_constants = read_force_constants(&text, &supercell.p2s, supercell.num_atoms())?;

    let scattering_lengths = document
        .unit_cell
        .sites()
        .iter()
        .map(|site| {
            coherent_scattering_length(&site.symbol).unwrap_or_else(|| {
                warn!(symbol = %site.symbol, "no coherent scattering length, using zero");
                0.0
            })
        })
        .collect();

    ForceConstantsRecord::new(
        document.unit_cell,
        document.masses,
        scattering_lengths,
        supercell,
        force_constants,
        document.nac,
    )
}

/// Turns a calculation or uploaded files into a force-constants record or a
/// download bundle. Files are staged in a temporary directory that is removed
/// when the call returns.
pub fn export_force_constants(input: BridgeInput<'_>, mode: BridgeMode) -> VibroResult<BridgeOutput> {
    let model = match input {
        BridgeInput::Calculation(calculation) => PhonopyModel::from_calculation(calculation)?,
        BridgeInput::Files {
            phonopy_yaml,
            force_constants,
        } => PhonopyModel::from_files(phonopy_yaml, force_constants)?,
    };

    let staging = tempfile::Builder::new()
        .prefix("vibro-phonopy-")
        .tempdir()
        .map_err(|error| VibroError::io(format!("cannot create staging directory: {error}")))?;
    model.stage(staging.path())?;

    match mode {
        BridgeMode::Stream => {
            let record = read_force_constants_record(staging.path())?;
            info!(
                atoms = record.num_atoms(),
                supercell_atoms = record.supercell().num_atoms(),
                nac = record.nac().is_some(),
                "loaded force constants"
            );
            Ok(BridgeOutput::Record(record))
        }
        BridgeMode::Download => {
            let mut files = Vec::with_capacity(2);
            for name in [PHONOPY_YAML_FILE, FORCE_CONSTANTS_FILE] {
                let path = staging.path().join(name);
                let bytes = fs::read(&path)
                    .map_err(|error| VibroError::io(format!("failed to read {}: {error}", path.display())))?;
                files.push(DownloadFile {
                    name: name.to_string(),
                    base64: STANDARD.encode(bytes),
                });
            }
            Ok(BridgeOutput::Download(DownloadBundle { files }))
        }
    }
}
