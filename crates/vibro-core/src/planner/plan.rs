use super::parameters::{CodeSettings, ElectronicType, Protocol, SpinType};
use crate::domain::{Structure, VibroError, VibroResult};
use crate::lattice::PhonopyBand;
use crate::numerics::vector::Mat3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Harmonic phonons, dielectric response and Raman tensors.
    Full,
    /// IR and Raman on the primitive cell only.
    Spectra,
    Phonon,
    Dielectric,
}

impl PlanKind {
    pub fn from_mode(mode: i64) -> VibroResult<Self> {
        match mode {
            1 => Ok(Self::Full),
            2 => Ok(Self::Spectra),
            3 => Ok(Self::Phonon),
            4 => Ok(Self::Dielectric),
            other => Err(VibroError::bad_mode(format!(
                "simulation mode must be 1, 2, 3 or 4, got {other}"
            ))),
        }
    }

    pub const fn mode(self) -> i64 {
        match self {
            Self::Full => 1,
            Self::Spectra => 2,
            Self::Phonon => 3,
            Self::Dielectric => 4,
        }
    }

    /// Whether the plan produces a phonon dispersion to post-process.
    pub const fn has_dispersion(self) -> bool {
        matches!(self, Self::Full | Self::Phonon)
    }

    pub const fn dielectric_property(self) -> DielectricProperty {
        match self {
            Self::Full | Self::Spectra => DielectricProperty::Raman,
            Self::Phonon => DielectricProperty::None,
            Self::Dielectric => DielectricProperty::Dielectric,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DielectricProperty {
    None,
    Dielectric,
    Raman,
}

/// k-point sampling handed to the dielectric stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpointsSetting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_distance: Option<f64>,
    /// Explicit mesh, set for non-bulk cells.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mesh: Option<[u32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandSpec {
    Auto,
    Path(PhonopyBand),
}

/// Phonopy mesh: a length (bulk) or explicit divisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeshSpec {
    Length(f64),
    Divisions([u32; 3]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandsParameters {
    pub band: BandSpec,
    pub band_points: u32,
    pub band_labels: Vec<String>,
    pub primitive_axes: Mat3,
    pub symmetry_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdosParameters {
    pub pdos: String,
    pub mesh: MeshSpec,
    pub symmetry_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermoParameters {
    pub tprop: bool,
    pub tmin: f64,
    pub tmax: f64,
    pub tstep: f64,
    pub mesh: MeshSpec,
    pub symmetry_tolerance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostProcessing {
    pub bands: BandsParameters,
    pub pdos: PdosParameters,
    pub thermo: ThermoParameters,
}

impl PostProcessing {
    pub fn symmetry_tolerances(&self) -> [f64; 3] {
        [
            self.bands.symmetry_tolerance,
            self.pdos.symmetry_tolerance,
            self.thermo.symmetry_tolerance,
        ]
    }
}

/// Everything the workflow engine needs for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub kind: PlanKind,
    pub structure: Structure,
    pub protocol: Protocol,
    pub electronic_type: ElectronicType,
    pub spin_type: SpinType,
    pub supercell: [u32; 3],
    pub symprec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpoints: Option<KpointsSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonopy_params_for: Option<PostProcessing>,
    pub dielectric_property: DielectricProperty,
    pub overrides: Value,
    pub codes: CodeSettings,
}
