use crate::domain::Periodicity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

pub const DEFAULT_SYMPREC: f64 = 1.0e-5;
pub const CHAIN_SYMPREC: f64 = 1.0e-3;
pub const DEFAULT_SUPERCELL: [u32; 3] = [2, 2, 2];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Fast,
    #[default]
    Moderate,
    Precise,
}

impl Protocol {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Moderate => "moderate",
            Self::Precise => "precise",
        }
    }
}

impl Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectronicType {
    #[default]
    Insulator,
    Metal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinType {
    #[default]
    None,
    Collinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkchainSettings {
    pub protocol: Protocol,
    pub electronic_type: ElectronicType,
    pub spin_type: SpinType,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VibronicSettings {
    /// 1 full, 2 spectra, 3 phonon, 4 dielectric.
    pub simulation_mode: i64,
    pub supercell_selector: [u32; 3],
    pub symmetry_symprec: f64,
    /// Replace the selector by ⌈15 Å/|aᵢ|⌉ + 1 on periodic axes.
    pub supercell_hint: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpoints_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kpoints_parallel_distance: Option<f64>,
}

impl Default for VibronicSettings {
    fn default() -> Self {
        Self {
            simulation_mode: 1,
            supercell_selector: DEFAULT_SUPERCELL,
            symmetry_symprec: DEFAULT_SYMPREC,
            supercell_hint: false,
            kpoints_distance: None,
            kpoints_parallel_distance: None,
        }
    }
}

impl VibronicSettings {
    /// Restores the supercell and tolerance for the given periodicity.
    pub fn reset(&mut self, periodicity: Periodicity) {
        self.supercell_selector = DEFAULT_SUPERCELL;
        self.symmetry_symprec = match periodicity {
            Periodicity::Chain => CHAIN_SYMPREC,
            _ => DEFAULT_SYMPREC,
        };
        self.supercell_hint = false;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub nodes: u32,
    pub ntasks_per_node: u32,
    pub cpus_per_task: u32,
    pub max_wallclock_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallelization: Option<Value>,
}

impl Default for PwResources {
    fn default() -> Self {
        Self {
            code: None,
            nodes: 1,
            ntasks_per_node: 1,
            cpus_per_task: 1,
            max_wallclock_seconds: 43_200,
            parallelization: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhonopyResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Threads for post-processing kernels.
    pub n_threads: usize,
}

impl Default for PhonopyResources {
    fn default() -> Self {
        Self {
            code: None,
            n_threads: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeSettings {
    pub pw: PwResources,
    pub phonopy: PhonopyResources,
}

/// User-facing configuration of one vibrational simulation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerParameters {
    pub workchain: WorkchainSettings,
    pub vibronic: VibronicSettings,
    /// Opaque override tree merged onto the protocol defaults.
    pub advanced: Value,
    pub codes: CodeSettings,
}
