//! Bridge from phonopy calculations to force-constants records.

pub mod bridge;
pub mod force_constants;
pub mod model;
pub mod produce;
pub mod supercell;
pub mod yaml;

pub use bridge::{
    BridgeInput, BridgeMode, BridgeOutput, CalculationSnapshot, DownloadBundle, DownloadFile,
    PhononCalculation, PhonopyData, RawForceConstants, export_force_constants,
    read_force_constants_record,
};
pub use force_constants::{FORCE_CONSTANTS_FILE, read_force_constants, write_force_constants};
pub use model::{ForceConstantsRecord, NacParameters, PhonopySettings};
pub use produce::{DisplacementDataset, DisplacementRecord, produce_force_constants};
pub use supercell::SupercellMap;
pub use yaml::{PHONOPY_YAML_FILE, PhonopyDocument, read_phonopy_yaml, write_phonopy_yaml};
