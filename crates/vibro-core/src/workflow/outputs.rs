use crate::domain::VibrationalTiers;
use crate::phonopy::{BridgeInput, CalculationSnapshot};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output namespace of a finished submission.
///
/// Band, PDOS and thermal results stay opaque trees; they are only passed
/// through to the exporter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowOutputs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonon_bands: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonon_pdos: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonon_thermo: Option<Value>,
    #[serde(default)]
    pub vibrational_data: VibrationalTiers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonopy_data: Option<CalculationSnapshot>,
}

impl WorkflowOutputs {
    /// Bridge input for the phonon calculation, when the submission ran one.
    pub fn phonon_calculation(&self) -> Option<BridgeInput<'_>> {
        self.phonopy_data
            .as_ref()
            .map(|snapshot| BridgeInput::Calculation(snapshot))
    }

    pub fn has_dispersion(&self) -> bool {
        self.phonon_bands.is_some() || self.phonopy_data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_default_to_empty() {
        let outputs: WorkflowOutputs =
            serde_json::from_str(r#"{"phonon_thermo": {"temperatures": [0, 10]}}"#).expect("outputs should parse");
        assert!(outputs.vibrational_data.is_empty());
        assert!(outputs.phonon_calculation().is_none());
        assert!(!outputs.has_dispersion());
        assert_eq!(outputs.phonon_thermo.as_ref().map(|tree| tree["temperatures"][1].as_i64()), Some(Some(10)));
    }
}
