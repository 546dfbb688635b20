use super::parameters::Protocol;
use crate::domain::Periodicity;
use serde_json::{Value, json};

/// Immutable defaults attached to a protocol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProtocolDefaults {
    /// Target k-point spacing in Å⁻¹.
    pub kpoints_distance: f64,
    /// SCF energy threshold per atom (Ry).
    pub conv_thr_per_atom: f64,
    pub ecutwfc: f64,
    /// Finite electric-field steps used by the dielectric stage.
    pub electric_field_steps: u32,
}

const FAST: ProtocolDefaults = ProtocolDefaults {
    kpoints_distance: 0.5,
    conv_thr_per_atom: 4.0e-10,
    ecutwfc: 30.0,
    electric_field_steps: 1,
};

const MODERATE: ProtocolDefaults = ProtocolDefaults {
    kpoints_distance: 0.15,
    conv_thr_per_atom: 2.0e-10,
    ecutwfc: 45.0,
    electric_field_steps: 2,
};

const PRECISE: ProtocolDefaults = ProtocolDefaults {
    kpoints_distance: 0.1,
    conv_thr_per_atom: 1.0e-10,
    ecutwfc: 60.0,
    electric_field_steps: 4,
};

impl Protocol {
    pub const fn defaults(self) -> &'static ProtocolDefaults {
        match self {
            Self::Fast => &FAST,
            Self::Moderate => &MODERATE,
            Self::Precise => &PRECISE,
        }
    }
}

/// Default override tree for a protocol, before user overrides are merged in.
pub fn default_overrides(protocol: Protocol, periodicity: Periodicity, atoms: usize) -> Value {
    let defaults = protocol.defaults();
    let mut system = json!({ "ecutwfc": defaults.ecutwfc });
    if periodicity == Periodicity::Sheet {
        system["assume_isolated"] = json!("2D");
    }
    let electrons = json!({ "conv_thr": defaults.conv_thr_per_atom * atoms.max(1) as f64 });
    json!({
        "clean_workdir": true,
        "phonon": {
            "scf": {
                "kpoints_distance": defaults.kpoints_distance,
                "pw": { "parameters": { "SYSTEM": system.clone(), "ELECTRONS": electrons.clone() } },
            },
        },
        "dielectric": {
            "property_steps": defaults.electric_field_steps,
            "scf": {
                "kpoints_distance": defaults.kpoints_distance,
                "pw": { "parameters": { "SYSTEM": system, "ELECTRONS": electrons } },
            },
        },
    })
}
