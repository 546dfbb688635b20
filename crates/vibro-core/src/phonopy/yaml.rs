//! `phonopy.yaml` reading and writing.

use super::model::{NacParameters, PhonopySettings};
use super::produce::{DisplacementDataset, DisplacementRecord};
use crate::common::atomic_mass;
use crate::domain::{Periodicity, Site, Structure, VibroError, VibroResult};
use std::collections::BTreeMap;

pub const PHONOPY_YAML_FILE: &str = "phonopy.yaml";
const WRITER_VERSION: &str = "2.20.0";

mod cereal {
    use crate::numerics::vector::{Mat3, Vec3};
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    pub(super) struct PhonopyYaml {
        pub phonopy: Header,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub physical_unit: Option<PhysicalUnit>,
        pub supercell_matrix: [[i64; 3]; 3],
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub pbc: Option<[bool; 3]>,
        pub unit_cell: Cell,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub born_effective_charge: Option<Vec<Mat3>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub dielectric_constant: Option<Mat3>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub nac_factor: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub displacements: Option<Vec<Displacement>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub reference_forces: Option<Vec<Vec3>>,
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct Header {
        pub version: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub calculator: Option<String>,
        #[serde(default)]
        pub configuration: BTreeMap<String, String>,
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct PhysicalUnit {
        pub length: String,
        pub force_constants: String,
        pub atomic_mass: String,
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct Cell {
        pub lattice: Mat3,
        pub points: Vec<Point>,
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct Point {
        pub symbol: String,
        pub coordinates: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub mass: Option<f64>,
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct Displacement {
        pub atom: usize,
        pub displacement: Vec3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub forces: Option<Vec<Vec3>>,
    }
}

/// Parsed contents of a `phonopy.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct PhonopyDocument {
    pub unit_cell: Structure,
    pub masses: Vec<f64>,
    pub supercell_matrix: [u32; 3],
    pub nac: Option<NacParameters>,
    pub settings: PhonopySettings,
    pub dataset: DisplacementDataset,
}

pub fn read_phonopy_yaml(text: &str) -> VibroResult<PhonopyDocument> {
    let raw: cereal::PhonopyYaml = serde_yaml::from_str(text)
        .map_err(|error| VibroError::bad_phonopy_input(format!("phonopy.yaml: {error}")))?;

    let supercell_matrix = diagonal_matrix(&raw.supercell_matrix)?;
    let periodicity = match raw.pbc {
        Some(flags) => Periodicity::from_flags(flags)
            .map_err(|error| VibroError::bad_phonopy_input(error.message().to_string()))?,
        None => Periodicity::Bulk,
    };

    let mut sites = Vec::with_capacity(raw.unit_cell.points.len());
    let mut masses = Vec::with_capacity(raw.unit_cell.points.len());
    for point in raw.unit_cell.points {
        let mass = match point.mass {
            Some(mass) => mass,
            None => atomic_mass(&point.symbol).ok_or_else(|| {
                VibroError::bad_phonopy_input(format!("no mass for '{}'", point.symbol))
            })?,
        };
        masses.push(mass);
        sites.push(Site::new(point.symbol, point.coordinates));
    }
    let unit_cell = Structure::new(raw.unit_cell.lattice, sites, periodicity)
        .map_err(|error| VibroError::bad_phonopy_input(format!("unit_cell: {}", error.message())))?;

    let nac = match (raw.born_effective_charge, raw.dielectric_constant) {
        (Some(born), Some(dielectric)) => {
            let mut nac = NacParameters::new(born, dielectric);
            if let Some(factor) = raw.nac_factor {
                nac.factor = factor;
            }
            nac.validate(unit_cell.num_sites())?;
            Some(nac)
        }
        (None, None) => None,
        _ => {
            return Err(VibroError::bad_phonopy_input(
                "Born charges and dielectric constant must be given together",
            ));
        }
    };

    let settings = settings_from_configuration(&raw.phonopy.configuration)?;

    let mut records = Vec::new();
    for displacement in raw.displacements.into_iter().flatten() {
        // phonopy numbers atoms from 1
        let atom = displacement.atom.checked_sub(1).ok_or_else(|| {
            VibroError::bad_phonopy_input("displacement atom indices start at 1")
        })?;
        records.push(DisplacementRecord {
            atom,
            displacement: displacement.displacement,
            forces: displacement.forces,
        });
    }

    Ok(PhonopyDocument {
        unit_cell,
        masses,
        supercell_matrix,
        nac,
        settings,
        dataset: DisplacementDataset {
            records,
            reference_forces: raw.reference_forces,
        },
    })
}

pub fn write_phonopy_yaml(document: &PhonopyDocument) -> VibroResult<String> {
    let cell = &document.unit_cell;
    let points = cell
        .sites()
        .iter()
        .zip(&document.masses)
        .map(|(site, &mass)| cereal::Point {
            symbol: site.symbol.clone(),
            coordinates: site.position,
            mass: Some(mass),
        })
        .collect();

    let mut matrix = [[0i64; 3]; 3];
    for axis in 0..3 {
        matrix[axis][axis] = i64::from(document.supercell_matrix[axis]);
    }

    let displacements = (!document.dataset.is_empty()).then(|| {
        document
            .dataset
            .records
            .iter()
            .map(|record| cereal::Displacement {
                atom: record.atom + 1,
                displacement: record.displacement,
                forces: record.forces.clone(),
            })
            .collect()
    });

    let raw = cereal::PhonopyYaml {
        phonopy: cereal::Header {
            version: WRITER_VERSION.to_string(),
            calculator: Some("vibroscopy".to_string()),
            configuration: configuration_from_settings(&document.settings),
        },
        physical_unit: Some(cereal::PhysicalUnit {
            length: "angstrom".to_string(),
            force_constants: "eV/angstrom^2".to_string(),
            atomic_mass: "AMU".to_string(),
        }),
        supercell_matrix: matrix,
        pbc: Some(cell.periodicity().flags()),
        unit_cell: cereal::Cell {
            lattice: *cell.cell(),
            points,
        },
        born_effective_charge: document.nac.as_ref().map(|nac| nac.born.clone()),
        dielectric_constant: document.nac.as_ref().map(|nac| nac.dielectric),
        nac_factor: document.nac.as_ref().map(|nac| nac.factor),
        displacements,
        reference_forces: document.dataset.reference_forces.clone(),
    };
    serde_yaml::to_string(&raw)
        .map_err(|error| VibroError::io(format!("failed to serialise phonopy.yaml: {error}")))
}

fn diagonal_matrix(matrix: &[[i64; 3]; 3]) -> VibroResult<[u32; 3]> {
    let mut diagonal = [1u32; 3];
    for row in 0..3 {
        for col in 0..3 {
            let value = matrix[row][col];
            if row == col {
                diagonal[row] = u32::try_from(value).ok().filter(|&n| n > 0).ok_or_else(|| {
                    VibroError::bad_phonopy_input(format!("supercell_matrix diagonal {value} is not positive"))
                })?;
            } else if value != 0 {
                return Err(VibroError::bad_phonopy_input(
                    "only diagonal supercell matrices are supported",
                ));
            }
        }
    }
    Ok(diagonal)
}

fn parse_flag(key: &str, value: &str) -> VibroResult<bool> {
    match value.trim().trim_matches('.').to_ascii_lowercase().as_str() {
        "true" | "t" => Ok(true),
        "false" | "f" => Ok(false),
        other => Err(VibroError::bad_phonopy_input(format!(
            "configuration '{key}' expects a boolean, got '{other}'"
        ))),
    }
}

fn settings_from_configuration(configuration: &BTreeMap<String, String>) -> VibroResult<PhonopySettings> {
    let mut settings = PhonopySettings::default();
    if let Some(value) = configuration.get("symmetrize_nac") {
        settings.symmetrize_nac = parse_flag("symmetrize_nac", value)?;
    }
    if let Some(value) = configuration.get("subtract_residual_forces") {
        settings.subtract_residual_forces = parse_flag("subtract_residual_forces", value)?;
    }
    if let Some(value) = configuration.get("factor_nac") {
        let factor = value.trim().parse::<f64>().map_err(|_| {
            VibroError::bad_phonopy_input(format!("configuration 'factor_nac' is not a number: '{value}'"))
        })?;
        settings.factor_nac = Some(factor);
    }
    Ok(settings)
}

fn configuration_from_settings(settings: &PhonopySettings) -> BTreeMap<String, String> {
    let mut configuration = BTreeMap::new();
    configuration.insert("symmetrize_nac".to_string(), settings.symmetrize_nac.to_string());
    configuration.insert(
        "subtract_residual_forces".to_string(),
        settings.subtract_residual_forces.to_string(),
    );
    if let Some(factor) = settings.factor_nac {
        configuration.insert("factor_nac".to_string(), factor.to_string());
    }
    configuration
}

/// Standard-mass lookup for cells that come without explicit masses.
pub fn default_masses(structure: &Structure) -> VibroResult<Vec<f64>> {
    structure
        .sites()
        .iter()
        .map(|site| {
            atomic_mass(&site.symbol).ok_or_else(|| {
                VibroError::bad_phonopy_input(format!("no mass for '{}'", site.symbol))
            })
        })
        .collect()
}
