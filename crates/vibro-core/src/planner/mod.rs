//! Pure decision procedure turning user parameters and a structure into a [`Plan`].

pub mod merge;
pub mod parameters;
pub mod plan;
pub mod protocol;

pub use merge::deep_merge;
pub use parameters::{
    CHAIN_SYMPREC, CodeSettings, DEFAULT_SUPERCELL, DEFAULT_SYMPREC, ElectronicType,
    PhonopyResources, PlannerParameters, Protocol, PwResources, SpinType, VibronicSettings,
    WorkchainSettings,
};
pub use plan::{
    BandSpec, BandsParameters, DielectricProperty, KpointsSetting, MeshSpec, PdosParameters, Plan,
    PlanKind, PostProcessing, ThermoParameters,
};
pub use protocol::{ProtocolDefaults, default_overrides};

use crate::domain::{Periodicity, Structure, VibroError, VibroResult};
use crate::lattice::{DEFAULT_Q_SPACING, StandardBulkPaths, classify, high_symmetry_path};
use crate::numerics::grid::mesh_from_spacing;
use crate::numerics::vector::IDENTITY;
use tracing::{debug, warn};

pub const SUPERCELL_HINT_LENGTH: f64 = 15.0;
pub const BAND_POINTS: u32 = 100;
pub const BULK_MESH_LENGTH: f64 = 150.0;
/// k-distance (Å⁻¹) used for post-processing meshes of low-dimensional cells.
pub const LOW_D_MESH_DISTANCE: f64 = 0.01;
pub const THERMO_RANGE: (f64, f64, f64) = (0.0, 1000.0, 10.0);

/// Suggested supercell: ⌈15 Å/|aᵢ|⌉ + 1 on periodic axes, 1 elsewhere.
pub fn supercell_hint(structure: &Structure) -> [u32; 3] {
    let lengths = structure.lattice_lengths();
    let periodicity = structure.periodicity();
    std::array::from_fn(|axis| {
        if periodicity.is_periodic(axis) {
            (SUPERCELL_HINT_LENGTH / lengths[axis]).ceil() as u32 + 1
        } else {
            1
        }
    })
}

/// Pins non-periodic axes to 1 and keeps periodic entries.
pub fn project_supercell(selector: [u32; 3], periodicity: Periodicity) -> VibroResult<[u32; 3]> {
    let mut projected = selector;
    for axis in 0..3 {
        if !periodicity.is_periodic(axis) {
            projected[axis] = 1;
        } else if selector[axis] == 0 {
            return Err(VibroError::invalid_input(format!(
                "supercell entry {axis} must be >= 1 on a periodic axis"
            )));
        }
    }
    Ok(projected)
}

pub fn resolve_symprec(requested: f64, periodicity: Periodicity) -> VibroResult<f64> {
    if periodicity == Periodicity::Chain {
        return Ok(CHAIN_SYMPREC);
    }
    if !(requested.is_finite() && requested > 0.0) {
        return Err(VibroError::invalid_input(format!(
            "symmetry tolerance must be positive, got {requested}"
        )));
    }
    Ok(requested)
}

fn resolve_kpoints(
    settings: &VibronicSettings,
    protocol: Protocol,
    structure: &Structure,
) -> KpointsSetting {
    let periodicity = structure.periodicity();
    if periodicity == Periodicity::Bulk {
        return KpointsSetting {
            distance: settings.kpoints_distance,
            parallel_distance: settings.kpoints_parallel_distance,
            mesh: None,
        };
    }
    let (distance, parallel_distance) = match settings.kpoints_distance {
        Some(distance) => (distance, settings.kpoints_parallel_distance),
        None => {
            if settings.kpoints_parallel_distance.is_some() {
                warn!(periodicity = %periodicity, "ignoring kpoints_parallel_distance without kpoints_distance");
            }
            (protocol.defaults().kpoints_distance, None)
        }
    };
    KpointsSetting {
        distance: Some(distance),
        parallel_distance,
        mesh: Some(mesh_from_spacing(
            &structure.reciprocal_lattice(),
            periodicity.flags(),
            distance,
        )),
    }
}

fn post_processing(structure: &Structure, symprec: f64) -> VibroResult<PostProcessing> {
    let periodicity = structure.periodicity();
    let (band, band_labels, mesh) = if periodicity == Periodicity::Bulk {
        (BandSpec::Auto, Vec::new(), MeshSpec::Length(BULK_MESH_LENGTH))
    } else {
        let tag = classify(structure)?;
        let path = high_symmetry_path(tag, structure, &StandardBulkPaths, DEFAULT_Q_SPACING)?;
        let band = path.to_phonopy_band();
        let labels = band.labels.clone();
        debug!(lattice = %tag, labels = ?labels, "band path for post-processing");
        let mesh = mesh_from_spacing(
            &structure.reciprocal_lattice(),
            periodicity.flags(),
            LOW_D_MESH_DISTANCE,
        );
        (BandSpec::Path(band), labels, MeshSpec::Divisions(mesh))
    };
    let (tmin, tmax, tstep) = THERMO_RANGE;
    Ok(PostProcessing {
        bands: BandsParameters {
            band,
            band_points: BAND_POINTS,
            band_labels,
            primitive_axes: IDENTITY,
            symmetry_tolerance: symprec,
        },
        pdos: PdosParameters {
            pdos: "auto".to_string(),
            mesh,
            symmetry_tolerance: symprec,
        },
        thermo: ThermoParameters {
            tprop: true,
            tmin,
            tmax,
            tstep,
            mesh,
            symmetry_tolerance: symprec,
        },
    })
}

/// Resolves the plan for one submission.
pub fn plan_simulation(parameters: PlannerParameters, structure: &Structure) -> VibroResult<Plan> {
    let PlannerParameters {
        workchain,
        vibronic,
        advanced,
        codes,
    } = parameters;
    let kind = PlanKind::from_mode(vibronic.simulation_mode)?;
    let periodicity = structure.periodicity();

    let supercell = if !kind.has_dispersion() {
        [1, 1, 1]
    } else if vibronic.supercell_hint {
        supercell_hint(structure)
    } else {
        let projected = project_supercell(vibronic.supercell_selector, periodicity)?;
        if projected != vibronic.supercell_selector {
            debug!(requested = ?vibronic.supercell_selector, projected = ?projected, "pinned non-periodic supercell axes");
        }
        projected
    };
    let symprec = resolve_symprec(vibronic.symmetry_symprec, periodicity)?;

    let dielectric_property = kind.dielectric_property();
    let kpoints = (dielectric_property != DielectricProperty::None)
        .then(|| resolve_kpoints(&vibronic, workchain.protocol, structure));

    let phonopy_params_for = if kind.has_dispersion() {
        Some(post_processing(structure, symprec)?)
    } else {
        None
    };

    let defaults = default_overrides(workchain.protocol, periodicity, structure.num_sites());
    let overrides = deep_merge(defaults, advanced);

    debug!(
        kind = ?kind,
        protocol = %workchain.protocol,
        supercell = ?supercell,
        symprec,
        "resolved simulation plan"
    );

    Ok(Plan {
        kind,
        structure: structure.clone(),
        protocol: workchain.protocol,
        electronic_type: workchain.electronic_type,
        spin_type: workchain.spin_type,
        supercell,
        symprec,
        kpoints,
        phonopy_params_for,
        dielectric_property,
        overrides,
        codes,
    })
}
