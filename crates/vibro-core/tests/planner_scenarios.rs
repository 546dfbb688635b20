use vibro_core::domain::{Periodicity, Site, Structure};
use vibro_core::planner::{
    BandSpec, CHAIN_SYMPREC, DEFAULT_SYMPREC, DielectricProperty, MeshSpec, PlanKind,
    PlannerParameters, VibronicSettings, plan_simulation, project_supercell,
};
use vibro_core::numerics::vector::IDENTITY;

fn diamond_silicon() -> Structure {
    let sites = [
        [0.0, 0.0, 0.0],
        [0.0, 0.5, 0.5],
        [0.5, 0.0, 0.5],
        [0.5, 0.5, 0.0],
        [0.25, 0.25, 0.25],
        [0.25, 0.75, 0.75],
        [0.75, 0.25, 0.75],
        [0.75, 0.75, 0.25],
    ]
    .into_iter()
    .map(|position| Site::new("Si", position))
    .collect();
    Structure::new(
        [[5.43, 0.0, 0.0], [0.0, 5.43, 0.0], [0.0, 0.0, 5.43]],
        sites,
        Periodicity::Bulk,
    )
    .expect("diamond cell should be valid")
}

fn graphene() -> Structure {
    let a = 2.46;
    Structure::new(
        [[a, 0.0, 0.0], [-0.5 * a, 0.5 * 3.0_f64.sqrt() * a, 0.0], [0.0, 0.0, 20.0]],
        vec![
            Site::new("C", [1.0 / 3.0, 2.0 / 3.0, 0.5]),
            Site::new("C", [2.0 / 3.0, 1.0 / 3.0, 0.5]),
        ],
        Periodicity::Sheet,
    )
    .expect("graphene cell should be valid")
}

fn carbon_chain() -> Structure {
    Structure::new(
        [[2.5, 0.0, 0.0], [0.0, 12.0, 0.0], [0.0, 0.0, 12.0]],
        vec![Site::new("C", [0.0, 0.5, 0.5]), Site::new("C", [0.5, 0.5, 0.5])],
        Periodicity::Chain,
    )
    .expect("chain cell should be valid")
}

fn parameters(mode: i64, supercell: [u32; 3]) -> PlannerParameters {
    let mut parameters = PlannerParameters::default();
    parameters.vibronic.simulation_mode = mode;
    parameters.vibronic.supercell_selector = supercell;
    parameters
}

#[test]
fn silicon_phonon_only_plan() {
    let plan = plan_simulation(parameters(3, [2, 2, 2]), &diamond_silicon()).expect("plan should resolve");
    assert_eq!(plan.kind, PlanKind::Phonon);
    assert_eq!(plan.dielectric_property, DielectricProperty::None);
    assert!(plan.kpoints.is_none());
    assert_eq!(plan.supercell, [2, 2, 2]);

    let post = plan.phonopy_params_for.expect("phonon plans are post-processed");
    assert_eq!(post.bands.band, BandSpec::Auto);
    assert_eq!(post.bands.band_points, 100);
    assert_eq!(post.pdos.mesh, MeshSpec::Length(150.0));
    assert_eq!(post.thermo.mesh, MeshSpec::Length(150.0));
    assert!(post.thermo.tprop);
    assert_eq!(post.symmetry_tolerances(), [DEFAULT_SYMPREC; 3]);
}

#[test]
fn hexagonal_sheet_full_plan() {
    let plan = plan_simulation(parameters(1, [4, 4, 4]), &graphene()).expect("plan should resolve");
    assert_eq!(plan.kind, PlanKind::Full);
    assert_eq!(plan.supercell, [4, 4, 1]);
    assert_eq!(plan.dielectric_property, DielectricProperty::Raman);

    let post = plan.phonopy_params_for.expect("full plans are post-processed");
    assert_eq!(post.bands.band_labels, ["Γ", "M", "K", "Γ"]);
    assert_eq!(post.bands.primitive_axes, IDENTITY);
    match &post.bands.band {
        BandSpec::Path(band) => assert_eq!(band.labels, post.bands.band_labels),
        BandSpec::Auto => panic!("sheets get an explicit band path"),
    }
    match post.pdos.mesh {
        MeshSpec::Divisions(mesh) => assert_eq!(mesh[2], 1),
        MeshSpec::Length(_) => panic!("low-dimensional meshes are explicit divisions"),
    }
}

#[test]
fn chain_plan_tightens_symmetry_everywhere() {
    let plan = plan_simulation(parameters(3, [3, 3, 3]), &carbon_chain()).expect("plan should resolve");
    assert_eq!(plan.supercell, [3, 1, 1]);
    assert_eq!(plan.symprec, CHAIN_SYMPREC);
    let post = plan.phonopy_params_for.expect("phonon plans are post-processed");
    assert_eq!(post.bands.band_labels, ["Γ", "X"]);
    assert_eq!(post.symmetry_tolerances(), [CHAIN_SYMPREC; 3]);
}

#[test]
fn chain_symprec_overrides_the_requested_tolerance() {
    let mut parameters = parameters(3, [2, 2, 2]);
    parameters.vibronic.symmetry_symprec = DEFAULT_SYMPREC;
    let plan = plan_simulation(parameters, &carbon_chain()).expect("plan should resolve");
    assert_eq!(plan.symprec, 1.0e-3);
}

#[test]
fn projection_pins_exactly_the_non_periodic_axes() {
    let periodicities = [
        Periodicity::Bulk,
        Periodicity::Sheet,
        Periodicity::Chain,
        Periodicity::Molecule,
    ];
    for periodicity in periodicities {
        for selector in [[1, 1, 1], [2, 3, 4], [5, 1, 7], [9, 9, 9]] {
            let projected = project_supercell(selector, periodicity).expect("positive selectors project");
            for axis in 0..3 {
                if periodicity.is_periodic(axis) {
                    assert_eq!(projected[axis], selector[axis]);
                } else {
                    assert_eq!(projected[axis], 1);
                }
            }
        }
    }
}

#[test]
fn reset_restores_defaults_per_periodicity() {
    let mut settings = VibronicSettings {
        supercell_selector: [5, 6, 7],
        symmetry_symprec: 0.1,
        supercell_hint: true,
        ..VibronicSettings::default()
    };
    settings.reset(Periodicity::Sheet);
    assert_eq!(settings.supercell_selector, [2, 2, 2]);
    assert_eq!(settings.symmetry_symprec, 1.0e-5);
    settings.reset(Periodicity::Chain);
    assert_eq!(settings.symmetry_symprec, 1.0e-3);
}

#[test]
fn user_overrides_win_over_protocol_defaults() {
    let mut parameters = parameters(2, [2, 2, 2]);
    parameters.advanced = serde_json::json!({"pw": {"parameters": {"SYSTEM": {"ecutwfc": 80.0}}}});
    let plan = plan_simulation(parameters, &diamond_silicon()).expect("plan should resolve");
    assert_eq!(plan.kind, PlanKind::Spectra);
    assert_eq!(plan.supercell, [1, 1, 1]);
    assert_eq!(plan.overrides["pw"]["parameters"]["SYSTEM"]["ecutwfc"], 80.0);
}

#[test]
fn user_kpoints_distance_keeps_the_parallel_distance() {
    let mut chosen = parameters(4, [1, 1, 1]);
    chosen.vibronic.kpoints_distance = Some(0.2);
    chosen.vibronic.kpoints_parallel_distance = Some(0.1);
    let plan = plan_simulation(chosen, &graphene()).expect("plan should resolve");
    let kpoints = plan.kpoints.expect("dielectric plan has k-points");
    assert_eq!(kpoints.distance, Some(0.2));
    assert_eq!(kpoints.parallel_distance, Some(0.1));
    assert_eq!(kpoints.mesh.map(|mesh| mesh[2]), Some(1));

    let mut defaulted = parameters(4, [1, 1, 1]);
    defaulted.vibronic.kpoints_parallel_distance = Some(0.1);
    let plan = plan_simulation(defaulted, &graphene()).expect("plan should resolve");
    let kpoints = plan.kpoints.expect("dielectric plan has k-points");
    assert_eq!(kpoints.parallel_distance, None);
    assert!(kpoints.distance.is_some());
}
