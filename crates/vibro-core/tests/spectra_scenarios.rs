use vibro_core::domain::{ErrorKind, Periodicity, Site, Structure, VibrationalData};
use vibro_core::numerics::vector::{IDENTITY, Mat3};
use vibro_core::spectra::{
    ActiveModeTable, IntensitySpectrum, Plane, SelectionRule, SpectrumOutcome, SpectrumSettings,
    active_mode_table, plane_averaged_raman, powder_ir, powder_raman, single_crystal_raman,
};

const ZERO: Mat3 = [[0.0; 3]; 3];

fn centred_atom() -> Structure {
    Structure::new(
        [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
        vec![Site::new("Si", [0.5, 0.5, 0.5])],
        Periodicity::Molecule,
    )
    .expect("molecule cell should be valid")
}

/// Three labelled modes: a breathing A₁g along x, an Eg shear along y and an
/// IR-active A₂u along z.
fn labelled_modes() -> VibrationalData {
    let mut data = VibrationalData::new(centred_atom());
    data.frequencies = Some(vec![300.0, 400.0, 500.0]);
    data.eigenvectors = Some(vec![
        vec![[1.0, 0.0, 0.0]],
        vec![[0.0, 1.0, 0.0]],
        vec![[0.0, 0.0, 1.0]],
    ]);
    data.mode_labels = Some(vec!["A₁g".into(), "Eg".into(), "A₂u".into()]);
    data.raman_tensors = Some(vec![[
        IDENTITY,
        [[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 0.0]],
        ZERO,
    ]]);
    data.born_charges = Some(vec![IDENTITY]);
    data.dielectric = Some(IDENTITY);
    data
}

fn spectrum(outcome: SpectrumOutcome) -> IntensitySpectrum {
    match outcome {
        SpectrumOutcome::Spectrum(spectrum) => spectrum,
        SpectrumOutcome::NoActiveModes(sentinel) => panic!("expected active modes, got '{sentinel}'"),
    }
}

#[test]
fn parity_labels_decide_the_raman_table() {
    let table = active_mode_table(&labelled_modes(), SelectionRule::Raman, &SpectrumSettings::default())
        .expect("table should build");
    let ActiveModeTable::Modes(modes) = table else {
        panic!("gerade modes are Raman active");
    };
    let indices: Vec<usize> = modes.iter().map(|mode| mode.index).collect();
    assert_eq!(indices, [0, 1]);
    assert_eq!(modes[0].label, "A₁g");
    assert_eq!(modes[1].wavenumber, 400.0);
}

#[test]
fn powder_raman_keeps_only_gerade_modes() {
    let raman = spectrum(powder_raman(&labelled_modes(), &SpectrumSettings::default()).expect("powder Raman"));
    assert_eq!(raman.frequencies, [300.0, 400.0]);
    assert_eq!(raman.labels, ["A₁g", "Eg"]);
    assert_eq!(raman.eigenvectors, [vec![[1.0, 0.0, 0.0]], vec![[0.0, 1.0, 0.0]]]);
    assert_eq!(raman.wavenumbers.first().copied(), Some(100.0));
    assert_eq!(raman.wavenumbers.last().copied(), Some(600.0));

    // A pure trace tensor has no anisotropy, so it stays fully polarised.
    let depolarised = &raman.intensities["depolarised"];
    assert!(depolarised[0].abs() < 1.0e-12);
    assert!(depolarised[1] > 0.0);
    assert!(raman.intensities["polarised"].iter().all(|value| *value > 0.0));
    assert!(raman.total().iter().all(|value| value.is_finite()));
}

#[test]
fn powder_ir_keeps_only_the_ungerade_mode() {
    let ir = spectrum(powder_ir(&labelled_modes(), &SpectrumSettings::default()).expect("powder IR"));
    assert_eq!(ir.frequencies, [500.0]);
    assert_eq!(ir.labels, ["A₂u"]);
    assert!(ir.intensities["intensity"][0] > 0.0);
}

#[test]
fn crossed_polarisations_pick_out_the_shear_mode() {
    let data = labelled_modes();
    let settings = SpectrumSettings::default();
    let crossed = spectrum(
        single_crystal_raman(&data, &settings, [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]).expect("crossed Raman"),
    );
    let intensities = &crossed.intensities["intensity"];
    assert!(intensities[0].abs() < 1.0e-12);
    assert!(intensities[1] > 0.0);

    let averaged = spectrum(plane_averaged_raman(&data, &settings, Plane::Xy).expect("plane average"));
    assert_eq!(averaged.frequencies, [300.0, 400.0]);
}

#[test]
fn unlabelled_modes_without_dipoles_report_the_ir_sentinel() {
    let mut data = labelled_modes();
    data.mode_labels = None;
    data.born_charges = Some(vec![ZERO]);
    let outcome = powder_ir(&data, &SpectrumSettings::default()).expect("IR runs");
    assert_eq!(outcome, SpectrumOutcome::NoActiveModes("No IR modes detected.".to_string()));
    assert_eq!(SelectionRule::Ir.sentinel(), "No IR modes detected.");
}

#[test]
fn frequencies_alone_cannot_give_intensities() {
    let mut data = labelled_modes();
    data.eigenvectors = None;
    let error = powder_raman(&data, &SpectrumSettings::default()).expect_err("eigenvectors are required");
    assert_eq!(error.kind(), ErrorKind::NeedsEigenvectors);
}
