use tempfile::TempDir;
use vibro_core::domain::{Periodicity, Site, Structure};
use vibro_core::export::{ExportKind, ExportRecord, read_record, write_record};
use vibro_core::kernels::{
    ModeRequest, ModeSolver, PhononSource, PowderParameters, PrecomputedModes, QPlaneParameters,
    SingleCrystalParameters, Weighting, powder_map, q_plane_section, single_crystal_map,
};
use vibro_core::lattice::{QPath, QPoint, StandardBulkPaths};
use vibro_core::numerics::vector::Mat3;
use vibro_core::phonopy::{
    BridgeInput, BridgeMode, CalculationSnapshot, ForceConstantsRecord, RawForceConstants,
    export_force_constants,
};

fn spring(k: f64) -> Mat3 {
    [[k, 0.0, 0.0], [0.0, k, 0.0], [0.0, 0.0, k]]
}

/// Monatomic carbon chain along x, loaded through the bridge.
fn chain_record() -> ForceConstantsRecord {
    let unit_cell = Structure::new(
        [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
        vec![Site::new("C", [0.0, 0.5, 0.5])],
        Periodicity::Chain,
    )
    .expect("chain should be valid");
    let snapshot = CalculationSnapshot {
        phonopy_data: None,
        force_constants: Some(RawForceConstants {
            unit_cell,
            supercell_matrix: [4, 1, 1],
            masses: None,
            force_constants: vec![vec![spring(10.0), spring(-5.0), spring(0.0), spring(-5.0)]],
            nac: None,
        }),
        settings: Default::default(),
    };
    export_force_constants(BridgeInput::Calculation(&snapshot), BridgeMode::Stream)
        .expect("bridge should succeed")
        .into_record()
        .expect("stream mode returns a record")
}

#[test]
fn single_shell_powder_map_survives_export_bit_exactly() {
    let record = chain_record();
    let parameters = PowderParameters {
        q_min: 0.5,
        q_max: 0.5,
        q_spacing: 0.5,
        npts: 30,
        ..PowderParameters::default()
    };
    let result = powder_map(PhononSource::ForceConstants(&record), &parameters).expect("powder map");
    assert_eq!(result.spectrum.shape().0, 1);

    let temp = TempDir::new().expect("tempdir should be created");
    let exported = ExportRecord::from_spectrum(ExportKind::Powder, &result).expect("record should build");
    let path = write_record(temp.path(), &exported).expect("record should be written");
    assert!(path.ends_with("powder.json"));

    let decoded = read_record(&path).expect("record should read back").spectrum().expect("spectrum");
    let bits = |values: &[f64]| values.iter().map(|value| value.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&decoded.x().edges), bits(&result.spectrum.x().edges));
    assert_eq!(bits(&decoded.y().edges), bits(&result.spectrum.y().edges));
    for (left, right) in decoded.z().iter().zip(result.spectrum.z()) {
        assert_eq!(bits(left), bits(right));
    }
    assert_eq!(decoded.z_unit(), result.spectrum.z_unit());
}

#[test]
fn precomputed_modes_reproduce_the_force_constant_map() {
    let record = chain_record();
    let path = QPath::through(
        &[QPoint::new("A", [0.1, 0.0, 0.0]), QPoint::new("B", [0.45, 0.0, 0.0])],
        0.1,
    )
    .expect("path should build");
    let parameters = SingleCrystalParameters {
        path: Some(path.clone()),
        q_spacing: 0.1,
        energy_fwhm: 0.0,
        energy_bins: 60,
        energy_window: Some([0.0, 150.0]),
        ..SingleCrystalParameters::default()
    };
    let from_force_constants =
        single_crystal_map(PhononSource::ForceConstants(&record), &parameters, &StandardBulkPaths)
            .expect("map from force constants");

    let solver = ModeSolver::new(&record);
    let sampled = path.sample(&record.primitive().reciprocal_lattice());
    let modes = sampled
        .qpoints
        .iter()
        .map(|q| solver.solve(&ModeRequest::at(*q)))
        .collect::<Result<Vec<_>, _>>()
        .expect("modes should solve");
    let precomputed = PrecomputedModes::new(
        record.primitive().clone(),
        record.masses().to_vec(),
        record.scattering_lengths().to_vec(),
        modes,
    )
    .expect("modes should be valid");
    let from_modes = single_crystal_map(PhononSource::Precomputed(&precomputed), &parameters, &StandardBulkPaths)
        .expect("map from precomputed modes");

    assert_eq!(from_modes.spectrum.shape(), from_force_constants.spectrum.shape());
    for (left, right) in from_modes.spectrum.z().iter().zip(from_force_constants.spectrum.z()) {
        for (a, b) in left.iter().zip(right) {
            assert!((a - b).abs() <= 1.0e-9 * b.abs().max(1.0));
        }
    }
}

#[test]
fn dos_weighting_counts_every_branch_once() {
    let record = chain_record();
    let parameters = SingleCrystalParameters {
        weighting: Weighting::Dos,
        path: Some(
            QPath::through(&[QPoint::new("A", [0.2, 0.0, 0.0]), QPoint::new("B", [0.4, 0.0, 0.0])], 0.05)
                .expect("path should build"),
        ),
        q_spacing: 0.05,
        energy_fwhm: 0.0,
        energy_window: Some([0.0, 200.0]),
        ..SingleCrystalParameters::default()
    };
    let result = single_crystal_map(PhononSource::ForceConstants(&record), &parameters, &StandardBulkPaths)
        .expect("dos map");
    for row in result.spectrum.z() {
        assert!((row.iter().sum::<f64>() - 3.0).abs() < 1.0e-9);
    }
    let exported = ExportRecord::single_crystal(&result).expect("record should build");
    assert_eq!(exported.file_name(), "single_crystal.json");
    assert_eq!(exported.units["z"], "modes/meV");
}

#[test]
fn q_plane_section_is_exported_as_q_section() {
    let record = chain_record();
    let parameters = QPlaneParameters {
        h: [1.0, 0.0, 0.0],
        k: [0.0, 1.0, 0.0],
        h_points: 4,
        k_points: 2,
        energy_centre: 60.0,
        energy_half_width: 20.0,
        ..QPlaneParameters::default()
    };
    let result = q_plane_section(PhononSource::ForceConstants(&record), &parameters).expect("section");
    assert_eq!(result.spectrum.shape(), (5, 3));
    assert_eq!(result.spectrum.x().unit, "r.l.u.");
    let exported = ExportRecord::from_spectrum(ExportKind::QSection, &result).expect("record should build");
    assert_eq!(exported.file_name(), "Q_section.json");
}
