use vibro_core::domain::{ErrorKind, Periodicity, Site, Structure};
use vibro_core::numerics::vector::Mat3;
use vibro_core::phonopy::{
    BridgeInput, BridgeMode, BridgeOutput, CalculationSnapshot, FORCE_CONSTANTS_FILE,
    ForceConstantsRecord, PHONOPY_YAML_FILE, RawForceConstants, export_force_constants,
};

fn spring(k: f64) -> Mat3 {
    [[k, 0.0, 0.0], [0.0, k, 0.0], [0.0, 0.0, k]]
}

fn chain_snapshot() -> CalculationSnapshot {
    let unit_cell = Structure::new(
        [[2.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]],
        vec![Site::new("C", [0.0, 0.5, 0.5])],
        Periodicity::Chain,
    )
    .expect("chain should be valid");
    CalculationSnapshot {
        phonopy_data: None,
        force_constants: Some(RawForceConstants {
            unit_cell,
            supercell_matrix: [3, 1, 1],
            masses: None,
            force_constants: vec![vec![spring(10.0), spring(-5.0), spring(-5.0)]],
            nac: None,
        }),
        settings: Default::default(),
    }
}

fn stream(input: BridgeInput<'_>) -> ForceConstantsRecord {
    export_force_constants(input, BridgeMode::Stream)
        .expect("stream export should succeed")
        .into_record()
        .expect("stream mode returns a record")
}

#[test]
fn calculation_streams_a_record_with_element_defaults() {
    let snapshot = chain_snapshot();
    let record = stream(BridgeInput::Calculation(&snapshot));
    assert_eq!(record.num_atoms(), 1);
    assert_eq!(record.supercell().matrix, [3, 1, 1]);
    assert_eq!(record.supercell().cell_count(), 3);
    assert_eq!(record.num_branches(), 3);
    assert_eq!(record.masses(), [12.011]);
    assert_eq!(record.scattering_lengths(), [6.646]);
    assert_eq!(record.force_constants()[0].len(), 3);
    assert_eq!(record.force_constants()[0][0], spring(10.0));
    assert!(record.nac().is_none());
}

#[test]
fn download_bundle_reimports_to_the_same_record() {
    let snapshot = chain_snapshot();
    let streamed = stream(BridgeInput::Calculation(&snapshot));

    let bundle = match export_force_constants(BridgeInput::Calculation(&snapshot), BridgeMode::Download)
        .expect("download export should succeed")
    {
        BridgeOutput::Download(bundle) => bundle,
        BridgeOutput::Record(_) => panic!("download mode returns a bundle"),
    };
    let names: Vec<&str> = bundle.files.iter().map(|file| file.name.as_str()).collect();
    assert_eq!(names, [PHONOPY_YAML_FILE, FORCE_CONSTANTS_FILE]);

    let phonopy_yaml = bundle.decode(PHONOPY_YAML_FILE).expect("yaml decodes");
    let force_constants = bundle.decode(FORCE_CONSTANTS_FILE).expect("force constants decode");
    assert!(String::from_utf8_lossy(&force_constants).starts_with("   1    3"));

    let reimported = stream(BridgeInput::Files {
        phonopy_yaml: &phonopy_yaml,
        force_constants: &force_constants,
    });
    assert_eq!(reimported, streamed);
}

#[test]
fn missing_forces_and_force_constants_are_rejected() {
    let snapshot = chain_snapshot();
    let bundle = match export_force_constants(BridgeInput::Calculation(&snapshot), BridgeMode::Download)
        .expect("download export should succeed")
    {
        BridgeOutput::Download(bundle) => bundle,
        BridgeOutput::Record(_) => panic!("download mode returns a bundle"),
    };
    let phonopy_yaml = bundle.decode(PHONOPY_YAML_FILE).expect("yaml decodes");

    let error = export_force_constants(
        BridgeInput::Files {
            phonopy_yaml: &phonopy_yaml,
            force_constants: b"",
        },
        BridgeMode::Stream,
    )
    .expect_err("nothing to build force constants from");
    assert_eq!(error.kind(), ErrorKind::BadPhonopyInput);

    let error = export_force_constants(
        BridgeInput::Files {
            phonopy_yaml: &phonopy_yaml,
            force_constants: b"1 3\n1 1\nnot numbers\n",
        },
        BridgeMode::Stream,
    )
    .expect_err("corrupt force constants");
    assert_eq!(error.kind(), ErrorKind::CorruptForceConstants);
}

#[test]
fn empty_calculation_is_bad_input() {
    let error = export_force_constants(
        BridgeInput::Calculation(&CalculationSnapshot::default()),
        BridgeMode::Stream,
    )
    .expect_err("empty calculation");
    assert_eq!(error.kind(), ErrorKind::BadPhonopyInput);
}
