use super::CliError;
use super::helpers::{PhononArgs, emit, read_json, read_optional_json, to_pretty_json};
use anyhow::Context;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use vibro_core::dielectric::DielectricView;
use vibro_core::domain::{Structure, VibroError};
use vibro_core::export::{DownloadPayload, ExportKind, ExportRecord, select_tier, write_payload, write_record};
use vibro_core::kernels::{
    PowderParameters, QPlaneParameters, SingleCrystalParameters, powder_map, q_plane_section,
    single_crystal_map,
};
use vibro_core::lattice::{
    DEFAULT_Q_SPACING, StandardBulkPaths, classify, high_symmetry_path, parse_custom_path,
    parse_polarization,
};
use vibro_core::phonopy::{
    BridgeInput, BridgeMode, BridgeOutput, CalculationSnapshot, FORCE_CONSTANTS_FILE,
    PHONOPY_YAML_FILE, export_force_constants,
};
use vibro_core::planner::{PlannerParameters, plan_simulation};
use vibro_core::spectra::{
    Plane, SelectionRule, SpectrumOutcome, SpectrumSettings, active_mode_table,
    plane_averaged_raman, powder_ir, powder_raman, single_crystal_ir, single_crystal_raman,
};
use vibro_core::workflow::WorkflowOutputs;

#[derive(clap::Args)]
pub(super) struct PlanArgs {
    /// Structure JSON (cell, sites, pbc)
    #[arg(long)]
    structure: PathBuf,

    /// Planner parameters JSON; defaults are used when absent
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Plan output path (stdout when absent)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_plan_command(args: PlanArgs) -> Result<i32, CliError> {
    let structure: Structure = read_json(&args.structure, "structure")?;
    let parameters: PlannerParameters = read_optional_json(args.parameters.as_deref(), "planner parameters")?;
    let plan = plan_simulation(parameters, &structure)?;
    emit(&to_pretty_json(&plan)?, args.output.as_deref())?;
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct QpathArgs {
    /// Structure JSON (cell, sites, pbc)
    #[arg(long)]
    structure: PathBuf,

    /// Custom path, e.g. "0 0 0 - 0.5 0 0 | 0.5 0.5 0 - 0 0 0"
    #[arg(long)]
    path: Option<String>,

    /// Sample spacing along the path (1/Å)
    #[arg(long, default_value_t = DEFAULT_Q_SPACING)]
    q_spacing: f64,
}

pub(super) fn run_qpath_command(args: QpathArgs) -> Result<i32, CliError> {
    let structure: Structure = read_json(&args.structure, "structure")?;
    let (lattice, path) = match &args.path {
        Some(text) => (None, parse_custom_path(text, args.q_spacing)?),
        None => {
            let tag = classify(&structure)?;
            (Some(tag), high_symmetry_path(tag, &structure, &StandardBulkPaths, args.q_spacing)?)
        }
    };
    let sampled = path.sample(&structure.reciprocal_lattice());
    let summary = json!({
        "lattice": lattice,
        "labels": path.ticks(),
        "ticks": sampled.ticks,
        "segments": sampled.segment_ranges,
        "qpoints": sampled.qpoints,
        "distances": sampled.distances,
    });
    emit(&to_pretty_json(&summary)?, None)?;
    Ok(0)
}

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("input").required(true).args(["calculation", "phonopy_yaml"])))]
pub(super) struct BridgeArgs {
    /// Calculation snapshot JSON exposing phonopy data or force constants
    #[arg(long)]
    calculation: Option<PathBuf>,

    /// Uploaded phonopy.yaml
    #[arg(long)]
    phonopy_yaml: Option<PathBuf>,

    /// Uploaded FORCE_CONSTANTS; produced from the displacement dataset when absent
    #[arg(long, requires = "phonopy_yaml")]
    force_constants: Option<PathBuf>,

    /// Write phonopy.yaml and FORCE_CONSTANTS instead of force_constants.json
    #[arg(long)]
    download: bool,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, CliError> {
    fs::read(path)
        .with_context(|| format!("failed to read '{}'", path.display()))
        .map_err(CliError::from)
}

pub(super) fn run_bridge_command(args: BridgeArgs) -> Result<i32, CliError> {
    let mode = if args.download { BridgeMode::Download } else { BridgeMode::Stream };
    let output = if let Some(path) = &args.calculation {
        let snapshot: CalculationSnapshot = read_json(path, "calculation snapshot")?;
        export_force_constants(BridgeInput::Calculation(&snapshot), mode)?
    } else if let Some(path) = &args.phonopy_yaml {
        let phonopy_yaml = read_bytes(path)?;
        let force_constants = match &args.force_constants {
            Some(path) => read_bytes(path)?,
            None => Vec::new(),
        };
        export_force_constants(
            BridgeInput::Files {
                phonopy_yaml: &phonopy_yaml,
                force_constants: &force_constants,
            },
            mode,
        )?
    } else {
        return Err(CliError::Usage("one of --calculation or --phonopy-yaml is required".to_string()));
    };

    match output {
        BridgeOutput::Record(record) => {
            let path = write_record(&args.out, &ExportRecord::force_constants(&record)?)?;
            println!("{}", path.display());
        }
        BridgeOutput::Download(bundle) => {
            for file in bundle.files {
                let mime = if file.name == PHONOPY_YAML_FILE { "application/x-yaml" } else { "text/plain" };
                let payload = DownloadPayload {
                    filename: file.name,
                    mime: mime.to_string(),
                    base64: file.base64,
                };
                let path = write_payload(&args.out, &payload)?;
                println!("{}", path.display());
            }
            info!(files = ?[PHONOPY_YAML_FILE, FORCE_CONSTANTS_FILE], "wrote phonopy download bundle");
        }
    }
    Ok(0)
}

#[derive(clap::Subcommand)]
pub(super) enum InsCommand {
    /// S(Q, ω) along a high-symmetry or custom path
    SingleCrystal(SingleCrystalArgs),
    /// Spherically averaged S(|Q|, ω)
    Powder(InsArgs),
    /// Constant-energy section through reciprocal space
    QPlane(InsArgs),
}

#[derive(clap::Args)]
pub(super) struct InsArgs {
    #[command(flatten)]
    phonons: PhononArgs,

    /// Kernel parameters JSON; defaults are used when absent
    #[arg(long)]
    parameters: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct SingleCrystalArgs {
    #[command(flatten)]
    common: InsArgs,

    /// Custom path, e.g. "0 0 0 - 0.5 0 0"; overrides the parameters file
    #[arg(long)]
    path: Option<String>,
}

pub(super) fn run_ins_command(command: InsCommand) -> Result<i32, CliError> {
    let path = match command {
        InsCommand::SingleCrystal(args) => {
            let mut parameters: SingleCrystalParameters =
                read_optional_json(args.common.parameters.as_deref(), "single-crystal parameters")?;
            if let Some(text) = &args.path {
                parameters.path = Some(parse_custom_path(text, parameters.q_spacing)?);
            }
            let phonons = args.common.phonons.load()?;
            let result = single_crystal_map(phonons.source(), &parameters, &StandardBulkPaths)?;
            write_record(&args.common.out, &ExportRecord::single_crystal(&result)?)?
        }
        InsCommand::Powder(args) => {
            let parameters: PowderParameters =
                read_optional_json(args.parameters.as_deref(), "powder parameters")?;
            let phonons = args.phonons.load()?;
            let result = powder_map(phonons.source(), &parameters)?;
            write_record(&args.out, &ExportRecord::from_spectrum(ExportKind::Powder, &result)?)?
        }
        InsCommand::QPlane(args) => {
            let parameters: QPlaneParameters =
                read_optional_json(args.parameters.as_deref(), "Q-plane parameters")?;
            let phonons = args.phonons.load()?;
            let result = q_plane_section(phonons.source(), &parameters)?;
            write_record(&args.out, &ExportRecord::from_spectrum(ExportKind::QSection, &result)?)?
        }
    };
    println!("{}", path.display());
    Ok(0)
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum RuleArg {
    Raman,
    Ir,
}

impl From<RuleArg> for SelectionRule {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Raman => Self::Raman,
            RuleArg::Ir => Self::Ir,
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub(super) enum GeometryArg {
    Powder,
    SingleCrystal,
    Plane,
}

#[derive(clap::Args)]
pub(super) struct SpectraArgs {
    /// Workflow outputs JSON
    #[arg(long)]
    outputs: PathBuf,

    #[arg(long, value_enum, default_value = "raman")]
    rule: RuleArg,

    #[arg(long, value_enum, default_value = "powder")]
    geometry: GeometryArg,

    /// Incoming polarisation "x y z" (single-crystal Raman)
    #[arg(long)]
    incoming: Option<String>,

    /// Outgoing polarisation "x y z" (single-crystal Raman)
    #[arg(long)]
    outgoing: Option<String>,

    /// Electric-field polarisation "x y z" (single-crystal IR)
    #[arg(long)]
    polarization: Option<String>,

    /// Averaging plane: xy, yz or xz
    #[arg(long, default_value = "xy")]
    plane: String,

    /// Spectrum settings JSON; defaults are used when absent
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Laser wavelength (nm)
    #[arg(long)]
    laser: Option<f64>,

    /// Temperature (K)
    #[arg(long)]
    temperature: Option<f64>,

    /// Lorentzian FWHM (cm⁻¹)
    #[arg(long)]
    fwhm: Option<f64>,

    /// Print the active-mode table instead of computing a spectrum
    #[arg(long)]
    active_modes: bool,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

fn required_polarization(text: Option<&str>, flag: &str) -> Result<[f64; 3], CliError> {
    let text = text.ok_or_else(|| CliError::Usage(format!("{flag} is required for this geometry")))?;
    Ok(parse_polarization(text)?)
}

pub(super) fn run_spectra_command(args: SpectraArgs) -> Result<i32, CliError> {
    let outputs: WorkflowOutputs = read_json(&args.outputs, "workflow outputs")?;
    let mut settings: SpectrumSettings = read_optional_json(args.settings.as_deref(), "spectrum settings")?;
    if let Some(laser) = args.laser {
        settings.laser_wavelength = laser;
    }
    if let Some(temperature) = args.temperature {
        settings.temperature = temperature;
    }
    if let Some(fwhm) = args.fwhm {
        settings.fwhm = fwhm;
    }
    let (tier, data) = select_tier(&outputs.vibrational_data)?;
    let rule = SelectionRule::from(args.rule);

    if args.active_modes {
        let table = active_mode_table(data, rule, &settings)?;
        emit(&to_pretty_json(&table)?, None)?;
        return Ok(0);
    }

    let outcome = match (rule, args.geometry) {
        (SelectionRule::Raman, GeometryArg::Powder) => powder_raman(data, &settings)?,
        (SelectionRule::Ir, GeometryArg::Powder) => powder_ir(data, &settings)?,
        (SelectionRule::Raman, GeometryArg::SingleCrystal) => {
            let incoming = required_polarization(args.incoming.as_deref(), "--incoming")?;
            let outgoing = required_polarization(args.outgoing.as_deref(), "--outgoing")?;
            single_crystal_raman(data, &settings, incoming, outgoing)?
        }
        (SelectionRule::Ir, GeometryArg::SingleCrystal) => {
            let polarization = required_polarization(args.polarization.as_deref(), "--polarization")?;
            single_crystal_ir(data, &settings, polarization)?
        }
        (SelectionRule::Raman, GeometryArg::Plane) => {
            let plane: Plane = args.plane.parse()?;
            plane_averaged_raman(data, &settings, plane)?
        }
        (SelectionRule::Ir, GeometryArg::Plane) => {
            return Err(CliError::Usage("plane averaging is only available for Raman".to_string()));
        }
    };
    if let SpectrumOutcome::NoActiveModes(message) = &outcome {
        println!("{message}");
    }
    let parameters = serde_json::to_value(&settings).context("failed to record spectrum settings")?;
    let path = write_record(&args.out, &ExportRecord::spectra(&outcome, parameters, tier)?)?;
    println!("{}", path.display());
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct DielectricArgs {
    /// Workflow outputs JSON
    #[arg(long)]
    outputs: PathBuf,

    /// Site whose Born charges and Raman tensors are shown
    #[arg(long, default_value_t = 0)]
    site: usize,

    /// Also write dielectric.json into this directory
    #[arg(long)]
    out: Option<PathBuf>,
}

pub(super) fn run_dielectric_command(args: DielectricArgs) -> Result<i32, CliError> {
    let outputs: WorkflowOutputs = read_json(&args.outputs, "workflow outputs")?;
    let mut view = DielectricView::from_outputs(&outputs)?;
    view.select_site(args.site)?;
    let snapshot = view.snapshot();
    emit(&to_pretty_json(&snapshot)?, None)?;
    if let Some(dir) = &args.out {
        let data = serde_json::to_value(&snapshot).context("failed to serialise dielectric view")?;
        let record = ExportRecord::new(ExportKind::Dielectric, data, json!({ "site": args.site }))
            .with_unit("nlo_susceptibility", vibro_core::dielectric::NLO_UNIT)
            .with_tier(view.tier());
        write_record(dir, &record)?;
    }
    Ok(0)
}

#[derive(clap::Args)]
pub(super) struct ExportArgs {
    /// Workflow outputs JSON
    #[arg(long)]
    outputs: PathBuf,

    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
}

pub(super) fn run_export_command(args: ExportArgs) -> Result<i32, CliError> {
    let outputs: WorkflowOutputs = read_json(&args.outputs, "workflow outputs")?;
    let mut written = Vec::new();
    for (kind, tree) in [
        (ExportKind::PhononBands, &outputs.phonon_bands),
        (ExportKind::PhononDos, &outputs.phonon_pdos),
        (ExportKind::PhononThermo, &outputs.phonon_thermo),
    ] {
        if let Some(tree) = tree {
            written.push(write_record(&args.out, &ExportRecord::upstream(kind, tree))?);
        }
    }
    if let Some(input) = outputs.phonon_calculation() {
        let record = export_force_constants(input, BridgeMode::Stream)?
            .into_record()
            .ok_or_else(|| VibroError::kernel_internal("stream export returned no record"))?;
        written.push(write_record(&args.out, &ExportRecord::force_constants(&record)?)?);
    }
    if written.is_empty() {
        return Err(CliError::Compute(VibroError::invalid_input(
            "workflow outputs hold nothing to export",
        )));
    }
    for path in written {
        println!("{}", path.display());
    }
    Ok(0)
}
