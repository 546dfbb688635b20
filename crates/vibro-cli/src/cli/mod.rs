mod commands;
mod helpers;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vibro_core::domain::VibroError;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let error = error.as_vibro_error();
            eprintln!("{}", error.diagnostic_line());
            if let Some(summary_line) = error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("vibroscopy".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            init_logging(cli.verbose);
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(name = "vibroscopy", version, about = "Vibrational spectroscopy from phonon calculations")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Resolve simulation parameters into a workflow plan
    Plan(commands::PlanArgs),
    /// Print the high-symmetry or custom q-path of a structure
    Qpath(commands::QpathArgs),
    /// Export force constants from a phonon calculation or phonopy files
    Bridge(commands::BridgeArgs),
    /// Inelastic neutron-scattering maps
    #[command(subcommand)]
    Ins(commands::InsCommand),
    /// Raman or IR spectrum from vibrational data
    Spectra(commands::SpectraArgs),
    /// Dielectric, Born-charge, Raman and NLO tensors of one site
    Dielectric(commands::DielectricArgs),
    /// Write the upstream band, DOS and thermal results
    Export(commands::ExportArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Plan(args) => commands::run_plan_command(args),
        CliCommand::Qpath(args) => commands::run_qpath_command(args),
        CliCommand::Bridge(args) => commands::run_bridge_command(args),
        CliCommand::Ins(command) => commands::run_ins_command(command),
        CliCommand::Spectra(args) => commands::run_spectra_command(args),
        CliCommand::Dielectric(args) => commands::run_dielectric_command(args),
        CliCommand::Export(args) => commands::run_export_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(VibroError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<VibroError> for CliError {
    fn from(error: VibroError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_vibro_error(&self) -> VibroError {
        match self {
            Self::Usage(message) => VibroError::invalid_input(message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => VibroError::io(format!("{error:#}")),
        }
    }
}
