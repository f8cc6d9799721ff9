//! Scronch CLI - inspect and dry-run the export
//!
//! Commands: procedure, settings, run
//! Outputs JSON to stdout
//! Returns 2 when the export reports an execution error

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use scronch_core::{
    dry_run::SOURCE_IMAGE,
    logging::init_tracing,
    DryRunHost, ExportFormat, ExportPipeline, ExportSettings, PdbStatus, ScronchPlugin, PROCEDURE_NAME,
};

#[derive(Parser)]
#[command(name = "scronch-cli")]
#[command(about = "Scronch CLI - duplicate, flatten and export with a timestamp")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON settings file (defaults to the compiled-in settings)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the procedure registration descriptor
    Procedure,

    /// Print the effective export settings
    Settings,

    /// Run the full export against an in-memory host; nothing is written
    Run {
        /// Path of the source image; omit for an unsaved image
        #[arg(long)]
        source: Option<PathBuf>,

        /// Working directory reported by the host
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Pretend this backend is not installed
        #[arg(long, value_enum)]
        without: Vec<Backend>,

        /// Status the backend reports
        #[arg(long, value_enum, default_value = "success")]
        status: BackendStatus,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Avif,
    Png,
}

impl From<Backend> for ExportFormat {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Avif => ExportFormat::Avif,
            Backend::Png => ExportFormat::Png,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendStatus {
    Success,
    ExecutionError,
    CallingError,
    Cancel,
}

impl From<BackendStatus> for PdbStatus {
    fn from(s: BackendStatus) -> Self {
        match s {
            BackendStatus::Success => PdbStatus::Success,
            BackendStatus::ExecutionError => PdbStatus::ExecutionError,
            BackendStatus::CallingError => PdbStatus::CallingError,
            BackendStatus::Cancel => PdbStatus::Cancel,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO });

    let settings = match &cli.settings {
        Some(path) => match ExportSettings::load_from_file(path) {
            Ok(s) => s,
            Err(e) => {
                print_json(&serde_json::json!({ "error": format!("Failed to load settings: {}", e) }));
                return ExitCode::FAILURE;
            }
        },
        None => ExportSettings::default(),
    };

    match cli.command {
        Commands::Procedure => {
            let plugin = ScronchPlugin::new(settings);
            let procedures: Vec<_> = plugin
                .query_procedures()
                .into_iter()
                .filter_map(|name| plugin.create_procedure(name))
                .collect();
            print_json(&procedures);
            ExitCode::SUCCESS
        }

        Commands::Settings => {
            if let Err(e) = settings.validate() {
                print_json(&serde_json::json!({ "valid": false, "error": e.to_string() }));
                return ExitCode::FAILURE;
            }
            print_json(&settings);
            ExitCode::SUCCESS
        }

        Commands::Run { source, cwd, without, status } => {
            let mut host = DryRunHost::new().with_status(status.into());
            if let Some(source) = source {
                host = host.with_source_file(source);
            }
            let cwd = match cwd.map(Ok).unwrap_or_else(std::env::current_dir) {
                Ok(dir) => dir,
                Err(e) => {
                    print_json(&serde_json::json!({ "error": format!("No working directory: {}", e) }));
                    return ExitCode::FAILURE;
                }
            };
            host = host.with_cwd(cwd);
            for backend in without {
                host = host.without_procedure(ExportFormat::from(backend).procedure_name());
            }

            let pipeline = ExportPipeline::new(settings);
            let now = chrono::Local::now().naive_local();
            let result = pipeline.invoke_at(&host, SOURCE_IMAGE, now);

            let (status, report, error) = match result {
                Ok(report) => (PdbStatus::Success, Some(report), None),
                Err(e) => (PdbStatus::ExecutionError, None, Some(e.to_string())),
            };
            print_json(&serde_json::json!({
                "procedure": PROCEDURE_NAME,
                "status": status,
                "report": report,
                "error": error,
                "calls": host.calls(),
            }));

            if status.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}
