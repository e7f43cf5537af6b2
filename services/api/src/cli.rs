use crate::check::{
    run_check, run_import_zips, run_normalize, CheckArgs, ImportZipsArgs, NormalizeArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use location_gate::error::AppError;
use location_gate::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "Location Gate",
    about = "Run and inspect the ZIP/state allowlist gate for form submissions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check a submission against a settings and schema document
    Check(CheckArgs),
    /// Show how a raw ZIP or state value is normalized
    Normalize(NormalizeArgs),
    /// Merge a CSV export of ZIP codes into a settings document
    ImportZips(ImportZipsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Check(args) => {
            telemetry::init_with_default("warn")?;
            run_check(args)
        }
        Command::Normalize(args) => run_normalize(args),
        Command::ImportZips(args) => {
            telemetry::init_with_default("warn")?;
            run_import_zips(args)
        }
    }
}
