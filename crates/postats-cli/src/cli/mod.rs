mod commands;
mod helpers;

use clap::Parser;
use postats_core::domain::PoStatsError;
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let service_error = error.as_postats_error();
            eprintln!("{}", service_error.diagnostic_line());
            eprintln!("{}", service_error.fatal_exit_line());
            service_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("postats".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.global, cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "postats", version, about = "Predicted/observed statistics tracking for pull requests")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct GlobalArgs {
    /// Directory holding run documents and the status outbox
    #[arg(long, global = true, default_value = ".postats")]
    store: PathBuf,

    /// Service config JSON (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Open (or reset) the run for a pull request
    Open(commands::OpenArgs),
    /// Upload files to an open run
    Add(commands::AddArgs),
    /// Close a run and publish its status
    Close(commands::CloseArgs),
    /// Accept a closed run as the new baseline
    Accept(commands::RunArgs),
    /// Show the current status of a run
    Status(commands::RunArgs),
    /// Close every open run whose deadline has passed
    Expire,
    /// Compare two run documents without touching the store
    Compare(commands::CompareArgs),
}

fn dispatch_parsed(global: GlobalArgs, command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Open(args) => commands::run_open_command(&global, args),
        CliCommand::Add(args) => commands::run_add_command(&global, args),
        CliCommand::Close(args) => commands::run_close_command(&global, args),
        CliCommand::Accept(args) => commands::run_accept_command(&global, args),
        CliCommand::Status(args) => commands::run_status_command(&global, args),
        CliCommand::Expire => commands::run_expire_command(&global),
        CliCommand::Compare(args) => commands::run_compare_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Service(PoStatsError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<PoStatsError> for CliError {
    fn from(error: PoStatsError) -> Self {
        Self::Service(error)
    }
}

impl CliError {
    fn as_postats_error(&self) -> PoStatsError {
        match self {
            Self::Usage(message) => {
                PoStatsError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Service(error) => error.clone(),
            Self::Internal(error) => PoStatsError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
