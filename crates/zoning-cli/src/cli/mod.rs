mod commands;
mod helpers;

use clap::Parser;
use zoning_core::domain::FailureReason;

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
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
    let full_args = std::iter::once("deform-zoning".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            helpers::init_logging(cli.verbose);
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

#[derive(Parser)]
#[command(
    name = "deform-zoning",
    version,
    about = "Zone DEFORM models into Dream3D microstructure volumes"
)]
struct Cli {
    /// Log pipeline stages at debug level (RUST_LOG is honoured otherwise)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Render the job description, run PipelineRunner and locate its volume dataset
    Run(commands::RunArgs),
    /// Render the job description without running anything
    Render(commands::RenderArgs),
    /// List the datasets of a Dream3D XDMF artifact
    Inspect(commands::InspectArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Run(args) => commands::run_pipeline_command(args),
        CliCommand::Render(args) => commands::run_render_command(args),
        CliCommand::Inspect(args) => commands::run_inspect_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Pipeline(#[from] FailureReason),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Pipeline(reason) => reason.exit_code(),
            Self::Internal(_) => 3,
        }
    }

    fn diagnostic_line(&self) -> String {
        match self {
            Self::Usage(message) => format!("ERROR: [INPUT.CLI_USAGE] {}", message.trim_end()),
            Self::Pipeline(reason) => reason.diagnostic_line(),
            Self::Internal(error) => format!("ERROR: [IO.CLI] {error:#}"),
        }
    }

    fn fatal_exit_line(&self) -> Option<String> {
        match self {
            Self::Pipeline(reason) => reason.fatal_exit_line(),
            _ => Some(format!("FATAL EXIT CODE: {}", self.exit_code())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CliError, run};
    use zoning_core::domain::{FailureReason, ValidationError};

    #[test]
    fn help_is_not_an_error() {
        assert_eq!(run(["--help"]).expect("help should succeed"), 0);
        assert_eq!(run(["render", "--help"]).expect("help should succeed"), 0);
    }

    #[test]
    fn unknown_subcommand_is_a_usage_error() {
        let error = run(["zone-everything"]).expect_err("parse should fail");
        assert!(matches!(error, CliError::Usage(_)));
        assert_eq!(error.exit_code(), 2);
        assert!(
            error
                .diagnostic_line()
                .starts_with("ERROR: [INPUT.CLI_USAGE]")
        );
    }

    #[test]
    fn pipeline_errors_keep_their_exit_codes() {
        let error = CliError::from(FailureReason::from(ValidationError::MissingAttribute));
        assert_eq!(error.exit_code(), 2);
        assert_eq!(
            error.fatal_exit_line().as_deref(),
            Some("FATAL EXIT CODE: 2")
        );
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [INPUT.MISSING_ATTRIBUTE] zoning attribute name must not be blank"
        );
    }
}
