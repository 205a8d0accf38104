//! Top-level CLI definition and dispatch.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgGroup, Parser};
use colored::{Colorize, control};
use serde_json::Value;
use thiserror::Error;

use repo_cache_verifier::core::config::Config;
use repo_cache_verifier::core::errors::RcvError;
use repo_cache_verifier::logger::jsonl::{JsonlConfig, JsonlWriter};
use repo_cache_verifier::scanner::cleaner::ReportOnlyCleaner;
use repo_cache_verifier::scanner::engine::{RunMode, Verifier, VerifierOptions};
use repo_cache_verifier::scanner::progress::Progress;
use repo_cache_verifier::scanner::report::RunSummary;

/// Usage banner printed for missing or illegal arguments.
pub const USAGE: &str = "Usage: rcv (--test|--clean) [OPTIONS] [DIRECTORY ...]";

/// Accepted first arguments: a mode, or a request for help/version text.
const LEADING_ARGS: [&str; 6] = ["--test", "--clean", "--help", "-h", "--version", "-V"];

/// Repository cache verifier: checks `.sha1` sidecars and archive integrity.
#[derive(Debug, Parser)]
#[command(
    name = "rcv",
    version,
    about = "Verify SHA-1 checksums and archive integrity of a local package cache",
    long_about = None,
    group(ArgGroup::new("mode").required(true).args(["test", "clean"]))
)]
pub struct Cli {
    /// Verify and report only.
    #[arg(long)]
    test: bool,
    /// Verify, then hand failing files to the cleaner (nothing is deleted).
    #[arg(long)]
    clean: bool,
    /// Repository roots (defaults to configured roots, normally ~/.m2/repository).
    #[arg(value_name = "DIRECTORY")]
    directories: Vec<PathBuf>,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Print the summary as a JSON object.
    #[arg(long)]
    json: bool,
    /// Suppress the progress stream.
    #[arg(short, long)]
    quiet: bool,
    /// Verifier worker threads.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,
    /// Reject checksum files with text after the 40 hex digits.
    #[arg(long)]
    strict_format: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    const fn mode(&self) -> RunMode {
        if self.clean && !self.test {
            RunMode::Clean
        } else {
            RunMode::Test
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Run completed but found problems.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Json(_) | Self::Io(_) => 2,
            Self::Partial(_) => 4,
        }
    }
}

impl From<RcvError> for CliError {
    fn from(err: RcvError) -> Self {
        match err {
            RcvError::InvalidConfig { .. }
            | RcvError::MissingConfig { .. }
            | RcvError::ConfigParse { .. } => Self::User(err.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Parse `args` (program name first), run, and return the process exit code.
pub fn main_with_args(args: Vec<OsString>) -> i32 {
    let Some(first) = args.get(1) else {
        println!("{USAGE}");
        return 1;
    };
    if !LEADING_ARGS.iter().any(|flag| first.as_os_str() == *flag) {
        return reject_arguments(&args[1..]);
    }

    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return 0;
        }
        Err(_) => return reject_arguments(&args[1..]),
    };

    match run(&cli) {
        Ok(()) => 0,
        Err(CliError::Partial(_)) => 4,
        Err(err) => {
            eprintln!("rcv: {err}");
            err.exit_code()
        }
    }
}

fn reject_arguments(args: &[OsString]) -> i32 {
    println!("{}", illegal_arguments(args));
    println!("{USAGE}");
    1
}

fn illegal_arguments(args: &[OsString]) -> String {
    let joined: Vec<String> = args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    format!("[ERROR] Illegal arguments: {}", joined.join(" "))
}

/// Load config, apply flag overrides, verify, and print the summary.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color || !io::stdout().is_terminal() {
        control::set_override(false);
    }

    let config = effective_config(cli)?;
    let options = VerifierOptions::from_config(&config.verify).with_roots(cli.directories.clone());

    let progress = if config.report.progress {
        Progress::stderr(config.report.progress_width)
    } else {
        Progress::disabled()
    };
    let log = if config.logging.jsonl_enabled {
        JsonlWriter::open(JsonlConfig::from_config(&config))
    } else {
        JsonlWriter::discard()
    };

    // JSON mode keeps stdout a single object; traversal errors are in its payload.
    let output = output_mode(cli);
    let console: Box<dyn Write + Send> = match output {
        OutputMode::Human => Box::new(io::stdout()),
        OutputMode::Json => Box::new(io::stderr()),
    };

    let summary = Verifier::new(options)
        .with_progress(progress)
        .with_console(console)
        .with_activity_log(log)
        .run(cli.mode(), &ReportOnlyCleaner)?;

    match output {
        OutputMode::Human => write_human(&summary)?,
        OutputMode::Json => write_json_line(&summary.to_json())?,
    }

    if summary.has_problems() {
        return Err(CliError::Partial(format!(
            "{} failure(s), {} traversal error(s)",
            summary.failure_count(),
            summary.traversal_errors().len()
        )));
    }
    Ok(())
}

fn effective_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(jobs) = cli.jobs {
        config.verify.parallelism = usize::from(jobs);
    }
    if cli.strict_format {
        config.verify.strict_checksum_format = true;
    }
    if cli.quiet {
        config.report.progress = false;
    }
    Ok(config)
}

fn write_human(summary: &RunSummary) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    let header = format!("Errors: {}", summary.failure_count());
    if summary.failure_count() == 0 {
        writeln!(stdout, "{}", header.green())?;
    } else {
        writeln!(stdout, "{}", header.red().bold())?;
    }
    for (path, reason) in summary.failures() {
        writeln!(stdout, "{}: {reason}", path.display())?;
    }
    stdout.flush()?;
    Ok(())
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("RCV_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("rcv").chain(args.iter().copied()))
    }

    #[test]
    fn parses_mode_and_directories() {
        let cli = parse(&["--test", "/a", "/b"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Test);
        assert_eq!(
            cli.directories,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );

        let cli = parse(&["--clean"]).unwrap();
        assert_eq!(cli.mode(), RunMode::Clean);
        assert!(cli.directories.is_empty());
    }

    #[test]
    fn parses_options_in_any_position() {
        let cli = parse(&[
            "--test",
            "/repo",
            "--json",
            "--jobs",
            "3",
            "-q",
            "--strict-format",
            "--no-color",
            "--config",
            "/tmp/rcv.toml",
        ])
        .unwrap();
        assert!(cli.json && cli.quiet && cli.strict_format && cli.no_color);
        assert_eq!(cli.jobs, Some(3));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rcv.toml")));
    }

    #[test]
    fn mode_is_required() {
        let err = parse(&["/repo"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn modes_are_mutually_exclusive() {
        let err = parse(&["--test", "--clean"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(parse(&["--verify"]).is_err());
        assert!(parse(&["--test", "--bogus"]).is_err());
    }

    #[test]
    fn zero_jobs_rejected() {
        assert!(parse(&["--test", "--jobs", "0"]).is_err());
    }

    #[test]
    fn no_arguments_exit_with_usage_code() {
        assert_eq!(main_with_args(vec![OsString::from("rcv")]), 1);
    }

    #[test]
    fn illegal_arguments_exit_code_is_one() {
        let args = vec![OsString::from("rcv"), OsString::from("--verify")];
        assert_eq!(main_with_args(args), 1);
    }

    #[test]
    fn mode_must_be_first_argument() {
        let args = vec![
            OsString::from("rcv"),
            OsString::from("/repo"),
            OsString::from("--test"),
        ];
        assert_eq!(main_with_args(args), 1);

        let args = vec![
            OsString::from("rcv"),
            OsString::from("--json"),
            OsString::from("--clean"),
        ];
        assert_eq!(main_with_args(args), 1);
    }

    #[test]
    fn illegal_arguments_message_echoes_args() {
        let args = [OsString::from("--foo"), OsString::from("/repo")];
        assert_eq!(
            illegal_arguments(&args),
            "[ERROR] Illegal arguments: --foo /repo"
        );
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(resolve_output_mode(true, Some("human")), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some(" JSON ")), OutputMode::Json);
        assert_eq!(resolve_output_mode(false, Some("human")), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None), OutputMode::Human);
    }

    #[test]
    fn exit_codes_follow_contract() {
        assert_eq!(CliError::User(String::new()).exit_code(), 1);
        assert_eq!(CliError::Runtime(String::new()).exit_code(), 2);
        assert_eq!(CliError::Partial(String::new()).exit_code(), 4);

        let json_err = serde_json::from_str::<Value>("{").unwrap_err();
        assert_eq!(CliError::from(json_err).exit_code(), 2);
    }

    #[test]
    fn config_errors_map_to_user_errors() {
        let err: CliError = RcvError::InvalidConfig {
            details: "x".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 1);

        let err: CliError = RcvError::Runtime {
            details: "x".into(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn flags_override_loaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rcv.toml");
        std::fs::write(&path, "[verify]\nparallelism = 2\n").unwrap();
        let path_arg = path.to_string_lossy().into_owned();

        let cli = parse(&[
            "--test",
            "--config",
            &path_arg,
            "--jobs",
            "5",
            "--strict-format",
            "--quiet",
        ])
        .unwrap();
        let config = effective_config(&cli).unwrap();
        assert_eq!(config.verify.parallelism, 5);
        assert!(config.verify.strict_checksum_format);
        assert!(!config.report.progress);
    }
}
