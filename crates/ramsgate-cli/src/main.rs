use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use ramsgate_core::protocol::codec::default_table;
use ramsgate_core::protocol::device::Address;
use ramsgate_core::protocol::frame::{Code, Verb, parse_frame};
use ramsgate_core::{CommandEncoder, Message, Report};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("RAMSGATE_BUILD_COMMIT"),
    " ",
    env!("RAMSGATE_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "ramsgate")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Decoder and state tracker for RF home-automation frame traffic.",
    long_about = None,
    after_help = "Examples:\n  ramsgate log analyse session.log -o report.json\n  ramsgate log analyze session.log --stdout --pretty\n  ramsgate frame decode '--- I 01:123456 04:654321 1F09 003 0004B1 02'"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on captured packet logs (offline-first).
    Log {
        #[command(subcommand)]
        command: LogCommands,
    },
    /// Operations on single frames.
    Frame {
        #[command(subcommand)]
        command: FrameCommands,
    },
}

#[derive(Subcommand, Debug)]
enum LogCommands {
    /// Analyse a packet log and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  ramsgate log analyse session.log -o report.json\n  ramsgate log analyze session.log --stdout --pretty"
    )]
    Analyse {
        /// Path to a packet log file
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if any frame was rejected
        #[arg(long)]
        strict: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FrameCommands {
    /// Parse one frame of wire text and print the decoded message as JSON.
    Decode {
        /// Frame text, quoted as a single argument. Leading hyphens are
        /// allowed so the `---` no-sequence marker parses as a value.
        #[arg(allow_hyphen_values = true)]
        text: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Build an outbound frame from a structured JSON value.
    #[command(
        after_help = "Examples:\n  ramsgate frame encode --verb W --dst 01:123456 --code 2309 --value '{\"zone_idx\":\"01\",\"setpoint\":21.5}'"
    )]
    Encode {
        /// Verb token (RQ, I, W or RP)
        #[arg(long)]
        verb: String,

        /// Source address stamped on the frame
        #[arg(long, default_value = "18:000730")]
        src: String,

        /// Destination address
        #[arg(long)]
        dst: String,

        /// Four-hex-digit code
        #[arg(long)]
        code: String,

        /// Payload value as a JSON object
        #[arg(long)]
        value: String,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Log { command } => match command {
            LogCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
            } => cmd_log_analyse(input, report, stdout, pretty, compact, quiet, strict),
        },
        Commands::Frame { command } => match command {
            FrameCommands::Decode { text, pretty } => cmd_frame_decode(&text, pretty),
            FrameCommands::Encode {
                verb,
                src,
                dst,
                code,
                value,
            } => cmd_frame_encode(&verb, &src, &dst, &code, &value),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RAMSGATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

fn cmd_log_analyse(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    if !resolved_input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", resolved_input.display()),
            Some("pass a packet log file".to_string()),
        ));
    }
    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("pass a packet log file".to_string()),
        ));
    }

    let report_path = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    let rep = ramsgate_core::analyze_log_file(&resolved_input).context("log analysis failed")?;
    let json = serialize_report(&rep, pretty, compact)?;

    if stdout {
        print!("{}", json);
        return finish(&rep, strict);
    }

    let report_path = report_path.ok_or_else(|| {
        CliError::new(
            "missing output path",
            Some("use -o/--report or --stdout".to_string()),
        )
    })?;
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(&report_path, json)
        .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    if !quiet {
        eprintln!("OK: report written -> {}", report_path.display());
    }
    finish(&rep, strict)
}

fn finish(rep: &Report, strict: bool) -> Result<(), CliError> {
    let rejected = rep.traffic.malformed_frames
        + rep.traffic.checksum_failures
        + rep.traffic.length_mismatches
        + rep.traffic.unknown_verbs;
    if strict && rejected > 0 {
        return Err(CliError::new(
            format!("{rejected} frame(s) rejected"),
            Some("inspect the traffic section of the report".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn cmd_frame_decode(text: &str, pretty: bool) -> Result<(), CliError> {
    let table = default_table().context("codec table construction failed")?;
    let frame = parse_frame(text)
        .map_err(|err| CliError::new(format!("invalid frame: {err}"), None))?;
    let msg = Message::from_frame(frame, OffsetDateTime::now_utc(), &table)
        .map_err(|err| CliError::new(format!("invalid frame: {err}"), None))?;

    let rendered = serde_json::json!({
        "verb": msg.verb.token(),
        "src": msg.src.to_string(),
        "dst": msg.dst.to_string(),
        "code": msg.code.to_string(),
        "decoded": msg.payload.is_decoded(),
        "value": msg.payload.as_value(),
        "raw": msg.payload.raw_hex(),
    });
    let json = if pretty {
        serde_json::to_string_pretty(&rendered)
    } else {
        serde_json::to_string(&rendered)
    }
    .context("JSON serialization failed")?;
    println!("{}", json);
    Ok(())
}

fn cmd_frame_encode(
    verb: &str,
    src: &str,
    dst: &str,
    code: &str,
    value: &str,
) -> Result<(), CliError> {
    let verb = Verb::from_token(verb)
        .ok_or_else(|| CliError::new(format!("unknown verb '{verb}'"), Some("use RQ, I, W or RP".to_string())))?;
    let src = parse_addr(src)?;
    let dst = parse_addr(dst)?;
    let code = Code::parse(code)
        .ok_or_else(|| CliError::new(format!("invalid code '{code}'"), Some("use four hex digits, e.g. 2309".to_string())))?;
    let value: serde_json::Value = serde_json::from_str(value)
        .map_err(|err| CliError::new(format!("invalid --value JSON: {err}"), None))?;

    let table = Arc::new(default_table().context("codec table construction failed")?);
    let encoder = CommandEncoder::new(table, src);
    let frame = encoder
        .encode(verb, dst, code, &value)
        .map_err(|err| CliError::new(format!("encoding failed: {err}"), None))?;
    println!("{}", frame.canonical());
    Ok(())
}

fn parse_addr(token: &str) -> Result<Address, CliError> {
    Address::parse(token).ok_or_else(|| {
        CliError::new(
            format!("invalid address '{token}'"),
            Some("expected TT:DDDDDD, e.g. 01:123456".to_string()),
        )
    })
}

fn resolve_input_path(input: &PathBuf) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.clone());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let suffix = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                suffix
            ),
            Some("pass a single log file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
