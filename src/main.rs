//! Purpose: `arbridge` CLI entry point.
//! Role: Binary crate root; parses args, runs the stdio bridge host or a utility command.
//! Invariants: stdout is reserved for channel traffic while serving.
//! Invariants: Non-interactive errors are emitted as JSON on stderr; logs go to stderr too.
//! Invariants: Process exit code is derived from `to_exit_code`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use arbridge::core::error::{Error, ErrorKind, error_code, to_exit_code};
use arbridge::core::vec3::Vec3;

mod stdio;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(clap_error_summary(&err)));
            }
        },
    };

    match cli.command {
        Command::Serve(args) => {
            init_tracing();
            stdio::serve(args.into_config())?;
            Ok(RunOutcome::ok())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "arbridge", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "arbridge",
    version,
    about = "Drive an AR object-placement session over a JSON-lines channel",
    long_about = r#"Runs one AR view bridge on stdin/stdout.

Each stdin line is a call {"id", "method", "arguments"} or a host notice
{"notice": "appPaused" | "appResumed" | "unauthorized"}. Each stdout line is a
response {"id", "result"} / {"id", "error": {"code", "message"}} or an event
{"event", "arguments"}. Closing stdin disposes the view and exits."#,
    after_help = r#"EXAMPLES
  $ arbridge serve --catalog catalog.json
  $ arbridge serve --catalog catalog.json --first-plane 0,-1.2,-0.5 --load-step-ms 40
  $ echo '{"id":1,"method":"init"}' | arbridge serve --catalog catalog.json

LOGGING
  RUST_LOG=arbridge=debug   Log filter (written to stderr; default: info)"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve one AR view over stdin/stdout.
    Serve(ServeArgs),
    /// Generate shell completion scripts.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print version info as JSON.
    Version,
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// JSON array of catalog items.
    #[arg(long, value_hint = ValueHint::FilePath)]
    catalog: PathBuf,
    /// View id; the channel is named `cwflutter_ar_<view-id>`.
    #[arg(long, default_value_t = 0)]
    view_id: i64,
    /// Simulate an engine that still renders measurement overlays.
    #[arg(long)]
    measurement: bool,
    /// Report a tracked plane at X,Y,Z when the session starts.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_vec3)]
    first_plane: Option<Vec3>,
    /// Delay between simulated model loading steps.
    #[arg(long, value_name = "MS", default_value_t = 0)]
    load_step_ms: u64,
}

impl ServeArgs {
    fn into_config(self) -> stdio::ServeConfig {
        stdio::ServeConfig {
            catalog: self.catalog,
            view_id: self.view_id,
            measurement: self.measurement,
            first_plane: self.first_plane,
            load_step: Duration::from_millis(self.load_step_ms),
        }
    }
}

fn parse_vec3(value: &str) -> Result<Vec3, String> {
    Vec3::parse_csv(value).map_err(|err| err.describe())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error: ").to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("arbridge {}", env!("CARGO_PKG_VERSION"));
    } else {
        println!(
            "{}",
            json!({
                "name": "arbridge",
                "version": env!("CARGO_PKG_VERSION"),
            })
        );
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("error: {err}");
        for cause in error_causes(err) {
            eprintln!("  caused by: {cause}");
        }
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("code".to_string(), json!(error_code(err.kind())));
    inner.insert("message".to_string(), json!(err.describe()));
    if let Some(component_id) = err.component_id() {
        inner.insert("componentId".to_string(), json!(component_id));
    }
    if let Some(model_id) = err.model_id() {
        inner.insert("modelId".to_string(), json!(model_id.to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        causes.push(source.to_string());
        current = source.source();
    }
    causes
}
