use selkie::render::{HeadlessError, HeadlessRenderer};
use selkie::{Config, Diagnostic, ParsedDiagram};
use serde::Serialize;
use serde_json::Value;
use std::io::{IsTerminal, Read};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Selkie(HeadlessError),
    Json(serde_json::Error),
    Config(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Selkie(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Selkie(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Parse,
    Detect,
    Layout,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    with_meta: bool,
    verbose: bool,
    config: Option<String>,
    out: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetaOut<'a> {
    diagram_type: &'a str,
    config: &'a Value,
    effective_config: &'a Value,
    title: Option<&'a str>,
}

#[derive(Serialize)]
struct ParseOut<'a> {
    meta: MetaOut<'a>,
    model: &'a selkie::DiagramModel,
    diagnostics: &'a [Diagnostic],
}

fn usage() -> &'static str {
    "selkie-cli\n\
\n\
USAGE:\n\
  selkie-cli [parse] [--pretty] [--meta] [--config <file.json>] [--out <path>] [--verbose] [<path>|-]\n\
  selkie-cli detect [--config <file.json>] [--verbose] [<path>|-]\n\
  selkie-cli layout [--pretty] [--config <file.json>] [--out <path>] [--verbose] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - parse prints the diagram model as JSON; --meta wraps it with parse metadata and diagnostics.\n\
  - layout prints the positioned diagram as JSON.\n\
  - --config merges a JSON object over the built-in defaults (e.g. {\"flowchart\": {\"rankSpacing\": 80}}).\n\
  - Skipped statements are reported on stderr; --verbose adds debug logging.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "parse" => args.command = Command::Parse,
            "detect" => args.command = Command::Detect,
            "layout" => args.command = Command::Layout,
            "--pretty" => args.pretty = true,
            "--meta" => args.with_meta = true,
            "--verbose" | "-v" => args.verbose = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" if args.input.is_none() => args.input = Some("-".to_string()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

/// `RUST_LOG` wins when set; otherwise warnings only, or debug output with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "warn" })
    });
    let stderr = std::io::stderr();
    let ansi = stderr.is_terminal();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(ansi))
        .with(filter)
        .init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(path: &str) -> Result<Config, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&raw)?;
    if !value.is_object() {
        return Err(CliError::Config(format!("{path} must contain a JSON object")));
    }
    Ok(Config::from_value(value))
}

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    match out {
        None | Some("-") => {
            use std::io::Write;
            std::io::stdout().lock().write_all(text.as_bytes())?;
        }
        Some(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

fn report_diagnostics(parsed: &ParsedDiagram) {
    for d in &parsed.diagnostics {
        tracing::warn!(line = d.line, "skipped statement: {}", d.message);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut renderer = HeadlessRenderer::new();
    if let Some(path) = args.config.as_deref() {
        renderer = renderer.with_site_config(load_config(path)?);
    }

    match args.command {
        Command::Detect => {
            println!("{}", renderer.detect_type(&text)?);
            Ok(())
        }
        Command::Parse => {
            let parsed = renderer.parse_diagram(&text)?;
            report_diagnostics(&parsed);
            if args.with_meta {
                let out = ParseOut {
                    meta: MetaOut {
                        diagram_type: &parsed.meta.diagram_type,
                        config: parsed.meta.config.as_value(),
                        effective_config: parsed.meta.effective_config.as_value(),
                        title: parsed.meta.title.as_deref(),
                    },
                    model: &parsed.model,
                    diagnostics: &parsed.diagnostics,
                };
                write_json(&out, args.pretty, args.out.as_deref())
            } else {
                write_json(&parsed.model, args.pretty, args.out.as_deref())
            }
        }
        Command::Layout => {
            let parsed = renderer.parse_diagram(&text)?;
            report_diagnostics(&parsed);
            let layouted = selkie::render::layout_parsed(&parsed, &renderer.layout)
                .map_err(HeadlessError::from)?;
            write_json(&layouted, args.pretty, args.out.as_deref())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        tracing::debug!(error = ?err, "command failed");
        eprintln!("{err}");
        std::process::exit(1);
    }
}
