use alluvia::{RenderContext, RenderError, SaveFormat, SystemViewer};
use alluvia_core::{AlluvialOptions, CsvOptions, FlowTable, OptionOverrides};
use alluvia_render::svg::SvgRenderOptions;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Data(alluvia_core::Error),
    Render(RenderError),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Data(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<alluvia_core::Error> for CliError {
    fn from(value: alluvia_core::Error) -> Self {
        Self::Data(value)
    }
}

impl From<RenderError> for CliError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Layout,
}

#[derive(Debug, Clone, Copy, Default)]
struct RenderFormat(Option<SaveFormat>);

impl RenderFormat {
    fn save_format(self) -> SaveFormat {
        self.0.unwrap_or(SaveFormat::Svg)
    }
}

impl FromStr for RenderFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s.trim().to_ascii_lowercase().as_str() {
            "svg" => SaveFormat::Svg,
            "png" => SaveFormat::Png,
            "jpg" | "jpeg" => SaveFormat::Jpeg,
            "pdf" => SaveFormat::Pdf,
            _ => return Err(()),
        };
        Ok(Self(Some(format)))
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    json: bool,
    no_header: bool,
    weight_column: bool,
    show: bool,
    render_format: RenderFormat,
    config: Option<String>,
    sets: Vec<String>,
    diagram_id: Option<String>,
    out: Option<String>,
}

fn usage() -> &'static str {
    "alluvia-cli\n\
\n\
USAGE:\n\
  alluvia-cli [render] [--format svg|png|jpg|pdf] [--out <path>] [--config <file>] [--set <key=value>]... [--json] [--no-header] [--weight-column] [--id <diagram-id>] [--show] [<path>|-]\n\
  alluvia-cli layout [--pretty] [--config <file>] [--set <key=value>]... [--json] [--no-header] [--weight-column] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin.\n\
  - Input is CSV (one column per stage, first line is a header unless --no-header);\n\
    --json (or a .json input path) reads a JSON array of rows or an object of weighted pairs.\n\
  - --weight-column takes the last CSV column as the row weight.\n\
  - --config reads options from a JSON or YAML (.yaml/.yml) file; --set overrides one option,\n\
    with JSON values (e.g. --set alpha=0.7 --set 'labels=[\"before\",\"after\"]').\n\
  - render prints SVG to stdout by default; use --out to write a file (format from its extension;\n\
    a --format that disagrees with it is a usage error).\n\
  - PNG/JPG/PDF output defaults to writing next to the input file (or ./out.<ext> for stdin).\n\
  - layout prints the computed geometry as JSON.\n\
  - Set RUST_LOG (e.g. RUST_LOG=alluvia=debug) for diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "layout" => args.command = Command::Layout,
            "--pretty" => args.pretty = true,
            "--json" => args.json = true,
            "--no-header" => args.no_header = true,
            "--weight-column" => args.weight_column = true,
            "--show" => args.show = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.render_format = fmt
                    .parse::<RenderFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--set" => {
                let Some(assignment) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                if !assignment.contains('=') {
                    return Err(CliError::Usage(usage()));
                }
                args.sets.push(assignment.clone());
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.diagram_id = Some(id.clone());
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
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
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

fn is_json_path(path: Option<&str>) -> bool {
    path.and_then(|p| Path::new(p).extension())
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

fn read_table(args: &Args) -> Result<FlowTable, CliError> {
    let text = read_input(args.input.as_deref())?;
    if args.json || is_json_path(args.input.as_deref()) {
        let value: serde_json::Value = serde_json::from_str(&text)?;
        return Ok(FlowTable::from_json(&value)?);
    }
    let csv = CsvOptions {
        has_header: !args.no_header,
        weight_column: args.weight_column,
    };
    Ok(FlowTable::from_csv(&text, &csv)?)
}

fn read_options(args: &Args) -> Result<AlluvialOptions, CliError> {
    let mut overrides = OptionOverrides::empty_object();
    if let Some(path) = args.config.as_deref() {
        let text = std::fs::read_to_string(path)?;
        let is_yaml = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let file = if is_yaml {
            OptionOverrides::from_yaml_str(&text)?
        } else {
            OptionOverrides::from_json_str(&text)?
        };
        overrides.deep_merge(file.as_value());
    }
    for assignment in &args.sets {
        overrides.set_assignment(assignment)?;
    }

    let options = if overrides.is_empty() {
        AlluvialOptions::default()
    } else {
        AlluvialOptions::default().with_overrides(&overrides)?
    };
    options.validate()?;
    Ok(options)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn default_raster_out_path(input: Option<&str>, ext: &str) -> PathBuf {
    match input {
        Some(path) if path != "-" => PathBuf::from(path).with_extension(ext),
        _ => PathBuf::from(format!("out.{ext}")),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// `--format` and the `--out` extension must name the same format.
fn check_out_format(args: &Args) -> Result<(), CliError> {
    let (Some(format), Some(out)) = (args.render_format.0, args.out.as_deref()) else {
        return Ok(());
    };
    if out == "-" {
        return Ok(());
    }
    match SaveFormat::from_path(Path::new(out)) {
        Ok(ext) if ext == format => Ok(()),
        _ => Err(CliError::Usage(
            "--format does not match the extension of the --out path",
        )),
    }
}

fn run(args: Args) -> Result<(), CliError> {
    if matches!(args.command, Command::Render) {
        check_out_format(&args)?;
    }
    let table = read_table(&args)?;
    let options = read_options(&args)?;
    tracing::debug!(rows = table.len(), stages = table.stage_count(), "input read");

    let mut ctx = RenderContext::new().with_svg_options(SvgRenderOptions {
        diagram_id: args.diagram_id.clone(),
        ..Default::default()
    });
    if args.show {
        ctx = ctx.with_display(SystemViewer::default());
    }

    match args.command {
        Command::Layout => {
            let layout = ctx.layout(&table, &options)?;
            write_json(&layout, args.pretty)?;
            Ok(())
        }
        Command::Render => {
            let format = args.render_format.save_format();
            let out = match args.out.as_deref() {
                Some("-") => None,
                Some(path) => Some(PathBuf::from(path)),
                None if format == SaveFormat::Svg => None,
                None => Some(default_raster_out_path(
                    args.input.as_deref(),
                    format.extension(),
                )),
            };

            match out {
                Some(path) => {
                    ctx.render_sankey(table, Some(&path), args.show, &options)?;
                }
                None if format == SaveFormat::Svg => {
                    let svg = ctx.render_svg_string(&table, &options)?;
                    print!("{svg}");
                    if args.show {
                        ctx.render_sankey(table, None, true, &options)?;
                    }
                }
                None => return Err(CliError::Usage("raster output cannot be written to stdout")),
            }
            Ok(())
        }
    }
}

fn main() {
    init_tracing();

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

    match run(args) {
        Ok(()) => {}
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
