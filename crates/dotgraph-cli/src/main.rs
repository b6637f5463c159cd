use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dotgraph::{DotGraph, GraphManifest, ImageRenderer, OutputFormat, RenderConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DOT_BINARY_ENV: &str = "DOTGRAPH_DOT_BINARY";

#[derive(Parser, Debug)]
#[command(name = "dotgraph-cli")]
#[command(about = "Build DOT graphs from manifests and render them with Graphviz")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Print(PrintArgs),
    Deps(QueryArgs),
    Dependents(QueryArgs),
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
struct PrintArgs {
    #[arg(long)]
    manifest: PathBuf,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    #[arg(long)]
    manifest: PathBuf,
    #[arg(long)]
    node: String,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    manifest: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long, value_enum)]
    format: Option<FormatArg>,
    #[arg(long)]
    dot_binary: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Png,
    Svg,
    Pdf,
    Jpg,
    Gif,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Svg => OutputFormat::Svg,
            FormatArg::Pdf => OutputFormat::Pdf,
            FormatArg::Jpg => OutputFormat::Jpg,
            FormatArg::Gif => OutputFormat::Gif,
        }
    }
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Print(args) => print_command(args),
        Commands::Deps(args) => query_command(args, QueryKind::Dependencies),
        Commands::Dependents(args) => query_command(args, QueryKind::Dependents),
        Commands::Render(args) => render_command(args),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_command(args: PrintArgs) -> Result<ExitCode, String> {
    let graph = load_graph(&args.manifest)?;
    println!("{}", graph.render());
    Ok(ExitCode::SUCCESS)
}

#[derive(Clone, Copy, Debug)]
enum QueryKind {
    Dependencies,
    Dependents,
}

fn query_command(args: QueryArgs, kind: QueryKind) -> Result<ExitCode, String> {
    let graph = load_graph(&args.manifest)?;
    let keys = match kind {
        QueryKind::Dependencies => graph.dependencies(&args.node),
        QueryKind::Dependents => graph.dependents(&args.node),
    };

    if args.json {
        let json = serde_json::to_string(&keys).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        for key in keys {
            println!("{key}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn render_command(args: RenderArgs) -> Result<ExitCode, String> {
    let graph = load_graph(&args.manifest)?;
    let env_dot_binary = std::env::var(DOT_BINARY_ENV).ok();
    let config = resolve_render_config(&args, env_dot_binary)?;
    debug!(manifest = %args.manifest.display(), ?config, "resolved render config");

    let output = ImageRenderer::new(config)
        .render_graph(&graph)
        .map_err(|error| error.to_string())?;

    println!("written: {}", output.display());
    Ok(ExitCode::SUCCESS)
}

/// File config first, then flags. The environment only supplies the
/// converter binary when neither the file nor a flag named one.
fn resolve_render_config(
    args: &RenderArgs,
    env_dot_binary: Option<String>,
) -> Result<RenderConfig, String> {
    let mut config = match args.config.as_deref() {
        Some(path) => RenderConfig::load_from_path(path).map_err(|e| e.to_string())?,
        None => RenderConfig::default(),
    };
    let file_names_binary =
        args.config.is_some() && config.dot_binary != RenderConfig::default().dot_binary;

    if let Some(output) = &args.output {
        config.output_file = Some(output.clone());
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.prefix = prefix.clone();
    }
    if let Some(format) = args.format {
        config.format = format.into();
    }

    match (&args.dot_binary, env_dot_binary) {
        (Some(binary), _) => config.dot_binary = binary.clone(),
        (None, Some(binary)) if !file_names_binary => config.dot_binary = binary,
        _ => {}
    }

    Ok(config)
}

fn load_graph(manifest: &Path) -> Result<DotGraph, String> {
    GraphManifest::load_from_path(manifest)
        .and_then(|manifest| manifest.to_graph())
        .map_err(|error| error.to_string())
}
