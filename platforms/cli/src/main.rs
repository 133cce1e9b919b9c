use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use machination::render::DEFAULT_CODE_TABLE_PATH;
use machination::{
    flatten_machine, CodeTable, Formal, Human, Machine, MachineLoader, MachineManager, Renderer,
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Flattens a Turing machine description into a transition table.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  machination demos/shift-right.mt
  machination --format code --output rules.h demos/append-first.mt
  cat machine.json | machination --format formal")]
struct Cli {
    /// Path to a description file (.mt or .json). Reads stdin when omitted and piped.
    description: Option<PathBuf>,

    /// Use a bundled example machine instead of a file
    #[clap(short, long, conflicts_with = "description")]
    example: Option<String>,

    /// List the bundled example machines and exit
    #[clap(short, long)]
    list: bool,

    /// Output format
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// File the code table is written to
    #[clap(short, long, default_value = DEFAULT_CODE_TABLE_PATH)]
    output: PathBuf,

    /// State numbered 0 in the code table (defaults to the description's start state)
    #[clap(short, long)]
    start: Option<String>,

    /// Log each flattening step to stderr
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Human,
    Formal,
    Code,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        for index in 0..MachineManager::get_machine_count() {
            let info = MachineManager::get_machine_info(index)?;
            println!(
                "{}: {} (start: {}, {} states, {} templates)",
                info.index, info.name, info.start, info.state_count, info.template_count
            );
        }
        return Ok(());
    }

    let machine = load_machine(&cli)?;
    debug!(name = machine.display_name(), "flattening");

    let table = flatten_machine(&machine)
        .with_context(|| format!("Failed to flatten {}", machine.display_name()))?;
    info!(
        states = table.state_count(),
        rules = table.rule_count(),
        "flattened"
    );

    let start = cli.start.clone().unwrap_or_else(|| machine.start.clone());
    let output = match cli.format {
        OutputFormat::Human => Human.render_all(&table)?,
        OutputFormat::Formal => Formal.render_all(&table)?,
        OutputFormat::Code => CodeTable::new(start, &cli.output)
            .render_all(&table)
            .context("Failed to generate the code table")?,
        OutputFormat::Json => serde_json::to_string_pretty(&table)?,
    };

    println!("{output}");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_machine(cli: &Cli) -> Result<Machine> {
    if let Some(name) = &cli.example {
        return Ok(MachineManager::get_machine_by_name(name)?);
    }

    if let Some(path) = &cli.description {
        return load_file(path);
    }

    if atty::is(atty::Stream::Stdin) {
        bail!("No description given. See --help.");
    }

    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read stdin")?;

    Ok(MachineLoader::load_machine_from_string(&content)?)
}

fn load_file(path: &Path) -> Result<Machine> {
    MachineLoader::load_machine(path).with_context(|| format!("Failed to load {}", path.display()))
}
