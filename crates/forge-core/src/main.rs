use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use forge_blueprint::{PlacementMode, Rasterization, Rasterizer, StructureBlueprint, Vec3};
use forge_core::{envelope, logging, BatchExecutor, ForgeConfig, SimulatedSink};
use serde_json::Value;
use std::path::{Path, PathBuf};

fn cli() -> Command {
    let file_arg = Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Blueprint JSON, or a raw backend response containing one");
    let anchor_arg = Arg::new("anchor")
        .long("anchor")
        .num_args(3)
        .value_names(["X", "Y", "Z"])
        .allow_negative_numbers(true)
        .default_values(["0", "0", "0"])
        .value_parser(value_parser!(i32))
        .help("World coordinate of the blueprint origin");
    let seed_arg = Arg::new("seed")
        .long("seed")
        .default_value("42")
        .value_parser(value_parser!(u64))
        .help("Random seed for palette choices");

    Command::new("forge")
        .version(forge_core::VERSION)
        .about("Structure Forge: validate, rasterize and dry-run structure blueprints")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .default_value("forge.toml")
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file"),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a blueprint and print a summary")
                .arg(file_arg.clone()),
        )
        .subcommand(
            Command::new("rasterize")
                .about("Print the world commands a blueprint expands to")
                .arg(file_arg.clone())
                .arg(anchor_arg.clone())
                .arg(seed_arg.clone())
                .arg(
                    Arg::new("lenient")
                        .long("lenient")
                        .action(ArgAction::SetTrue)
                        .help("Skip invalid placements instead of rejecting the blueprint"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Execute a blueprint against a simulated world")
                .arg(file_arg)
                .arg(anchor_arg)
                .arg(seed_arg)
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.0")
                        .value_parser(value_parser!(f64))
                        .help("Probability that a simulated command fails"),
                ),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config_path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("forge.toml"));
    let config = ForgeConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Err(e) = logging::init_tracing(&config.logging) {
        eprintln!("tracing disabled: {e}");
    }

    match matches.subcommand() {
        Some(("validate", args)) => run_validate(args),
        Some(("rasterize", args)) => run_rasterize(args, &config),
        Some(("simulate", args)) => run_simulate(args, &config).await,
        _ => bail!("unknown subcommand"),
    }
}

fn run_validate(args: &ArgMatches) -> anyhow::Result<()> {
    let (description, document) = load_document(file(args)?)?;
    let blueprint = forge_blueprint::validate(&document)?;

    if let Some(description) = description {
        println!("Description: {description}");
    }
    println!("Definitions: {}", blueprint.definition_count());
    if let Some(dims) = blueprint.dimensions_hint {
        println!("Dimensions:  {dims}");
    }
    for mode in PlacementMode::ALL {
        let count = blueprint.placements.iter().filter(|p| p.mode() == mode).count();
        if count > 0 {
            println!("  {mode:<10} {count}");
        }
    }
    Ok(())
}

fn run_rasterize(args: &ArgMatches, config: &ForgeConfig) -> anyhow::Result<()> {
    let (_, document) = load_document(file(args)?)?;
    let mut rasterizer = Rasterizer::seeded(seed(args)).with_limits(config.raster_limits());
    let anchor = anchor(args)?;

    let out = if args.get_flag("lenient") {
        let lenient = forge_blueprint::parse_lenient(&document)?;
        rasterizer.rasterize_lenient(&lenient, anchor)
    } else {
        let blueprint = forge_blueprint::validate(&document)?;
        rasterizer.rasterize_blueprint(&blueprint, anchor)
    };

    for cmd in &out.commands {
        println!("{cmd}");
    }
    eprintln!(
        "{} commands, {} definitions skipped, ~{} blocks",
        out.len(),
        out.skipped_definitions,
        out.estimated_blocks
    );
    Ok(())
}

async fn run_simulate(args: &ArgMatches, config: &ForgeConfig) -> anyhow::Result<()> {
    let (description, document) = load_document(file(args)?)?;
    let blueprint: StructureBlueprint = forge_blueprint::validate(&document)?;
    let seed = seed(args);
    let failure_rate = args.get_one::<f64>("failure-rate").copied().unwrap_or(0.0);

    let out: Rasterization = Rasterizer::seeded(seed)
        .with_limits(config.raster_limits())
        .rasterize_blueprint(&blueprint, anchor(args)?);

    let sink = SimulatedSink::new(failure_rate, seed);
    let executor = BatchExecutor::new(config.executor_config());
    let report = executor.execute(&out.commands, &sink, out.skipped_definitions).await;

    println!(
        "{}: {report} ({} commands in {} batches)",
        description.as_deref().unwrap_or("blueprint"),
        out.len(),
        report.batches
    );
    if report.aborted {
        std::process::exit(1);
    }
    Ok(())
}

fn file(args: &ArgMatches) -> anyhow::Result<&Path> {
    args.get_one::<PathBuf>("file")
        .map(PathBuf::as_path)
        .context("missing blueprint file")
}

fn seed(args: &ArgMatches) -> u64 {
    args.get_one::<u64>("seed").copied().unwrap_or(42)
}

fn anchor(args: &ArgMatches) -> anyhow::Result<Vec3> {
    let coords: Vec<i32> = args
        .get_many::<i32>("anchor")
        .map(|values| values.copied().collect())
        .unwrap_or_default();
    match coords.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => bail!("--anchor takes exactly three integers"),
    }
}

/// Plain JSON first, then a raw backend response
fn load_document(path: &Path) -> anyhow::Result<(Option<String>, Value)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if let Ok(document) = serde_json::from_str::<Value>(&text) {
        return Ok((None, document));
    }
    let envelope = envelope::extract(&text)?;
    Ok((Some(envelope.description), envelope.document))
}
