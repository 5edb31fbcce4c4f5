//! `marc-loader` command line driver

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use marc_loader::{
    Cancellation, DecodeErrorPolicy, LoaderConfig, LoaderError, LoaderService, StreamItem,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("marc-loader")
        .version(marc_loader::VERSION)
        .about("Map MARC records to JSON with declarative rules, load static reference data")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand(
            Command::new("map")
                .about("Map a file of MARC records with a rule document")
                .arg(
                    Arg::new("rules")
                        .long("rules")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON rule document"),
                )
                .arg(
                    Arg::new("data")
                        .long("data")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("ISO 2709 record file"),
                )
                .arg(
                    Arg::new("tenant")
                        .long("tenant")
                        .default_value("default")
                        .help("Tenant the rules are loaded for"),
                )
                .arg(
                    Arg::new("skip-malformed")
                        .long("skip-malformed")
                        .action(ArgAction::SetTrue)
                        .help("Skip records that fail to decode instead of aborting"),
                ),
        )
        .subcommand(
            Command::new("static")
                .about("Validate a static reference-data file and assign ids")
                .arg(
                    Arg::new("data")
                        .long("data")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Static definition JSON"),
                )
                .arg(
                    Arg::new("type")
                        .long("type")
                        .help("Record type, when the document does not declare one"),
                ),
        )
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();

    if let Err(err) = run(&matches).await {
        let kind = err
            .downcast_ref::<LoaderError>()
            .map_or("Error", LoaderError::kind);
        eprintln!("error[{kind}]: {err:#}");
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => LoaderConfig::from_path(path).map_err(LoaderError::from)?,
        None => LoaderConfig::default(),
    };
    init_logging(&config);

    match matches.subcommand() {
        Some(("map", args)) => {
            let config = if args.get_flag("skip-malformed") {
                config.with_decode_error_policy(DecodeErrorPolicy::Skip)
            } else {
                config
            };
            map(LoaderService::new(config), args).await
        }
        Some(("static", args)) => load_static(&LoaderService::new(config), args),
        _ => Ok(()),
    }
}

fn init_logging(config: &LoaderConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn map(service: LoaderService, args: &ArgMatches) -> anyhow::Result<()> {
    let tenant = args
        .get_one::<String>("tenant")
        .map_or("default", String::as_str);
    let rules_path = required_path(args, "rules")?;
    let data_path = required_path(args, "data")?;

    let rules = std::fs::read(rules_path)
        .with_context(|| format!("reading rules from {}", rules_path.display()))?;
    service.load_rules(tenant, &rules)?;

    let data = std::fs::File::open(data_path)
        .with_context(|| format!("opening records at {}", data_path.display()))?;
    let stream_id = data_path.display().to_string();
    let mut items = service.load_data_stream(tenant, &stream_id, data, Cancellation::new())?;

    let stdout = std::io::stdout();
    while let Some(item) = items.recv().await {
        match item? {
            StreamItem::Line(line) => writeln!(stdout.lock(), "{line}")?,
            StreamItem::Skipped(failure) => eprintln!(
                "skipped[{}]: record #{} at byte offset {}: {}",
                failure.kind,
                failure.ordinal.map_or_else(|| "?".to_string(), |n| n.to_string()),
                failure.offset,
                failure.message
            ),
        }
    }
    stdout.lock().flush()?;
    Ok(())
}

fn load_static(service: &LoaderService, args: &ArgMatches) -> anyhow::Result<()> {
    let data_path = required_path(args, "data")?;
    let body = std::fs::read(data_path)
        .with_context(|| format!("reading static data from {}", data_path.display()))?;
    let stream_id = data_path.display().to_string();

    let response = match args.get_one::<String>("type") {
        Some(record_type) => service.load_static_as(&stream_id, record_type, &body)?,
        None => service.load_static(&stream_id, &body)?,
    };
    print!("{}", response.body);
    Ok(())
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing --{name}"))
}
