//! Headless commands
//!
//! Usage:
//!   mapsnipe preview --lat <lat> --lon <lon>     Poll the feed once and list targets
//!   mapsnipe simulate --lat <lat> --lon <lon>    Run the worker against a simulated host
//!   mapsnipe ledger show|clear                   Inspect or reset the dedup ledger
//!
//! Options:
//!   --config <path>    Config file (default: platform config dir)
//!   --json             Output in JSON format

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use mapsnipe_core::feed::SocialSighting;
use mapsnipe_core::sim::SimulatedHost;
use mapsnipe_core::{
    format_dist, format_time, source_from_config, Candidate, DedupLedger, DistanceUnit,
    FilterReport, PushFeed, RecordingEventSink, Services, SightingSource, SnipeConfig,
    SnipeTimings, SnipeWorker, SpeciesTable, WorkerResult,
};

/// Ticks run by `simulate` unless `--ticks` is given
const DEFAULT_TICKS: u32 = 10;

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Preview {
        latitude: f64,
        longitude: f64,
    },
    Simulate {
        latitude: f64,
        longitude: f64,
        ticks: u32,
        balls: Option<u32>,
    },
    LedgerShow,
    LedgerClear,
}

/// CLI options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub json: bool,
    /// Skip every configured pause
    pub fast: bool,
    pub config: Option<PathBuf>,
    pub species: Option<PathBuf>,
    /// Push-format sightings queued instead of reading the configured feed
    pub sightings: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
}

fn value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", flag))
}

fn parse_number<T: std::str::FromStr>(s: &str, flag: &str) -> Result<T, String> {
    s.trim()
        .parse::<T>()
        .map_err(|_| format!("Invalid value for {}: {}", flag, s))
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<&str> = None;
    let mut ledger_action: Option<&str> = None;
    let mut latitude: Option<f64> = None;
    let mut longitude: Option<f64> = None;
    let mut ticks = DEFAULT_TICKS;
    let mut balls: Option<u32> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--json" => options.json = true,
            "--fast" => options.fast = true,
            "--config" => {
                i += 1;
                options.config = Some(PathBuf::from(value(args, i, arg)?));
            }
            "--species" => {
                i += 1;
                options.species = Some(PathBuf::from(value(args, i, arg)?));
            }
            "--sightings" => {
                i += 1;
                options.sightings = Some(PathBuf::from(value(args, i, arg)?));
            }
            "--log-file" => {
                i += 1;
                options.log_file = Some(PathBuf::from(value(args, i, arg)?));
            }
            "--lat" => {
                i += 1;
                latitude = Some(parse_number(value(args, i, arg)?, arg)?);
            }
            "--lon" => {
                i += 1;
                longitude = Some(parse_number(value(args, i, arg)?, arg)?);
            }
            "--ticks" => {
                i += 1;
                ticks = parse_number(value(args, i, arg)?, arg)?;
            }
            "--balls" => {
                i += 1;
                balls = Some(parse_number(value(args, i, arg)?, arg)?);
            }
            "preview" | "simulate" | "ledger" if command.is_none() => command = Some(arg),
            "show" | "clear" if command == Some("ledger") && ledger_action.is_none() => {
                ledger_action = Some(arg)
            }
            _ => {
                if arg.starts_with('-') {
                    return Err(format!("Unknown option: {}", arg));
                }
                return Err(format!("Unknown command: {}", arg));
            }
        }
        i += 1;
    }

    let position = || -> Result<(f64, f64), String> {
        let latitude = latitude.ok_or("--lat is required")?;
        let longitude = longitude.ok_or("--lon is required")?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("Position out of range: {}, {}", latitude, longitude));
        }
        Ok((latitude, longitude))
    };

    let command = match command {
        Some("preview") => {
            let (latitude, longitude) = position()?;
            CliCommand::Preview {
                latitude,
                longitude,
            }
        }
        Some("simulate") => {
            let (latitude, longitude) = position()?;
            CliCommand::Simulate {
                latitude,
                longitude,
                ticks,
                balls,
            }
        }
        Some("ledger") => match ledger_action {
            Some("clear") => CliCommand::LedgerClear,
            Some(_) | None => CliCommand::LedgerShow,
        },
        _ => {
            return Err(
                "No command specified. Use: preview, simulate, or ledger show|clear".to_string(),
            )
        }
    };

    Ok((command, options))
}

/// Run CLI command
pub fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    let config = load_config(&options)?;
    match command {
        CliCommand::Preview {
            latitude,
            longitude,
        } => run_preview(config, latitude, longitude, &options),
        CliCommand::Simulate {
            latitude,
            longitude,
            ticks,
            balls,
        } => run_simulate(config, latitude, longitude, ticks, balls, &options),
        CliCommand::LedgerShow => run_ledger_show(&config, &options),
        CliCommand::LedgerClear => run_ledger_clear(&config),
    }
}

fn load_config(options: &CliOptions) -> anyhow::Result<SnipeConfig> {
    match &options.config {
        Some(path) => SnipeConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(SnipeConfig::load()),
    }
}

fn load_species(options: &CliOptions) -> anyhow::Result<SpeciesTable> {
    match &options.species {
        Some(path) => Ok(SpeciesTable::from_json_file(path)?),
        None => Ok(SpeciesTable::builtin()),
    }
}

fn read_sightings(path: &Path) -> anyhow::Result<Vec<SocialSighting>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read sightings from {}", path.display()))?;
    let sightings = serde_json::from_str(&content)
        .with_context(|| format!("Invalid sightings file {}", path.display()))?;
    Ok(sightings)
}

/// The configured feed, or a push queue preloaded from `--sightings`
fn build_source(
    config: &SnipeConfig,
    options: &CliOptions,
) -> anyhow::Result<Box<dyn SightingSource>> {
    let Some(path) = &options.sightings else {
        let (source, _sender) = source_from_config(config)?;
        return Ok(source);
    };

    let sightings = read_sightings(path)?;
    let (sender, feed) = PushFeed::bounded(sightings.len().max(1));
    let queued = sightings
        .into_iter()
        .map(|sighting| sender.send(sighting))
        .filter(|sent| *sent)
        .count();
    tracing::info!("Queued {} sightings from {}", queued, path.display());
    Ok(Box::new(feed))
}

/// The user's ledger loaded for lookups only. Dry runs never write it back.
fn read_only_ledger(config: &SnipeConfig) -> anyhow::Result<DedupLedger> {
    match config.ledger_path() {
        Some(path) => Ok(DedupLedger::open(path)?.detached()),
        None => Ok(DedupLedger::new()),
    }
}

fn build_worker(
    config: SnipeConfig,
    host: Arc<SimulatedHost>,
    events: Arc<RecordingEventSink>,
    options: &CliOptions,
) -> anyhow::Result<SnipeWorker> {
    let mut builder = SnipeWorker::builder(config.clone())
        .source(build_source(&config, options)?)
        .species(load_species(options)?)
        .services(Services::from_host(host, events))
        .ledger(read_only_ledger(&config)?);
    if options.fast {
        builder = builder.timings(SnipeTimings::immediate());
    }
    Ok(builder.build()?)
}

#[derive(Serialize)]
struct CandidateRow {
    name: String,
    species_id: u32,
    latitude: f64,
    longitude: f64,
    distance_m: f64,
    priority: i32,
    vip: bool,
    disappears_in_s: i64,
}

impl CandidateRow {
    fn new(candidate: &Candidate, now: i64) -> Self {
        Self {
            name: candidate.name.clone(),
            species_id: candidate.species_id,
            latitude: candidate.latitude,
            longitude: candidate.longitude,
            distance_m: candidate.distance,
            priority: candidate.priority,
            vip: candidate.is_vip,
            disappears_in_s: candidate.seconds_left(now),
        }
    }
}

fn run_preview(
    config: SnipeConfig,
    latitude: f64,
    longitude: f64,
    options: &CliOptions,
) -> anyhow::Result<()> {
    let unit = config.distance_unit;
    let host = Arc::new(SimulatedHost::new(latitude, longitude));
    let events = Arc::new(RecordingEventSink::new());

    let mut worker = SnipeWorker::builder(config.clone())
        .source(build_source(&config, options)?)
        .species(load_species(options)?)
        .services(Services::from_host(host, events.clone()))
        .ledger(read_only_ledger(&config)?)
        .build()?;

    let report = worker.scan();
    let now = chrono::Utc::now().timestamp();
    print_preview(&report, &events, unit, now, options);
    Ok(())
}

fn print_preview(
    report: &FilterReport,
    events: &RecordingEventSink,
    unit: DistanceUnit,
    now: i64,
    options: &CliOptions,
) {
    if options.json {
        let candidates: Vec<_> = report
            .candidates
            .iter()
            .map(|c| CandidateRow::new(c, now))
            .collect();
        let rejected: Vec<_> = report.rejected.iter().map(|r| r.to_string()).collect();
        let failures: Vec<_> = events.events().iter().map(|e| e.message()).collect();
        println!(
            "{}",
            serde_json::json!({
                "candidates": candidates,
                "rejected": rejected,
                "messages": failures,
            })
        );
        return;
    }

    for event in events.events() {
        eprintln!("{}", event.message());
    }

    println!("Candidates: {}", report.candidates.len());
    for (idx, candidate) in report.candidates.iter().enumerate() {
        println!(
            "  {:>2}. {:<12} {:>10}  prio {:<4}{} left {}",
            idx + 1,
            candidate.name,
            format_dist(candidate.distance, unit),
            candidate.priority,
            if candidate.is_vip { " VIP" } else { "" },
            format_time(candidate.seconds_left(now))
        );
    }
    if !report.rejected.is_empty() {
        println!();
        println!("Rejected: {}", report.rejected.len());
        for rejected in report.rejected.iter().take(20) {
            println!("  - {}", rejected);
        }
        if report.rejected.len() > 20 {
            println!("  ... and {} more", report.rejected.len() - 20);
        }
    }
}

#[derive(Serialize)]
struct TickRow {
    tick: u32,
    result: String,
    latitude: f64,
    longitude: f64,
    messages: Vec<String>,
}

fn run_simulate(
    config: SnipeConfig,
    latitude: f64,
    longitude: f64,
    ticks: u32,
    balls: Option<u32>,
    options: &CliOptions,
) -> anyhow::Result<()> {
    let mut host = SimulatedHost::new(latitude, longitude);
    if let Some(balls) = balls {
        host = host.with_balls(balls);
    }
    let host = Arc::new(host);
    let events = Arc::new(RecordingEventSink::new());
    let mut worker = build_worker(config, host.clone(), events.clone(), options)?;

    let mut rows = Vec::with_capacity(ticks as usize);
    for tick in 1..=ticks {
        let result = worker.work();
        let position = host.position();
        let row = TickRow {
            tick,
            result: match result {
                WorkerResult::Success => "success".to_string(),
                WorkerResult::Running => "running".to_string(),
            },
            latitude: position.latitude,
            longitude: position.longitude,
            messages: events.events().iter().map(|e| e.message()).collect(),
        };
        events.clear();

        if !options.json {
            println!(
                "tick {:>3}: {:<8} at ({:.6}, {:.6})",
                row.tick, row.result, row.latitude, row.longitude
            );
            for message in &row.messages {
                println!("           {}", message);
            }
        }
        rows.push(row);
    }

    if options.json {
        println!(
            "{}",
            serde_json::json!({
                "ticks": rows,
                "captures": host.captures(),
                "ledger_entries": worker.ledger().len(),
            })
        );
    } else {
        println!();
        println!("Captures: {:?}", host.captures());
        println!("Ledger entries: {}", worker.ledger().len());
    }
    Ok(())
}

fn open_ledger(config: &SnipeConfig) -> anyhow::Result<DedupLedger> {
    let path = config
        .ledger_path()
        .ok_or_else(|| anyhow::anyhow!("No data directory available for the ledger"))?;
    Ok(DedupLedger::open(path)?)
}

fn run_ledger_show(config: &SnipeConfig, options: &CliOptions) -> anyhow::Result<()> {
    let ledger = open_ledger(config)?;

    if options.json {
        let entries: Vec<_> = ledger.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if let Some(path) = ledger.path() {
        println!("Ledger: {}", path.display());
    }
    println!("Entries: {}", ledger.len());
    for entry in ledger.entries() {
        let name = if entry.name.is_empty() {
            format!("#{}", entry.pokemon_id)
        } else {
            entry.name.clone()
        };
        println!("  {:<12} ({:.4}, {:.4})", name, entry.latitude, entry.longitude);
    }
    Ok(())
}

fn run_ledger_clear(config: &SnipeConfig) -> anyhow::Result<()> {
    let mut ledger = open_ledger(config)?;
    let removed = ledger.len();
    ledger.clear();
    ledger.save()?;
    println!("Removed {} ledger entries", removed);
    Ok(())
}

/// Print CLI help
pub fn print_help() {
    println!("mapsnipe v{}", env!("CARGO_PKG_VERSION"));
    println!("Pick targets from a live map feed and snipe or walk to them");
    println!();
    println!("USAGE:");
    println!("    mapsnipe <command> [options]");
    println!();
    println!("COMMANDS:");
    println!("    preview                     Poll the feed once and list eligible targets");
    println!("    simulate                    Run the worker against a simulated host");
    println!("    ledger show                 List remembered target locations");
    println!("    ledger clear                Forget every remembered location");
    println!();
    println!("OPTIONS:");
    println!("    --lat <lat> --lon <lon>     Trainer position (preview, simulate)");
    println!("    --ticks <n>                 Ticks to simulate (default {})", DEFAULT_TICKS);
    println!("    --balls <n>                 Poke balls in the simulated inventory");
    println!("    --sightings <file>          Queue push-format sightings from a JSON file");
    println!("    --species <file>            Species table JSON instead of the built-in one");
    println!("    --config <file>             Config file");
    println!("    --fast                      Skip every configured pause");
    println!("    --log-file <file>           Write logs to a file instead of stderr");
    println!("    --json                      Output in JSON format");
    println!("    --help                      Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    mapsnipe preview --lat 40.7580 --lon -73.9855");
    println!("    mapsnipe simulate --lat 40.7580 --lon -73.9855 --sightings feed.json --fast");
    println!("    mapsnipe ledger show --json");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_preview() {
        let (cmd, options) =
            parse_args(&args(&["preview", "--lat", "40.5", "--lon", "-73.25", "--json"])).unwrap();
        assert_eq!(
            cmd,
            CliCommand::Preview {
                latitude: 40.5,
                longitude: -73.25
            }
        );
        assert!(options.json);
    }

    #[test]
    fn test_parse_simulate() {
        let (cmd, options) = parse_args(&args(&[
            "simulate",
            "--lat",
            "1",
            "--lon",
            "2",
            "--ticks",
            "5",
            "--balls",
            "0",
            "--sightings",
            "feed.json",
            "--fast",
        ]))
        .unwrap();
        assert_eq!(
            cmd,
            CliCommand::Simulate {
                latitude: 1.0,
                longitude: 2.0,
                ticks: 5,
                balls: Some(0),
            }
        );
        assert_eq!(options.sightings, Some(PathBuf::from("feed.json")));
        assert!(options.fast);
    }

    #[test]
    fn test_parse_ledger() {
        let (cmd, _) = parse_args(&args(&["ledger"])).unwrap();
        assert_eq!(cmd, CliCommand::LedgerShow);
        let (cmd, _) = parse_args(&args(&["ledger", "clear"])).unwrap();
        assert_eq!(cmd, CliCommand::LedgerClear);
        let (_, options) =
            parse_args(&args(&["ledger", "show", "--config", "c.json", "--log-file", "x.log"]))
                .unwrap();
        assert_eq!(options.config, Some(PathBuf::from("c.json")));
        assert_eq!(options.log_file, Some(PathBuf::from("x.log")));
    }

    #[test]
    fn test_simulate_leaves_ledger_file_untouched() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let mut config = SnipeConfig {
            username: "brock".to_string(),
            data_dir: Some(temp_dir.path().to_path_buf()),
            snipe: true,
            skip_rounds: 1,
            ..SnipeConfig::default()
        };
        config.catch.insert("Snorlax".to_string(), 500);
        let ledger_path = config.ledger_path().unwrap();

        let mut seeded = DedupLedger::new();
        seeded.inspect(mapsnipe_core::LedgerEntry {
            latitude: 5.0,
            longitude: 5.0,
            pokemon_id: 16,
            name: "Pidgey".to_string(),
            encounter_id: None,
            spawn_point_id: None,
            expires_at: 0,
        });
        seeded.save_to(&ledger_path).unwrap();
        let before = std::fs::read_to_string(&ledger_path).unwrap();

        let sightings_path = temp_dir.path().join("sightings.json");
        let expires = (chrono::Utc::now().timestamp() + 600) * 1000;
        std::fs::write(
            &sightings_path,
            serde_json::json!([{
                "pokemon_id": 143,
                "latitude": 0.01,
                "longitude": 0.0,
                "expiration_timestamp_ms": expires,
            }])
            .to_string(),
        )
        .unwrap();
        let options = CliOptions {
            json: true,
            fast: true,
            sightings: Some(sightings_path),
            ..CliOptions::default()
        };

        let host = Arc::new(SimulatedHost::new(0.0, 0.0));
        let events = Arc::new(RecordingEventSink::new());
        let mut worker = build_worker(config.clone(), host.clone(), events, &options).unwrap();
        assert!(worker.ledger().path().is_none());
        worker.work();
        worker.work();
        assert_eq!(host.captures(), vec![143]);
        assert_eq!(worker.ledger().len(), 2);

        run_simulate(config, 0.0, 0.0, 3, None, &options).unwrap();
        assert_eq!(std::fs::read_to_string(&ledger_path).unwrap(), before);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["preview", "--lat", "1"])).is_err());
        assert!(parse_args(&args(&["preview", "--lat", "abc", "--lon", "1"])).is_err());
        assert!(parse_args(&args(&["preview", "--lat", "95", "--lon", "1"])).is_err());
        assert!(parse_args(&args(&["preview", "--lat"])).is_err());
        assert!(parse_args(&args(&["launch"])).is_err());
        assert!(parse_args(&args(&["ledger", "--bogus"])).is_err());
    }
}
