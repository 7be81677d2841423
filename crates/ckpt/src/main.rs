#![forbid(unsafe_code)]

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use checkpoint_core::group::{index_groups, CheckpointGroup, StatusCache};
use checkpoint_core::policy::{resolve_policy, ReconcilePolicy, WORKSPACE_POLICY_PATH};
use checkpoint_core::report::{parse_reports, parse_timestamp, RawReport};
use checkpoint_core::types::{Direction, Slot};
use checkpoint_engine::ingest::{Coordinates, IncomingMessage, LocationCatalog, MessageParser};
use checkpoint_engine::reconcile::Reconciler;
use checkpoint_engine::render::{
    cards, closest, describe, filter_groups, lookup, nearby, render_table, GroupFilter,
    NearbyCheckpoint,
};
use checkpoint_engine::state::{prune_stale, read_snapshot, SnapshotStore};

#[derive(Parser)]
#[command(
    name = "ckpt",
    version,
    about = "Checkpoint status reconciliation. Reports in, per-direction status out."
)]
struct Cli {
    /// Log debug events to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Reconcile a report batch, optionally against a stored snapshot.
    Reconcile {
        /// Report batch .json (or "-" / omit for stdin).
        #[arg(default_value = "-")]
        file: String,

        /// Snapshot file carrying state between cycles (read, then updated).
        #[arg(long)]
        state: Option<PathBuf>,

        /// Policy file (default: .checkpoint/policy.json, else built-in).
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Output JSON instead of a table.
        #[arg(long)]
        json: bool,

        /// Reference time for pruning and relative labels (RFC 3339).
        #[arg(long)]
        now: Option<String>,
    },

    /// Show a stored snapshot as cards.
    Show {
        state: PathBuf,

        #[arg(long)]
        policy: Option<PathBuf>,

        #[arg(long)]
        json: bool,

        #[arg(long)]
        now: Option<String>,
    },

    /// Find checkpoints in a snapshot by question, field filters or position.
    Lookup(LookupArgs),

    /// Turn collected channel messages into a report batch.
    Parse {
        /// Messages .json array (or "-" / omit for stdin).
        #[arg(default_value = "-")]
        file: String,

        /// Checkpoint → city table (default: built-in).
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Lint a report batch: schema, names, timestamps, directions, statuses.
    Check {
        file: String,

        #[arg(long)]
        policy: Option<PathBuf>,

        /// Output structured JSON report.
        #[arg(long)]
        json: bool,

        /// Fail on warnings (not just errors).
        #[arg(long)]
        strict: bool,
    },

    /// Drop snapshot entries older than the given age.
    Prune {
        state: PathBuf,

        #[arg(long)]
        max_age_hours: u64,

        #[arg(long)]
        json: bool,

        #[arg(long)]
        now: Option<String>,
    },

    /// Print the effective policy.
    Policy {
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Write the default policy to .checkpoint/policy.json.
    Init {
        /// Overwrite an existing policy file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct LookupArgs {
    state: PathBuf,

    /// Question or partial checkpoint name.
    query: Option<String>,

    /// Checkpoint name contains this text.
    #[arg(long)]
    checkpoint: Option<String>,

    /// City name contains this text.
    #[arg(long)]
    city: Option<String>,

    /// Status contains this text.
    #[arg(long)]
    status: Option<String>,

    /// Only this direction (any alias from the policy table).
    #[arg(long)]
    direction: Option<String>,

    /// Only statuses reported within this many minutes.
    #[arg(long)]
    ago: Option<u64>,

    /// Keep at most this many checkpoints.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    top: Option<u64>,

    /// LAT,LNG: list positioned catalog checkpoints around this point instead.
    #[arg(long)]
    near: Option<Coordinates>,

    /// Search radius for --near (default 10).
    #[arg(long)]
    radius_km: Option<f64>,

    /// With --near: only the nearest checkpoint, at any distance.
    #[arg(long)]
    closest: bool,

    /// Checkpoint table with coordinates (default: built-in).
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[arg(long)]
    policy: Option<PathBuf>,

    #[arg(long)]
    json: bool,

    #[arg(long)]
    now: Option<String>,
}

const DEFAULT_RADIUS_KM: f64 = 10.0;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.cmd {
        Cmd::Reconcile {
            file,
            state,
            policy,
            json,
            now,
        } => cmd_reconcile(&file, state.as_deref(), policy.as_deref(), json, now.as_deref()),

        Cmd::Show {
            state,
            policy,
            json,
            now,
        } => cmd_show(&state, policy.as_deref(), json, now.as_deref()),

        Cmd::Lookup(args) => cmd_lookup(&args),

        Cmd::Parse { file, catalog } => cmd_parse(&file, catalog.as_deref()),

        Cmd::Check {
            file,
            policy,
            json,
            strict,
        } => cmd_check(&file, policy.as_deref(), json, strict),

        Cmd::Prune {
            state,
            max_age_hours,
            json,
            now,
        } => cmd_prune(&state, max_age_hours, json, now.as_deref()),

        Cmd::Policy { policy } => cmd_policy(policy.as_deref()),

        Cmd::Init { force } => cmd_init(force),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_input(file: &str) -> Result<String> {
    if file == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("cannot read {file}"))
    }
}

fn read_reports(file: &str) -> Result<Vec<RawReport>> {
    parse_reports(&read_input(file)?).with_context(|| format!("{file}: invalid report batch"))
}

fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    match now {
        Some(text) => parse_timestamp(text).with_context(|| format!("invalid --now value '{text}'")),
        None => Ok(Utc::now()),
    }
}

fn hours(n: u64) -> Result<Duration> {
    i64::try_from(n)
        .ok()
        .and_then(Duration::try_hours)
        .with_context(|| format!("age of {n} hours is out of range"))
}

fn cmd_reconcile(
    file: &str,
    state: Option<&Path>,
    policy: Option<&Path>,
    json_out: bool,
    now: Option<&str>,
) -> Result<()> {
    let reports = read_reports(file)?;
    let policy = resolve_policy(policy)?;
    let now = resolve_now(now)?;

    let store = state.map(SnapshotStore::open).transpose()?;
    let previous: StatusCache = match &store {
        Some(store) => store.load()?.cache(),
        None => StatusCache::new(),
    };

    let outcome = Reconciler::new(&policy).run(&reports, &previous);
    let mut groups = outcome.groups;

    let mut pruned = 0;
    if let Some(max_age) = policy.stale_after_hours {
        let mut cache = index_groups(groups);
        pruned = prune_stale(&mut cache, now, hours(max_age)?).len();
        groups = cache.into_values().collect();
    }

    let commit = match &store {
        Some(store) => Some(store.commit(&groups, now)?),
        None => None,
    };

    let stats = &outcome.stats;
    eprintln!(
        "  {} received, {} accepted, {} dropped ({} unnamed, {} no status, {} unroutable), {} untimed",
        stats.received,
        stats.accepted,
        stats.dropped(),
        stats.dropped_unnamed,
        stats.dropped_no_status,
        stats.dropped_unroutable,
        stats.untimed
    );
    if pruned > 0 {
        eprintln!("  pruned {pruned} stale slot(s)");
    }
    if let Some(commit) = &commit {
        if commit.written {
            eprintln!("  snapshot cycle {} written", commit.cycle);
        } else {
            eprintln!("  snapshot unchanged (cycle {})", commit.cycle);
        }
    }

    if json_out {
        let out = serde_json::json!({
            "groups": groups,
            "stats": stats,
            "pruned": pruned,
            "commit": commit,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!(
            "{}",
            render_table(&cards(&groups, now, policy.display_offset_minutes))
        );
    }
    Ok(())
}

fn load_groups(state: &Path) -> Result<Vec<CheckpointGroup>> {
    if !state.exists() {
        bail!("no snapshot at {}", state.display());
    }
    Ok(read_snapshot(state)?.groups)
}

fn cmd_show(state: &Path, policy: Option<&Path>, json_out: bool, now: Option<&str>) -> Result<()> {
    let policy = resolve_policy(policy)?;
    let now = resolve_now(now)?;
    let groups = load_groups(state)?;
    let cards = cards(&groups, now, policy.display_offset_minutes);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&cards)?);
    } else {
        print!("{}", render_table(&cards));
    }
    Ok(())
}

fn cmd_lookup(args: &LookupArgs) -> Result<()> {
    let groups = load_groups(&args.state)?;
    let top = args.top.map(|n| usize::try_from(n).unwrap_or(usize::MAX));

    if let Some(origin) = args.near {
        return cmd_nearby(args, &groups, origin, top);
    }
    if args.closest || args.radius_km.is_some() {
        bail!("--closest and --radius-km need --near");
    }

    let policy = resolve_policy(args.policy.as_deref())?;
    let now = resolve_now(args.now.as_deref())?;
    let slot = match args.direction.as_deref() {
        None => None,
        Some(text) => match policy.direction_of(text) {
            Direction::Entry => Some(Slot::Entry),
            Direction::Exit => Some(Slot::Exit),
            Direction::Both => None,
            Direction::Unknown => bail!("unrecognized direction '{text}'"),
        },
    };
    let mut filter = GroupFilter {
        checkpoint: args.checkpoint.clone(),
        city: args.city.clone(),
        status: args.status.clone(),
        slot,
        since: None,
        top,
    };
    if let Some(minutes) = args.ago {
        filter = filter.within_minutes(now, minutes);
    }

    let hits = match args.query.as_deref() {
        Some(query) => filter_groups(lookup(&groups, query), &filter),
        None => filter_groups(&groups, &filter),
    };
    if hits.is_empty() {
        match args.query.as_deref() {
            Some(query) => bail!("no checkpoint matches '{query}'"),
            None => bail!("no checkpoint matches the given filters"),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    for group in hits {
        for line in describe(group, now) {
            println!("{line}");
        }
    }
    Ok(())
}

fn cmd_nearby(
    args: &LookupArgs,
    groups: &[CheckpointGroup],
    origin: Coordinates,
    top: Option<usize>,
) -> Result<()> {
    if args.query.is_some()
        || args.checkpoint.is_some()
        || args.city.is_some()
        || args.status.is_some()
        || args.direction.is_some()
        || args.ago.is_some()
    {
        bail!("--near cannot be combined with a query or field filters");
    }
    let catalog = match args.catalog.as_deref() {
        Some(path) => LocationCatalog::load(path)?,
        None => LocationCatalog::builtin()?,
    };

    if args.closest {
        if args.radius_km.is_some() {
            bail!("--closest ignores distance; drop --radius-km");
        }
        let hit = closest(&catalog, groups, origin)
            .context("no checkpoint in the catalog has coordinates")?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&hit)?);
        } else {
            print_nearby(&hit);
        }
        return Ok(());
    }

    let radius = args.radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius.is_finite() || radius < 0.0 {
        bail!("--radius-km must be a non-negative number");
    }
    let mut hits = nearby(&catalog, groups, origin, radius);
    if let Some(top) = top {
        hits.truncate(top);
    }
    eprintln!("  {} checkpoint(s) within {radius} km of {origin}", hits.len());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else {
        hits.iter().for_each(print_nearby);
    }
    Ok(())
}

fn print_nearby(hit: &NearbyCheckpoint) {
    println!(
        "{} ({}) {:.2} km",
        hit.checkpoint_name, hit.city_name, hit.distance_km
    );
    for (slot, entry) in [(Slot::Entry, &hit.entry), (Slot::Exit, &hit.exit)] {
        if let Some(entry) = entry {
            println!("  {} {}", entry.status, slot.label_ar());
        }
    }
}

fn cmd_parse(file: &str, catalog: Option<&Path>) -> Result<()> {
    let content = read_input(file)?;
    let messages: Vec<IncomingMessage> =
        serde_json::from_str(&content).with_context(|| format!("{file}: invalid message list"))?;
    let catalog = match catalog {
        Some(path) => LocationCatalog::load(path)?,
        None => LocationCatalog::builtin()?,
    };

    let (reports, stats) = MessageParser::new(catalog).parse_all(&messages);
    eprintln!(
        "  {} messages: {} reports, {} inquiries, {} noise, {} unrecognized",
        stats.messages, stats.reports, stats.inquiries, stats.noise, stats.unrecognized
    );
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn cmd_check(file: &str, policy: Option<&Path>, json_out: bool, strict: bool) -> Result<()> {
    let policy = resolve_policy(policy)?;
    let content = read_input(file)?;
    let data: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("{file}: invalid JSON: {e}"))?;

    let report = checkpoint_core::schema::check(&data, file, strict, &policy);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.pass {
            eprintln!("  ok  {file} ({} reports)", report.reports);
        } else {
            eprintln!("  FAIL {file} ({} reports)", report.reports);
        }
        for e in &report.errors {
            eprintln!(
                "  error {}: {} {}",
                e.code,
                e.message,
                e.path.as_deref().unwrap_or("")
            );
        }
        for w in &report.warnings {
            eprintln!(
                "  warn  {}: {} {}",
                w.code,
                w.message,
                w.path.as_deref().unwrap_or("")
            );
        }
    }

    if !report.pass {
        bail!("check failed for {file}");
    }
    Ok(())
}

fn cmd_prune(state: &Path, max_age_hours: u64, json_out: bool, now: Option<&str>) -> Result<()> {
    let now = resolve_now(now)?;
    if !state.exists() {
        bail!("no snapshot at {}", state.display());
    }
    let store = SnapshotStore::open(state)?;
    let mut cache = store.load()?.cache();
    let pruned = prune_stale(&mut cache, now, hours(max_age_hours)?);
    let groups: Vec<CheckpointGroup> = cache.into_values().collect();
    let commit = store.commit(&groups, now)?;

    eprintln!(
        "  pruned {} slot(s), {} checkpoint(s) remain (cycle {})",
        pruned.len(),
        groups.len(),
        commit.cycle
    );
    if json_out {
        let removed: Vec<_> = pruned
            .iter()
            .map(|(key, slot)| {
                serde_json::json!({
                    "city_name": key.city_name,
                    "checkpoint_name": key.checkpoint_name,
                    "slot": slot,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&removed)?);
    }
    Ok(())
}

fn cmd_policy(policy: Option<&Path>) -> Result<()> {
    let policy = resolve_policy(policy)?;
    println!("{}", serde_json::to_string_pretty(&policy)?);
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new(WORKSPACE_POLICY_PATH);
    if path.exists() && !force {
        bail!("{WORKSPACE_POLICY_PATH} already exists (use --force to overwrite)");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&ReconcilePolicy::default())?;
    std::fs::write(path, json)?;
    eprintln!("created {WORKSPACE_POLICY_PATH}");
    Ok(())
}
