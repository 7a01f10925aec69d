//! wormhole CLI tool
//!
//! Command-line interface for inspecting and maintaining wormholes between map files.
//!
//! ## Commands
//!
//! - `same-map <a> <b>`: Whether two location strings name the same map
//! - `relative <target> <base>`: Relative path from one map location to another
//! - `locate <hint> --node <id> --source <map>`: Find the map a stale location refers to
//! - `check <map> [--json]`: Restore every wormhole in a map and report the broken ones
//! - `link <map> --node <id> --target <map>`: Create a wormhole
//! - `move <map> <to>`: Move a map file and resynchronize its wormholes

use clap::{Parser, Subcommand};
use std::{
    path::{PathBuf, MAIN_SEPARATOR_STR},
    sync::mpsc::channel,
};
use wormhole_core::{
    config::{TomlConfigProvider, WormholeConfig, WormholeConfigProvider},
    event::Event,
    host::HeadlessHost,
    map::{MapStore, TomlMapStore},
    paths::{
        locate, points_to_same_map, relative_path_by_string_manipulation, ResolveRequest, SearchLimits,
        StoreProbe,
    },
    properties::NodeId,
    session::MapSession,
    WormholeError,
};

#[derive(Parser)]
#[command(name = "wormhole")]
#[command(author, version, about = "A tool for maintaining links between map files", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether two map locations refer to the same map
    SameMap { a: String, b: String },

    /// Print the path of `target` relative to the map file `base`
    Relative {
        target: String,
        base: String,

        /// Separator to emit (defaults to the platform's)
        #[arg(short, long)]
        separator: Option<String>,
    },

    /// Find the map a possibly stale location refers to
    Locate {
        /// Recorded location of the map
        hint: String,

        /// Id of the node the map must contain
        #[arg(short, long)]
        node: String,

        /// Map file holding the reference
        #[arg(short, long)]
        source: PathBuf,
    },

    /// Open a map, restore its wormholes and report what could not be restored
    Check {
        map: PathBuf,

        /// Do not write any map back to disk
        #[arg(long)]
        dry_run: bool,

        /// Print the per-marker outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a wormhole from a node to a new node in another map
    Link {
        map: PathBuf,

        /// Id of the source node
        #[arg(short, long)]
        node: String,

        /// Existing map to link into
        #[arg(short, long, conflicts_with = "new")]
        target: Option<PathBuf>,

        /// New map to create and link into
        #[arg(long)]
        new: Option<PathBuf>,
    },

    /// Move a map file and resynchronize the wormholes that touch it
    Move { map: PathBuf, to: PathBuf },
}

fn session_for(
    store: TomlMapStore,
    host: HeadlessHost,
    config: WormholeConfig,
) -> (MapSession, std::thread::JoinHandle<()>) {
    let (tx, rx) = channel::<Event>();
    let event_handle = std::thread::spawn(move || {
        for event in rx {
            eprintln!("[Event] {event}");
        }
    });
    let session = MapSession::new(Box::new(store), Box::new(host), config).with_events(tx);
    (session, event_handle)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match cli.config.as_ref() {
        Some(path) => TomlConfigProvider::new(path.clone()).get_config()?,
        None => WormholeConfig::default(),
    };

    match cli.command {
        Commands::SameMap { a, b } => {
            println!("{}", points_to_same_map(&a, &b));
            Ok(())
        }

        Commands::Relative {
            target,
            base,
            separator,
        } => {
            let separator = separator.unwrap_or_else(|| MAIN_SEPARATOR_STR.to_string());
            let relative = relative_path_by_string_manipulation(&target, &base, &separator);
            if relative.is_empty() {
                println!("(no common root)");
            } else {
                println!("{relative}");
            }
            Ok(())
        }

        Commands::Locate { hint, node, source } => {
            let store = TomlMapStore::read_only();
            let node = NodeId::from(node);
            let source = std::path::absolute(&source)?;
            let source = source.to_string_lossy();
            let request = ResolveRequest {
                hint: &hint,
                node: &node,
                source_path: &source,
            };
            let limits = SearchLimits::from(&config);
            match locate(&request, &StoreProbe::new(&store), &limits) {
                Some(found) => {
                    println!("tier {}: {}", found.tier, found.path.display());
                    Ok(())
                }
                None => Err(WormholeError::Unresolvable {
                    spec: hint,
                    component: node.to_string(),
                }
                .into()),
            }
        }

        Commands::Check { map, dry_run, json } => {
            let store = if dry_run {
                TomlMapStore::read_only()
            } else {
                TomlMapStore::new()
            };
            let (mut session, event_handle) = session_for(store, HeadlessHost::new(), config);
            let handle = session.load_map(&map)?;
            let outcomes = session.restore_markers(&handle);
            let broken = outcomes.iter().filter(|o| o.result.is_err()).count();

            if json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
                drop(session);
                event_handle.join().ok();
                return Ok(());
            }

            println!("\n=== Check Results ===");
            for outcome in outcomes.iter() {
                match &outcome.result {
                    Ok(id) => match session.wormhole(id) {
                        Some(w) if w.is_one_sided() => {
                            println!("{}: one-sided, target missing", outcome.marker)
                        }
                        _ => println!("{}: ok", outcome.marker),
                    },
                    Err(e) => println!("{}: {} ({:?})", outcome.marker, e, e.kind()),
                }
            }
            println!("Markers: {}, broken: {}", outcomes.len(), broken);

            drop(session);
            event_handle.join().ok();
            Ok(())
        }

        Commands::Link {
            map,
            node,
            target,
            new,
        } => {
            let store = TomlMapStore::new();
            let host = match (target, new) {
                (Some(target), _) => {
                    let target_map = store.load(&std::path::absolute(&target)?)?;
                    HeadlessHost::new().with_existing_target(target_map.into_handle())
                }
                (None, Some(new)) => {
                    let label = new
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    HeadlessHost::new().with_new_target(label, new)
                }
                (None, None) => {
                    return Err("either --target or --new is required".into());
                }
            };
            let (mut session, event_handle) = session_for(store, host, config);
            let source = session.open_map(&map)?;
            let result = session.create_wormhole(&source, &NodeId::from(node));
            drop(session);
            event_handle.join().ok();
            let id = result?;
            println!("Created wormhole {id}");
            Ok(())
        }

        Commands::Move { map, to } => {
            let (mut session, event_handle) =
                session_for(TomlMapStore::new(), HeadlessHost::new(), config);
            let handle = session.open_map(&map)?;
            let result = session.move_map_file(&handle, &to);
            drop(session);
            event_handle.join().ok();
            println!("Resynchronized {} wormhole(s)", result?);
            Ok(())
        }
    }
}
