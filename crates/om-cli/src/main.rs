//! # om — command line front end of the ohara console
//!
//! Drives the console stores against a configurator.
//!
//! - `om node list|get|create|update|remove`
//! - `om <service> list|get|create|update|start|stop|remove|add-node|remove-node`
//! - `om pipeline list|get|refresh|remove [--with-services]`
//! - `om inspect <kind>`: setting definitions advertised by the backend.
//!
//! Lists print as tables and objects as JSON on stdout; action titles go
//! to stderr.

mod render;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use om_client::{ClientConfig, ResourceApi};
use om_console::{Console, Notification, Severity, StoreError};
use om_core::validate::{first_error, max_length, required, valid_service_name};
use om_core::{ObjectKey, ResourceKind, DEFAULT_GROUP};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Longest name accepted for a new object.
const MAX_NAME_LENGTH: usize = 20;

/// Command line client of the ohara configurator.
#[derive(Parser)]
#[command(name = "om", version, about, long_about = None)]
struct Cli {
    /// Client configuration file (defaults apply when it is missing).
    #[arg(long, global = true, default_value = "om.toml")]
    config: PathBuf,

    /// Configurator base URL; overrides the configuration file.
    #[arg(long, global = true)]
    configurator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage nodes.
    Node {
        #[command(subcommand)]
        action: NodeCmd,
    },
    /// Manage zookeeper clusters.
    Zookeeper {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage broker clusters.
    Broker {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage worker clusters.
    Worker {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage topics.
    Topic {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage connectors.
    Connector {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage streams.
    Stream {
        #[command(subcommand)]
        action: ServiceCmd,
    },
    /// Manage pipelines.
    Pipeline {
        #[command(subcommand)]
        action: PipelineCmd,
    },
    /// Show the settings a service kind accepts.
    Inspect {
        /// zookeeper, broker, worker, topic, connector or stream.
        kind: String,
    },
}

#[derive(Args)]
struct Settings {
    /// Setting as `key=value`; JSON values are parsed, anything else is a string.
    #[arg(long = "set", value_parser = parse_setting)]
    settings: Vec<(String, Value)>,
}

impl Settings {
    fn into_map(self) -> Map<String, Value> {
        self.settings.into_iter().collect()
    }
}

#[derive(Subcommand)]
enum NodeCmd {
    List,
    Get {
        hostname: String,
    },
    Create {
        hostname: String,
        #[arg(long, default_value_t = 22)]
        port: u16,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Update {
        hostname: String,
        #[command(flatten)]
        settings: Settings,
    },
    Remove {
        hostname: String,
    },
}

#[derive(Subcommand)]
enum ServiceCmd {
    List,
    /// Show one object, addressed as `group/name` or `name`.
    Get {
        key: ObjectKey,
    },
    Create {
        /// Generated from the kind when omitted.
        name: Option<String>,
        #[arg(long, default_value = DEFAULT_GROUP)]
        group: String,
        /// Node to run on; repeat for several.
        #[arg(long = "node")]
        nodes: Vec<String>,
        /// Start the object once it is created.
        #[arg(long)]
        start: bool,
        #[command(flatten)]
        settings: Settings,
    },
    Update {
        key: ObjectKey,
        #[command(flatten)]
        settings: Settings,
    },
    Start {
        key: ObjectKey,
    },
    Stop {
        key: ObjectKey,
    },
    Remove {
        key: ObjectKey,
    },
    AddNode {
        key: ObjectKey,
        hostname: String,
    },
    RemoveNode {
        key: ObjectKey,
        hostname: String,
    },
}

#[derive(Subcommand)]
enum PipelineCmd {
    List,
    Get {
        key: ObjectKey,
    },
    /// Ask the configurator to re-read the state of the pipeline objects.
    Refresh {
        key: ObjectKey,
    },
    Remove {
        key: ObjectKey,
        /// Stop and delete the services the pipeline owns first.
        #[arg(long)]
        with_services: bool,
    },
}

fn parse_setting(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn generated_name(kind: ResourceKind) -> String {
    let id = uuid::Uuid::new_v4().as_simple().to_string();
    format!("{}{}", kind.label(), &id[..8])
}

fn check_name(name: &str) -> Result<(), String> {
    let too_long = max_length(MAX_NAME_LENGTH);
    match first_error(name, &[&required, &valid_service_name, &too_long]) {
        Some(message) => Err(format!("{}: {}", name, message)),
        None => Ok(()),
    }
}

fn service_kind(label: &str) -> Result<ResourceKind, String> {
    ResourceKind::SERVICES
        .into_iter()
        .find(|kind| kind.label() == label)
        .ok_or_else(|| format!("unknown service kind '{}'", label))
}

/// A store answers `None` when it skipped the request.
fn admitted<T>(kind: ResourceKind, answer: Option<T>) -> Result<T, StoreError> {
    answer.ok_or(StoreError::Busy(kind))
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "om=info,om_client=info,om_console=info".into()),
        ))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match ClientConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };
    if let Some(url) = cli.configurator {
        config.configurator = url;
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to build tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if !rt.block_on(async_main(config, cli.command)) {
        std::process::exit(1);
    }
}

/// Runs one command; `false` when it failed.
async fn async_main(config: ClientConfig, cmd: Commands) -> bool {
    let console = match Console::connect(&config) {
        Ok(console) => console,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };
    tracing::debug!(configurator = %config.configurator, "connected");

    let mut events = console.subscribe();
    let result = match cmd {
        Commands::Node { action } => node(&console, action).await,
        Commands::Zookeeper { action } => service(&console, ResourceKind::Zookeeper, action).await,
        Commands::Broker { action } => service(&console, ResourceKind::Broker, action).await,
        Commands::Worker { action } => service(&console, ResourceKind::Worker, action).await,
        Commands::Topic { action } => service(&console, ResourceKind::Topic, action).await,
        Commands::Connector { action } => service(&console, ResourceKind::Connector, action).await,
        Commands::Stream { action } => service(&console, ResourceKind::Stream, action).await,
        Commands::Pipeline { action } => pipeline(&console, action).await,
        Commands::Inspect { kind } => inspect(&console, &kind).await,
    };

    let reported = report(&mut events);
    console.close().await;

    match result {
        Ok(()) => true,
        Err(e) => {
            // Failures of store actions were already printed as notifications.
            if !reported {
                eprintln!("Error: {}", e);
            }
            false
        }
    }
}

/// Prints pending notifications; `true` if one of them was an error.
fn report(events: &mut broadcast::Receiver<Notification>) -> bool {
    let mut failed = false;
    while let Ok(event) = events.try_recv() {
        match event.severity {
            Severity::Success => eprintln!("✓ {}", event.title),
            Severity::Error => {
                failed = true;
                match event.message {
                    Some(message) => eprintln!("✗ {} {}", event.title, message),
                    None => eprintln!("✗ {}", event.title),
                }
            }
        }
    }
    failed
}

// =============================================================================
// Commands
// =============================================================================

async fn node(console: &Console, action: NodeCmd) -> CliResult {
    let store = &console.nodes;
    let kind = ResourceKind::Node;
    match action {
        NodeCmd::List => {
            let nodes = admitted(kind, store.fetch_all().await?)?;
            println!("{}", render::nodes(&nodes));
        }
        NodeCmd::Get { hostname } => {
            let node = store
                .api()
                .get(&hostname)
                .await?
                .into_result()
                .map_err(StoreError::from)?;
            println!("{}", render::json(&node));
        }
        NodeCmd::Create {
            hostname,
            port,
            user,
            password,
        } => {
            let mut params = Map::new();
            params.insert("hostname".into(), Value::String(hostname));
            params.insert("port".into(), Value::from(port));
            if let Some(user) = user {
                params.insert("user".into(), Value::String(user));
            }
            if let Some(password) = password {
                params.insert("password".into(), Value::String(password));
            }
            let node = admitted(kind, store.create(&params).await?)?;
            println!("{}", render::json(&node));
        }
        NodeCmd::Update { hostname, settings } => {
            let node = admitted(kind, store.update(&hostname, &settings.into_map()).await?)?;
            println!("{}", render::json(&node));
        }
        NodeCmd::Remove { hostname } => {
            let remaining = admitted(kind, store.remove(&hostname).await?)?;
            println!("{}", render::nodes(&remaining));
        }
    }
    Ok(())
}

async fn service(console: &Console, kind: ResourceKind, action: ServiceCmd) -> CliResult {
    let store = console
        .services(kind)
        .ok_or_else(|| format!("{} is not a service kind", kind))?;

    let changed = match action {
        ServiceCmd::List => {
            let items = admitted(kind, store.fetch_all().await?)?;
            println!("{}", render::services(&items));
            return Ok(());
        }
        ServiceCmd::Get { key } => store
            .api()
            .get(&key)
            .await?
            .into_result()
            .map_err(StoreError::from)?,
        ServiceCmd::Create {
            name,
            group,
            nodes,
            start,
            settings,
        } => {
            let name = name.unwrap_or_else(|| generated_name(kind));
            check_name(&name)?;
            let mut params = settings.into_map();
            params.insert("name".into(), Value::String(name));
            params.insert("group".into(), Value::String(group));
            if !nodes.is_empty() {
                params.insert(
                    "nodeNames".into(),
                    Value::Array(nodes.into_iter().map(Value::String).collect()),
                );
            }
            if start {
                admitted(kind, store.create_and_start(&params).await?)?
            } else {
                admitted(kind, store.create(&params).await?)?
            }
        }
        ServiceCmd::Update { key, settings } => {
            admitted(kind, store.update(&key, &settings.into_map()).await?)?
        }
        ServiceCmd::Start { key } => admitted(kind, store.start(&key).await?)?,
        ServiceCmd::Stop { key } => admitted(kind, store.stop(&key).await?)?,
        ServiceCmd::Remove { key } => {
            let remaining = admitted(kind, store.remove(&key).await?)?;
            println!("{}", render::services(&remaining));
            return Ok(());
        }
        ServiceCmd::AddNode { key, hostname } => {
            admitted(kind, store.add_node(&key, &hostname).await?)?
        }
        ServiceCmd::RemoveNode { key, hostname } => {
            admitted(kind, store.remove_node(&key, &hostname).await?)?
        }
    };

    println!("{}", render::json(&changed));
    Ok(())
}

async fn pipeline(console: &Console, action: PipelineCmd) -> CliResult {
    let store = &console.pipelines;
    let kind = ResourceKind::Pipeline;
    match action {
        PipelineCmd::List => {
            let pipelines = admitted(kind, store.fetch_all().await?)?;
            println!("{}", render::pipelines(&pipelines));
        }
        PipelineCmd::Get { key } => {
            let pipeline = store
                .api()
                .get(&key)
                .await?
                .into_result()
                .map_err(StoreError::from)?;
            println!("{}", render::json(&pipeline));
        }
        PipelineCmd::Refresh { key } => {
            let pipeline = store
                .api()
                .refresh(&key)
                .await?
                .into_result()
                .map_err(StoreError::from)?;
            println!("{}", render::json(&pipeline));
        }
        PipelineCmd::Remove { key, with_services } => {
            let deleter = console.deleter();
            let mut progress = deleter.progress();
            let watcher = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let p = progress.borrow_and_update().clone();
                    match p.active_step.checked_sub(1).and_then(|i| p.steps.get(i)) {
                        Some(step) => {
                            eprintln!("  [{}/{}] {}", p.active_step, p.steps.len(), step)
                        }
                        None => eprintln!("Deleting {} pipeline services", p.steps.len()),
                    }
                }
            });

            let removed = console.delete_pipeline(&key, with_services, &deleter).await;
            drop(deleter);
            let _ = watcher.await;

            let remaining = admitted(kind, removed?)?;
            println!("{}", render::pipelines(&remaining));
        }
    }
    Ok(())
}

async fn inspect(console: &Console, label: &str) -> CliResult {
    let kind = service_kind(label)?;
    let info = console
        .configurator()
        .inspect()
        .info(kind)
        .await?
        .into_result()
        .map_err(StoreError::from)?;
    if let Some(image) = &info.image_name {
        eprintln!("image: {}", image);
    }
    for class in info.class_names() {
        eprintln!("class: {}", class);
    }
    println!("{}", render::definitions(info.definitions()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_setting() {
        assert_eq!(
            parse_setting("clientPort=2181").unwrap(),
            ("clientPort".to_string(), json!(2181))
        );
        assert_eq!(
            parse_setting("zookeeperClusterKey=default/zk").unwrap(),
            ("zookeeperClusterKey".to_string(), json!("default/zk"))
        );
        assert_eq!(
            parse_setting("tags={\"type\":\"private\"}").unwrap(),
            ("tags".to_string(), json!({"type": "private"}))
        );
        assert_eq!(
            parse_setting("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
        assert!(parse_setting("novalue").is_err());
        assert!(parse_setting("=1").is_err());
    }

    #[test]
    fn test_generated_names_pass_validation() {
        for kind in ResourceKind::SERVICES {
            let name = generated_name(kind);
            assert!(name.starts_with(kind.label()));
            assert!(check_name(&name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("zk1").is_ok());
        assert!(check_name("").unwrap_err().contains("required"));
        assert!(check_name("Zk").unwrap_err().contains("lower case"));
        assert!(check_name("abcdefghijklmnopqrstu").unwrap_err().contains("less than 20"));
    }

    #[test]
    fn test_service_kind() {
        assert_eq!(service_kind("broker").unwrap(), ResourceKind::Broker);
        assert!(service_kind("node").is_err());
        assert!(service_kind("pipeline").is_err());
    }

    #[test]
    fn test_cli_parses_nested_commands() {
        let cli = Cli::try_parse_from([
            "om",
            "--configurator",
            "http://cfg:12345",
            "zookeeper",
            "create",
            "zk1",
            "--node",
            "n1",
            "--start",
            "--set",
            "clientPort=2181",
        ])
        .unwrap();
        assert_eq!(cli.configurator.as_deref(), Some("http://cfg:12345"));
        match cli.command {
            Commands::Zookeeper {
                action:
                    ServiceCmd::Create {
                        name,
                        group,
                        nodes,
                        start,
                        settings,
                    },
            } => {
                assert_eq!(name.as_deref(), Some("zk1"));
                assert_eq!(group, "default");
                assert_eq!(nodes, vec!["n1".to_string()]);
                assert!(start);
                assert_eq!(settings.into_map()["clientPort"], json!(2181));
            }
            _ => panic!("expected zookeeper create"),
        }

        let cli = Cli::try_parse_from(["om", "pipeline", "remove", "g1/p1", "--with-services"])
            .unwrap();
        match cli.command {
            Commands::Pipeline {
                action: PipelineCmd::Remove { key, with_services },
            } => {
                assert_eq!(key, ObjectKey::new("p1", "g1"));
                assert!(with_services);
            }
            _ => panic!("expected pipeline remove"),
        }
    }
}
