//! Command-line interface for Feedloop.
//!
//! One binary, two roles: the edge capture agent and the cloud decision
//! worker. Both establish the channel session up front; failing to
//! connect after the bounded retries is fatal rather than running
//! disconnected.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use feedloop_agent::{CaptureAgent, HttpActuator, HttpFrameSource};
use feedloop_channel::MqttChannel;
use feedloop_cloud::{
    DecisionEngine, DecisionService, HttpClassifier, HttpImageFetcher, RequestWorker,
};
use feedloop_core::FeedloopConfig;
use feedloop_storage::{CooldownStore, RedbCooldownStore};

/// Feedloop - feeding coordination between an edge device and a cloud
/// decision service.
#[derive(Parser, Debug)]
#[command(name = "feedloop")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Role to run.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the edge capture agent.
    Agent,
    /// Run the cloud decision worker.
    Cloud,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "feedloop=debug"
    } else {
        "feedloop=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Ctrl-C flips the shutdown flag; long waits select on it.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = tx.send(true);
        }
    });
    rx
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => FeedloopConfig::load(path)?,
        None => {
            let mut config = FeedloopConfig::default();
            config.apply_env();
            config
        }
    };

    match args.command {
        Command::Agent => run_agent(config).await,
        Command::Cloud => run_cloud(config).await,
    }
}

async fn run_agent(config: FeedloopConfig) -> Result<()> {
    let channel = Arc::new(MqttChannel::connect(&config.channel).await?);

    let frames = Arc::new(HttpFrameSource::new(&config.agent.capture_endpoint));
    let actuator = Arc::new(HttpActuator::new(&config.agent.actuator_endpoint));

    let mut agent = CaptureAgent::new(
        channel,
        frames,
        actuator,
        config.topics.clone(),
        config.agent.clone(),
    );

    agent.run(shutdown_signal()).await?;
    Ok(())
}

async fn run_cloud(config: FeedloopConfig) -> Result<()> {
    let channel = Arc::new(MqttChannel::connect(&config.channel).await?);

    let store: Arc<dyn CooldownStore> = Arc::new(RedbCooldownStore::open(&config.cloud.store_path)?);
    store
        .initialize(
            &config.catalog.subjects,
            config.decision.cooldown_window(),
        )
        .await?;

    // The classifier is created once and shared read-only for the whole
    // process lifetime.
    let classifier = Arc::new(HttpClassifier::new(&config.cloud.classifier_endpoint));
    let fetcher = Arc::new(HttpImageFetcher::new());

    let engine = DecisionEngine::new(
        store,
        config.catalog.clone(),
        config.decision.clone(),
    );
    let service = Arc::new(DecisionService::new(
        classifier,
        fetcher.clone(),
        engine,
        channel.clone(),
        config.topics.clone(),
        config.cloud.region.clone(),
    ));

    let worker = RequestWorker::new(service, channel, config.topics.clone(), fetcher);
    worker.run(shutdown_signal()).await?;
    Ok(())
}
