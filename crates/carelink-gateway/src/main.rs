//! Carelink Gateway — vitals ingestion, batching, and dual-store anchoring

use anyhow::{bail, Context};
use carelink_core::{GatewayConfig, TriggerEngine};
use carelink_gateway::{run_ingest, DualWriter, FrameReader};
use carelink_ledger::{
    DeviceIdentity, FixedSessionProvider, HttpLedgerClient, LedgerClient, RotatingSessionProvider,
    SessionIdentity, SessionIdentityProvider,
};
use carelink_mirror::{HttpMirrorClient, PatientProfile};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "carelink-gateway",
    about = "Carelink — vitals telemetry gateway with ledger anchoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize the device and start the ingestion loop
    Run {
        /// Path to carelink.json
        #[arg(short, long)]
        config: PathBuf,
        /// Frame source: a device node / FIFO path, or '-' for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
    },
    /// Read the anchor records the ledger holds for a patient identity
    Query {
        #[arg(short, long)]
        config: PathBuf,
        /// Patient (session) address; defaults to the configured session identity
        #[arg(short, long)]
        patient: Option<String>,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "carelink_gateway=info,carelink_ledger=info,carelink_mirror=info,carelink_core=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Run { config, input } => run(config, input).await,
        Commands::Query { config, patient } => query(config, patient).await,
        Commands::Version => {
            println!("carelink-gateway v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(config_path: PathBuf, input: String) -> anyhow::Result<()> {
    let config = GatewayConfig::load(&config_path)?;
    let device = device_identity(&config)?;

    let ledger: Arc<dyn LedgerClient> = Arc::new(HttpLedgerClient::new(config.ledger_url()));
    let mirror = Arc::new(HttpMirrorClient::new(config.mirror_url()));
    let sessions = session_provider(&config);

    let session_address = sessions.current_identity().address;
    info!(session = %session_address, "privacy mode active");

    let profile = PatientProfile {
        name: config
            .mirror
            .patient
            .name
            .clone()
            .unwrap_or_else(|| "Unregistered Patient".into()),
        age: config.mirror.patient.age.unwrap_or(30),
        wallet_address: session_address,
    };

    let policy = config.trigger_policy();
    let mut writer = DualWriter::new(
        ledger,
        mirror,
        sessions,
        device,
        profile,
        policy.critical_threshold,
        config.ledger.funding_amount.unwrap_or(1_000_000),
    );

    // No ingestion without a confirmed authorization; operator intervention
    // is required on failure.
    writer
        .authorize_startup()
        .await
        .context("device authorization handshake failed")?;

    let frames = FrameReader::new(open_input(&input).await?);
    let engine = TriggerEngine::new(policy);
    run_ingest(frames, engine, writer).await?;
    Ok(())
}

async fn query(config_path: PathBuf, patient: Option<String>) -> anyhow::Result<()> {
    let config = GatewayConfig::load(&config_path)?;
    let device = device_identity(&config)?;

    let Some(patient) = patient.or_else(|| config.ledger.session.address.clone()) else {
        bail!("no patient address given and none configured");
    };

    let ledger = HttpLedgerClient::new(config.ledger_url());
    let records = ledger
        .query_anchors(&patient, &device.address)
        .await
        .context("anchor query failed")?;

    println!("{} anchor record(s) for {patient}", records.len());
    for record in records {
        println!(
            "  {}  {}  {}  submitted by {}",
            record.captured_at.to_rfc3339(),
            if record.is_critical { "CRITICAL" } else { "routine " },
            record.anchor.prefix(),
            record.device,
        );
    }
    Ok(())
}

fn device_identity(config: &GatewayConfig) -> anyhow::Result<DeviceIdentity> {
    let (Some(address), Some(key)) = (
        config.ledger.device_address.clone(),
        config.ledger.device_key.clone(),
    ) else {
        bail!("device identity missing: set ledger.deviceAddress and ledger.deviceKey (or CARELINK_DEVICE_KEY)");
    };
    Ok(DeviceIdentity::new(address, key))
}

fn session_provider(config: &GatewayConfig) -> Arc<dyn SessionIdentityProvider> {
    match config.ledger.session.policy.as_deref() {
        Some("per-batch") => Arc::new(RotatingSessionProvider::new()),
        _ => {
            let identity = match (&config.ledger.session.address, &config.ledger.session.key) {
                (Some(address), Some(key)) => SessionIdentity::new(address.clone(), key.clone()),
                _ => {
                    warn!("no session identity configured, generating one for this process");
                    SessionIdentity::generate()
                }
            };
            Arc::new(FixedSessionProvider::new(identity))
        }
    }
}

async fn open_input(input: &str) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(input)
        .await
        .with_context(|| format!("cannot open frame source {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}
