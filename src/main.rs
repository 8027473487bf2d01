use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use soar_correlator::{
    backend::{BackendClient, SoarClient},
    config::{Config, FailurePolicy},
    enrichment::{CancellationToken, IncidentEnrichmentService},
    notes::{ImageMode, NotePoster},
    observability::init_tracing,
    AppError, IncidentId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "soar-correlator")]
#[command(version, about = "Cross-incident artifact correlation for SOAR backends", long_about = None)]
struct Cli {
    /// Config file (defaults to SOAR_CONFIG_PATH or config/soar.toml)
    #[arg(short, long, env = "SOAR_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich an incident with its artifacts and related incidents
    Enrich {
        #[arg(value_name = "INCIDENT_ID")]
        id: IncidentId,

        /// Failure policy for correlation queries (strict|lenient)
        #[arg(short, long)]
        policy: Option<FailurePolicy>,

        /// Maximum backend requests in flight
        #[arg(short = 'j', long)]
        max_concurrent: Option<usize>,

        /// Pages requested per paged query
        #[arg(long)]
        max_pages: Option<usize>,

        /// Print the enrichment report alongside the incident
        #[arg(short, long)]
        report: bool,
    },

    /// Post an HTML note with an image to an incident
    Note {
        #[arg(value_name = "INCIDENT_ID")]
        id: IncidentId,

        /// Note body (HTML)
        #[arg(long)]
        html: String,

        /// Image file to include
        #[arg(long)]
        image: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Mode::Inline)]
        mode: Mode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Inline,
    Attachment,
}

impl From<Mode> for ImageMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Inline => ImageMode::Inline,
            Mode::Attachment => ImageMode::Attachment,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AppError>()
            .map(AppError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(&path.to_string_lossy()),
        None => Config::load(),
    }
    .map_err(AppError::from)?;

    init_tracing(&config.observability)?;

    if let Commands::Enrich {
        policy,
        max_concurrent,
        max_pages,
        ..
    } = &cli.command
    {
        if let Some(policy) = policy {
            config.correlation.failure_policy = *policy;
        }
        if let Some(max_concurrent) = max_concurrent {
            config.correlation.max_concurrent = *max_concurrent;
        }
        if let Some(max_pages) = max_pages {
            config.correlation.max_pages = *max_pages;
        }
    }
    config.validate()?;

    tracing::info!("Starting soar-correlator v{}", env!("CARGO_PKG_VERSION"));

    let client: Arc<dyn BackendClient> = Arc::new(
        SoarClient::connect(&config.backend)
            .await
            .map_err(AppError::from)?,
    );

    match cli.command {
        Commands::Enrich { id, report, .. } => {
            let service = IncidentEnrichmentService::new(client, config.correlation);

            let token = CancellationToken::new();
            let interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, cancelling enrichment");
                    interrupt.cancel();
                }
            });

            let outcome = service
                .enrich_with_cancel(id, &token.signal())
                .await
                .map_err(AppError::from)?;

            let output = if report {
                json!({
                    "incident": outcome.incident,
                    "report": outcome.report,
                })
            } else {
                outcome.incident.to_value()
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&output).context("failed to render incident")?
            );
        }

        Commands::Note {
            id,
            html,
            image,
            mode,
        } => {
            let note = NotePoster::new(client)
                .post_with_image(id, &html, &image, mode.into())
                .await
                .map_err(AppError::from)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&note).context("failed to render note")?
            );
        }
    }

    Ok(())
}
