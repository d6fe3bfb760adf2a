use async_trait::async_trait;
use clap::{Parser, Subcommand};
use mailsmith::clients::{
    DeliveryTransport, Envelope, HttpDeliveryTransport, HttpGenerationBackend, HttpReviewService,
};
use mailsmith::{ExecMode, Operation, ResumeDecision, WorkflowEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};

/// Draft, review and deliver HTML content per instance
#[derive(Parser)]
#[command(name = "mailsmith")]
#[command(about = "Drive AI-drafted HTML content through human review and email delivery", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Root directory holding instance directories
    #[arg(long, default_value = "instances", global = true)]
    root: PathBuf,

    /// Default generation backend endpoint (instance config may override)
    #[arg(long, global = true)]
    generation_endpoint: Option<String>,

    /// Delivery transport endpoint
    #[arg(long, global = true)]
    delivery_endpoint: Option<String>,

    /// Default review service endpoint (instance config may override)
    #[arg(long, global = true)]
    review_endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the HTML artifact for an instance
    Generate {
        /// Instance identifier
        instance: String,
        /// Free-text instructions, `;`-delimited items become bullets
        #[arg(long)]
        instructions: Option<String>,
        /// Revise the existing artifact instead of generating fresh
        #[arg(long)]
        edit: bool,
        /// Explicit base artifact for --edit (missing file is a hard error)
        #[arg(long)]
        base_artifact: Option<PathBuf>,
        /// Return immediately and finish in the background
        #[arg(long)]
        background: bool,
    },
    /// Send the current artifact through review and delivery
    Send {
        instance: String,
        #[arg(long)]
        background: bool,
    },
    /// Generate, then send
    Run {
        instance: String,
        #[arg(long)]
        instructions: Option<String>,
        #[arg(long)]
        edit: bool,
        #[arg(long)]
        background: bool,
    },
    /// Advance a paused run with an external decision
    Resume {
        instance: String,
        #[arg(value_enum)]
        decision: ResumeDecision,
        /// Revision instructions (modify) or rejection reason (reject)
        #[arg(long)]
        information: Option<String>,
    },
    /// Print the state document
    Status { instance: String },
    /// Print progress milestones
    Progress {
        instance: String,
        /// Print the full sequence instead of the latest entry
        #[arg(long)]
        full: bool,
    },
    /// Serve the REST API
    Serve {
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

/// Placeholder transport used until --delivery-endpoint is configured
struct UnconfiguredDelivery;

#[async_trait]
impl DeliveryTransport for UnconfiguredDelivery {
    async fn deliver(&self, _envelope: &Envelope) -> mailsmith::Result<String> {
        Err(mailsmith::Error::DeliveryFailed(
            "no delivery endpoint configured (--delivery-endpoint)".to_string(),
        ))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        2 => "trace",
        _ => "trace,hyper=debug,tower=debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("mailsmith started with verbosity level: {}", cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn build_engine(cli: &Cli) -> anyhow::Result<WorkflowEngine> {
    let generation = Arc::new(HttpGenerationBackend::new(cli.generation_endpoint.clone())?);
    let delivery: Arc<dyn DeliveryTransport> = match &cli.delivery_endpoint {
        Some(endpoint) => Arc::new(HttpDeliveryTransport::new(endpoint.clone())?),
        None => Arc::new(UnconfiguredDelivery),
    };
    let review = Arc::new(HttpReviewService::new(cli.review_endpoint.clone())?);

    Ok(WorkflowEngine::new(
        cli.root.clone(),
        generation,
        delivery,
        review,
    ))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let engine = build_engine(&cli)?;

    let outcome = match cli.command {
        Commands::Generate {
            ref instance,
            ref instructions,
            edit,
            ref base_artifact,
            background,
        } => {
            let mut op = Operation::generate_only()
                .with_instructions(instructions.clone())
                .with_edit(edit);
            op.base_artifact = base_artifact.clone();
            engine
                .execute(instance, op, ExecMode::from_async_flag(background))
                .await?
        }
        Commands::Send {
            ref instance,
            background,
        } => {
            engine
                .execute(
                    instance,
                    Operation::send_only(),
                    ExecMode::from_async_flag(background),
                )
                .await?
        }
        Commands::Run {
            ref instance,
            ref instructions,
            edit,
            background,
        } => {
            let op = Operation::generate_then_send()
                .with_instructions(instructions.clone())
                .with_edit(edit);
            engine
                .execute(instance, op, ExecMode::from_async_flag(background))
                .await?
        }
        Commands::Resume {
            ref instance,
            decision,
            ref information,
        } => engine.resume(instance, decision, information.clone()).await?,
        Commands::Status { ref instance } => {
            let state = engine.status(instance).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            return Ok(());
        }
        Commands::Progress { ref instance, full } => {
            let entries = engine.progress(instance, full).await?;
            for entry in entries {
                println!("{} {}", entry.timestamp.to_rfc3339(), entry.message);
            }
            return Ok(());
        }
        Commands::Serve { port } => {
            return mailsmith::server::ApiServer::new(engine, port).start().await;
        }
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
