use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use bant_agent::lead::LeadCapture;
use bant_agent::livekit::{IssuedToken, ParticipantPermissions, RecordingLayout, TokenRequest};
use bant_agent::session::AgentSession;
use bant_agent::tools::submit_lead;
use bant_agent::{Config, ConsoleSink, ConversationContext, LeadRepo, db};

/// bant - room tokens, recordings and captured leads for the BANT voice agent
#[derive(Parser)]
#[command(name = "bant", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate room access tokens
    #[command(subcommand)]
    Token(TokenCommand),
    /// Record room sessions via the egress service
    #[command(subcommand)]
    Record(RecordCommand),
    /// Manage rooms
    #[command(subcommand)]
    Room(RoomCommand),
    /// Print instructions, greeting and tool definitions for the session host
    Describe,
    /// Inspect and replay captured leads
    #[command(subcommand)]
    Leads(LeadsCommand),
}

#[derive(Subcommand)]
enum TokenCommand {
    /// Token for a client (parent)
    Client {
        #[command(flatten)]
        participant: ParticipantArgs,
        #[command(flatten)]
        output: TokenOutput,
    },
    /// Token for the voice agent
    Agent {
        /// Room name
        #[arg(long)]
        room: String,
        #[command(flatten)]
        output: TokenOutput,
    },
    /// Token with explicit permissions
    Custom {
        #[command(flatten)]
        participant: ParticipantArgs,
        /// Disable publish permission
        #[arg(long)]
        no_publish: bool,
        /// Disable subscribe permission
        #[arg(long)]
        no_subscribe: bool,
        /// Disable publish data permission
        #[arg(long)]
        no_publish_data: bool,
        #[command(flatten)]
        output: TokenOutput,
    },
}

#[derive(Args)]
struct ParticipantArgs {
    /// Room name
    #[arg(long)]
    room: String,
    /// Participant identity (e.g. phone number, user ID)
    #[arg(long)]
    identity: String,
    /// Participant display name (defaults to identity)
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args)]
struct TokenOutput {
    /// Tracking id to embed (generated when omitted)
    #[arg(long)]
    conversation_id: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum RecordCommand {
    /// Start recording a room
    Start {
        /// Room name
        room: String,
        /// Output path (local path or s3://, gs:// URI);
        /// default: <recordings dir>/<room>_<timestamp>.mp4
        #[arg(long)]
        output: Option<PathBuf>,
        /// Recording layout
        #[arg(long, value_enum, default_value_t = Layout::Speaker)]
        layout: Layout,
    },
    /// Stop an active recording
    Stop {
        /// Egress ID returned when the recording started
        #[arg(long)]
        egress_id: String,
    },
    /// List recordings
    List {
        /// Only recordings of this room
        room: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    Speaker,
    Grid,
}

impl From<Layout> for RecordingLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Speaker => Self::Speaker,
            Layout::Grid => Self::Grid,
        }
    }
}

#[derive(Subcommand)]
enum RoomCommand {
    /// Create a room with the agent dispatch carrying a tracking id
    Create {
        /// Room name
        room: String,
        /// Tracking id for the agent dispatch
        #[arg(long)]
        conversation_id: Option<String>,
        /// Participant cap (defaults to the configured value)
        #[arg(long)]
        max_participants: Option<u32>,
    },
}

#[derive(Subcommand)]
enum LeadsCommand {
    /// List recently captured leads
    List {
        /// Maximum number of leads
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Show the lead captured in a conversation
    Show {
        conversation_id: String,
    },
    /// Replay a `submit_lead` call into the console and the lead store
    Capture {
        /// Conversation the lead belongs to (generated when omitted)
        #[arg(long)]
        conversation_id: Option<String>,
        /// Tool-call arguments as a JSON object
        #[arg(long)]
        fields: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "warn,bant_agent=info,bant=info",
        1 => "info,bant_agent=debug,bant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Token(cmd) => cmd_token(&config, cmd),
        Command::Record(cmd) => cmd_record(&config, cmd).await,
        Command::Room(cmd) => cmd_room(&config, cmd).await,
        Command::Describe => cmd_describe(&config),
        Command::Leads(cmd) => cmd_leads(&config, cmd),
    }
}

fn cmd_token(config: &Config, cmd: TokenCommand) -> anyhow::Result<()> {
    let issuer = config.token_issuer()?;

    let (issued, output) = match cmd {
        TokenCommand::Client {
            participant,
            output,
        } => {
            let issued = issuer.client_token(
                &participant.room,
                &participant.identity,
                participant.name.as_deref(),
                output.conversation_id.clone(),
            )?;
            (issued, output)
        }
        TokenCommand::Agent { room, output } => {
            let issued = issuer.agent_token(&room, output.conversation_id.clone())?;
            (issued, output)
        }
        TokenCommand::Custom {
            participant,
            no_publish,
            no_subscribe,
            no_publish_data,
            output,
        } => {
            let issued = issuer.issue(TokenRequest {
                room: participant.room,
                identity: participant.identity,
                name: participant.name,
                permissions: ParticipantPermissions {
                    can_publish: !no_publish,
                    can_subscribe: !no_subscribe,
                    can_publish_data: !no_publish_data,
                },
                conversation_id: output.conversation_id.clone(),
            })?;
            (issued, output)
        }
    };

    print_token(config, &issued, output.json)
}

fn print_token(config: &Config, issued: &IssuedToken, as_json: bool) -> anyhow::Result<()> {
    let url = config.livekit.url.as_deref();

    if as_json {
        let output = json!({
            "token": issued.token,
            "conversation_id": issued.conversation_id,
            "url": url,
            "room": issued.room,
            "identity": issued.identity,
            "name": issued.name,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let rule = "=".repeat(60);
    println!("{rule}");
    println!("Room Access Token");
    println!("{rule}");
    println!("Room: {}", issued.room);
    println!("Conversation ID: {}", issued.conversation_id);
    println!("Identity: {}", issued.identity);
    println!("Name: {}", issued.name);
    println!("URL: {}", url.unwrap_or("(LIVEKIT_URL not set)"));
    println!("{}", "-".repeat(60));
    println!("Token:");
    println!("{}", issued.token);
    println!("{rule}");
    println!("\nUse this token with the URL above to connect to the room.");
    println!(
        "Conversation ID '{}' will be used for tracking this conversation.",
        issued.conversation_id
    );
    Ok(())
}

async fn cmd_record(config: &Config, cmd: RecordCommand) -> anyhow::Result<()> {
    let client = config.egress_client()?;

    match cmd {
        RecordCommand::Start {
            room,
            output,
            layout,
        } => {
            let started = client
                .start_room_composite(&room, output.as_deref(), layout.into())
                .await?;
            println!("Recording started");
            println!("Egress ID: {}", started.info.egress_id);
            println!("Room Name: {}", started.info.room_name);
            println!("Status: {}", started.info.status);
            println!("Output: {}", started.filepath.display());
        }
        RecordCommand::Stop { egress_id } => {
            let info = client.stop(&egress_id).await?;
            println!("Recording stopped");
            println!("Egress ID: {}", info.egress_id);
            println!("Status: {}", info.status);
        }
        RecordCommand::List { room } => {
            let items = client.list(room.as_deref()).await?;
            println!("Found {} recording(s)", items.len());
            for item in items {
                println!(
                    "  - Egress ID: {}, Room: {}, Status: {}",
                    item.egress_id, item.room_name, item.status
                );
            }
        }
    }

    Ok(())
}

async fn cmd_room(config: &Config, cmd: RoomCommand) -> anyhow::Result<()> {
    match cmd {
        RoomCommand::Create {
            room,
            conversation_id,
            max_participants,
        } => {
            let client = config.room_client()?;
            let created = client
                .create_room(
                    &room,
                    conversation_id.as_deref(),
                    max_participants.unwrap_or(config.max_participants),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
    }
    Ok(())
}

fn cmd_describe(config: &Config) -> anyhow::Result<()> {
    // Describing never captures, so the session needs no sinks
    let session = AgentSession::start(None, LeadCapture::new(config.lead_policy.clone()));

    let output = json!({
        "instructions": session.instructions(),
        "greeting": session.greeting(),
        "tools": session.tools(),
        "realtime": config.realtime,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn cmd_leads(config: &Config, cmd: LeadsCommand) -> anyhow::Result<()> {
    let repo = LeadRepo::new(db::init(&config.lead_db)?);

    match cmd {
        LeadsCommand::List { limit } => {
            let leads = repo.list_recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&leads)?);
        }
        LeadsCommand::Show { conversation_id } => {
            let lead = repo
                .find_by_conversation(&conversation_id)?
                .ok_or_else(|| anyhow::anyhow!("no lead for conversation {conversation_id}"))?;
            println!("{}", serde_json::to_string_pretty(&lead)?);
        }
        LeadsCommand::Capture {
            conversation_id,
            fields,
        } => {
            // The store claims the conversation before anything is printed
            let capture = LeadCapture::new(config.lead_policy.clone())
                .with_sink(Arc::new(repo))
                .with_sink(Arc::new(ConsoleSink::stdout()));

            let mut ctx = ConversationContext::new(conversation_id);
            ctx.begin();

            let ack = capture.submit(&mut ctx, submit_lead::parse_arguments(&fields)?)?;
            println!("{}", serde_json::to_string(&ack)?);
        }
    }

    Ok(())
}
