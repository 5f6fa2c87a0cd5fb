use anyhow::Result;
use clap::{Parser, Subcommand};
use journal_config::AssistantConfig;
use journal_core::Provider;
use journal_service::ConversationService;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "journal-assistant")]
#[command(about = "Conversational journaling assistant with persistent memory", long_about = None)]
struct Cli {
    /// Config file; defaults to ~/.journal-assistant/config.yaml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a message about a journal entry
    Chat {
        /// The message to send
        #[arg(short, long)]
        message: String,

        /// The journal entry text the conversation is about
        #[arg(short, long, default_value = "")]
        entry: String,

        /// Which provider to use: openai or anthropic
        #[arg(short, long, default_value = "openai")]
        provider: String,

        /// Conversation to continue; a new one is started when omitted
        #[arg(long)]
        conversation: Option<Uuid>,
    },

    /// Print the message history of a conversation
    History {
        conversation: Uuid,
    },

    /// Forget a conversation in memory and on disk
    Clear {
        conversation: Uuid,
    },

    /// Remove conversations older than the configured retention period
    Cleanup,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config_path = cli
        .config
        .unwrap_or_else(AssistantConfig::default_config_path);
    let config = if config_path.exists() {
        info!("Loading configuration from: {:?}", config_path);
        AssistantConfig::from_yaml(&config_path)?
    } else {
        info!("Using default configuration");
        AssistantConfig::default()
    };

    let service = ConversationService::new(config);

    match cli.command {
        Commands::Chat {
            message,
            entry,
            provider,
            conversation,
        } => {
            let provider = parse_provider(&provider)?;
            let id = conversation.unwrap_or_else(Uuid::new_v4);
            let reply = service
                .send_message(&message, provider, &entry, id, Vec::new())
                .await?;
            println!("{reply}");
            println!("\n(conversation {id})");
        }
        Commands::History { conversation } => {
            let history = service.get_conversation_history(&conversation).await;
            if history.is_empty() {
                println!("No messages for conversation {conversation}");
            }
            for message in history {
                let speaker = if message.is_user { "You" } else { "Assistant" };
                println!("[{}] {}: {}", message.timestamp, speaker, message.content);
            }
        }
        Commands::Clear { conversation } => {
            service.clear_conversation(&conversation).await;
            println!("Cleared conversation {conversation}");
        }
        Commands::Cleanup => {
            let removed = service.cleanup().await?;
            println!("Removed {removed} stale conversation(s)");
        }
    }

    // Flush pending disk writes before the runtime is torn down.
    service.shutdown().await;

    Ok(())
}

fn parse_provider(name: &str) -> Result<Provider> {
    match name.to_ascii_lowercase().as_str() {
        "openai" => Ok(Provider::OpenAi),
        "anthropic" => Ok(Provider::Anthropic),
        other => anyhow::bail!("unknown provider '{other}', expected openai or anthropic"),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
