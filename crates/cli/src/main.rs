use bridge::botpress::{ChatApiClient, NewUser, WebhookClient, WebhookSender};
use bridge::conversation::ConversationCell;
use bridge::gateway::{self, GatewayState};
use bridge::relay::{spawn_line_reader, Relay, RelayOutcome, RelayStop, StdinLineSource};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Conversation id the interactive chat starts in when none is given.
const CLI_CONVERSATION: &str = "cli_conversation";

#[derive(Parser)]
#[command(name = "bpbridge")]
#[command(about = "Relay chat messages between a console or HTTP endpoint and Botpress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the inbound HTTP API and relay console lines to the webhook. Type `quit` to stop.
    Serve {
        /// Config file path (default: BPBRIDGE_CONFIG_PATH or ~/.bpbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 50000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Chat with the bot directly through the webhook (interactive).
    Chat {
        /// Config file path (default: BPBRIDGE_CONFIG_PATH or ~/.bpbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Conversation id to start in.
        #[arg(long, value_name = "ID")]
        conversation: Option<String>,
    },

    /// Create a conversation through the Botpress chat API and print the response.
    CreateConversation {
        /// Config file path (default: BPBRIDGE_CONFIG_PATH or ~/.bpbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Create a conversation on the Botpress chat integration (uses the webhook secret) and print the response.
    CreateChatConversation {
        /// Config file path (default: BPBRIDGE_CONFIG_PATH or ~/.bpbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Chat integration webhook id (the path segment after chat.botpress.cloud/).
        #[arg(long, value_name = "ID")]
        webhook_id: String,
    },

    /// Create a chat user on the Botpress chat integration and print the response.
    CreateUser {
        /// Config file path (default: BPBRIDGE_CONFIG_PATH or ~/.bpbridge/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Chat integration webhook id (the path segment after chat.botpress.cloud/).
        #[arg(long, value_name = "ID")]
        webhook_id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        id: Option<String>,

        #[arg(long, value_name = "URL")]
        picture_url: Option<String>,

        #[arg(long)]
        profile: Option<String>,
    },

    /// Post a message to a running bridge's /api/message endpoint.
    Send {
        /// Endpoint URL.
        #[arg(long, default_value = "http://127.0.0.1:50000/api/message")]
        url: String,

        #[arg(long, value_name = "ID", default_value = "botpress_user")]
        user_id: String,

        #[arg(long, value_name = "ID")]
        conversation: Option<String>,

        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("bpbridge {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            conversation,
        }) => {
            if let Err(e) = run_chat(config, conversation).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::CreateConversation { config }) => {
            if let Err(e) = run_create_conversation(config).await {
                log::error!("create-conversation failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::CreateChatConversation { config, webhook_id }) => {
            if let Err(e) = run_create_chat_conversation(config, &webhook_id).await {
                log::error!("create-chat-conversation failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::CreateUser {
            config,
            webhook_id,
            name,
            id,
            picture_url,
            profile,
        }) => {
            let user = NewUser {
                name,
                picture_url,
                profile,
                id,
            };
            if let Err(e) = run_create_user(config, &webhook_id, user).await {
                log::error!("create-user failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            url,
            user_id,
            conversation,
            message,
        }) => {
            if let Err(e) = run_send(&url, &user_id, conversation, &message).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

/// Operator-facing rendering of one relay step.
fn print_outcome(outcome: &RelayOutcome) {
    match outcome {
        RelayOutcome::Skipped | RelayOutcome::Quit => {}
        RelayOutcome::Waiting => {
            println!("waiting for a conversation id: nothing has been received on /api/message yet");
        }
        RelayOutcome::Reply(reply) => println!("Bot: {}", reply.text),
        RelayOutcome::Failed(e) => println!("Bot: {}", e),
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, _) = bridge::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    let webhook: Arc<dyn WebhookSender> = Arc::new(WebhookClient::from_config(&config)?);
    let conversation = ConversationCell::new();
    let relay = Relay::new(
        webhook.clone(),
        conversation.clone(),
        config.botpress.user_id.clone(),
    );
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    let state = GatewayState::new(config, conversation, Some(webhook));

    let (stop_tx, stop_rx) = oneshot::channel();
    let mut gateway_task = tokio::spawn(gateway::run_gateway(state, Some(stop_rx)));

    println!("Type a message to relay it, or 'quit' to exit");
    let lines = spawn_line_reader(StdinLineSource)?;
    let relay_task = tokio::spawn(async move { relay.run(lines, print_outcome).await });

    let stop = tokio::select! {
        res = &mut gateway_task => {
            return res?;
        }
        stop = relay_task => stop?,
    };
    match stop {
        RelayStop::Quit => {
            let _ = stop_tx.send(());
        }
        RelayStop::EndOfInput => {
            log::info!("console closed; gateway keeps running until shutdown signal");
        }
    }
    gateway_task.await?
}

async fn run_chat(config_path: Option<PathBuf>, conversation: Option<String>) -> anyhow::Result<()> {
    let (config, _) = bridge::config::load_config(config_path)?;
    let webhook = Arc::new(WebhookClient::from_config(&config)?);
    let cell = ConversationCell::new();
    cell.set(conversation.unwrap_or_else(|| CLI_CONVERSATION.to_string()))
        .await;
    let relay = Relay::new(webhook, cell.clone(), config.botpress.user_id.clone());

    println!("Botpress chat. Type 'quit' to exit");
    let mut lines = spawn_line_reader(StdinLineSource)?;
    let mut stdout = std::io::stdout();
    loop {
        write!(stdout, "You: ")?;
        stdout.flush()?;
        let Some(line) = lines.recv().await else {
            break;
        };
        let outcome = relay.handle_line(&line).await;
        print_outcome(&outcome);
        match outcome {
            RelayOutcome::Quit => break,
            RelayOutcome::Reply(reply) => {
                if let Some(id) = reply.conversation_id {
                    if let Some(old) = cell.set(id.as_str()).await {
                        if old != id {
                            log::debug!("conversation id now {}", id);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

async fn run_create_conversation(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = bridge::config::load_config(config_path)?;
    let client = ChatApiClient::from_config(&config);
    let created = client.create_conversation().await?;
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

async fn run_create_chat_conversation(
    config_path: Option<PathBuf>,
    webhook_id: &str,
) -> anyhow::Result<()> {
    let (config, _) = bridge::config::load_config(config_path)?;
    let client = ChatApiClient::from_config(&config);
    let created = client.create_chat_conversation(webhook_id).await?;
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

async fn run_create_user(
    config_path: Option<PathBuf>,
    webhook_id: &str,
    user: NewUser,
) -> anyhow::Result<()> {
    let (config, _) = bridge::config::load_config(config_path)?;
    let client = ChatApiClient::from_config(&config);
    let created = client.create_user(webhook_id, &user).await?;
    println!("{}", serde_json::to_string_pretty(&created)?);
    Ok(())
}

async fn run_send(
    url: &str,
    user_id: &str,
    conversation: Option<String>,
    message: &str,
) -> anyhow::Result<()> {
    let mut body = serde_json::json!({
        "message": message,
        "user_id": user_id,
    });
    if let Some(id) = conversation {
        body["conversationId"] = serde_json::Value::String(id);
    }
    let res = reqwest::Client::new().post(url).json(&body).send().await?;
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        anyhow::bail!("HTTP error! status: {} {}", status, text);
    }
    let data: serde_json::Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
