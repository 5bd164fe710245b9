use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;
use vaidya_cli::chat::{ChatMessage, ChatSession};
use vaidya_cli::client::{ApiClient, ClientError, DEFAULT_API_URL, Environment};
use vaidya_cli::token_store::{FileTokenStore, StoreError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("websocket failed: {0}")]
    Ws(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for CliError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Ws(Box::new(err))
    }
}

#[derive(Parser, Debug)]
#[command(name = "vaidya-cli", about = "Vaidya medical assistant command line client")]
struct Cli {
    #[arg(long, env = "VAIDYA_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "VAIDYA_ENV", value_enum, default_value = "development")]
    env: Environment,

    /// Where tokens and chat history are kept.
    #[arg(long, env = "VAIDYA_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "VAIDYA_PASSWORD")]
        password: String,
    },
    Logout,
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "VAIDYA_PASSWORD")]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    Me,
    /// Ask a single question.
    Ask {
        question: String,
        #[arg(long)]
        conversation: Option<Uuid>,
    },
    /// Interactive chat; `/clear` resets the transcript, `/quit` exits.
    Chat {
        #[arg(long)]
        conversation: Option<Uuid>,
        /// Start with a fresh server-side conversation.
        #[arg(long)]
        new: bool,
    },
    Conversations,
    Symptoms {
        #[arg(required = true)]
        symptoms: Vec<String>,
    },
    Emergency,
    Documents {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "research_paper")]
        document_type: String,
    },
    /// Join the websocket relay; stdin lines are sent, incoming text is printed.
    Relay {
        #[arg(long)]
        client_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let store = FileTokenStore::new(cli.token_file.unwrap_or_else(FileTokenStore::default_path));
    let client = ApiClient::new(&cli.api_url, cli.env, Arc::new(store))?;

    match cli.command {
        Command::Login { username, password } => {
            let me = client.login(&username, &password).await?;
            print_json(&me)
        }
        Command::Logout => match client.logout().await {
            Ok(()) => Ok(()),
            Err(ClientError::Store(e)) => Err(e.into()),
            Err(e) => {
                eprintln!("server logout failed ({e}); local credentials cleared");
                Ok(())
            }
        },
        Command::Register { email, username, password, full_name } => {
            let body = json!({ "email": email, "username": username, "password": password, "full_name": full_name });
            print_json(&client.register(body).await?)
        }
        Command::Me => print_json(&client.me().await?),
        Command::Ask { question, conversation } => print_json(&client.ask(&question, conversation).await?),
        Command::Chat { conversation, new } => run_chat(&client, conversation, new).await,
        Command::Conversations => print_json(&client.conversations().await?),
        Command::Symptoms { symptoms } => print_json(&client.analyze_symptoms(&symptoms).await?),
        Command::Emergency => print_json(&client.emergency().await?),
        Command::Documents { page, size } => print_json(&client.documents(page, size).await?),
        Command::Search { query, limit } => print_json(&client.search_documents(&query, limit).await?),
        Command::Upload { path, title, document_type } => {
            print_json(&client.upload_document(&path, &title, &document_type).await?)
        }
        Command::Relay { client_id } => run_relay(&client, client_id).await,
    }
}

async fn run_chat(client: &ApiClient, conversation: Option<Uuid>, new: bool) -> Result<(), CliError> {
    let conversation = if new {
        let created = client.create_conversation(None, None).await?;
        created.get("id").and_then(Value::as_str).and_then(|id| Uuid::parse_str(id).ok())
    } else {
        conversation
    };

    let mut session = ChatSession::new(client, conversation);
    if !new && conversation.is_none() {
        session.load_history(client.store().as_ref());
    }
    for message in session.messages() {
        print_message(message);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                continue;
            }
            _ => {}
        }
        if let Some(reply) = session.send(&line).await? {
            print_message(reply);
        }
    }
    session.save_history(client.store().as_ref())?;
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let who = if message.is_from_user { "you" } else { "vaidya" };
    println!("[{who}] {}", message.content);
    if let Some(confidence) = message.confidence {
        println!("        confidence {confidence:.2}");
    }
    for source in &message.sources {
        println!("        source: {source}");
    }
}

async fn run_relay(client: &ApiClient, client_id: Option<String>) -> Result<(), CliError> {
    let client_id = client_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let (stream, _) = connect_async(client.ws_url(&client_id)?).await?;
    let (mut sink, mut source) = stream.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    sink.send(Message::Close(None)).await?;
                    break;
                };
                sink.send(Message::text(line)).await?;
            }
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => println!("{text}"),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
        }
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
