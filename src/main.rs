use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use issac_client::terminal::format_sessions;
use issac_client::{
    AssistantApi, AudioInput, AudioInputConfig, AudioInputFactory, AudioSource, AuthClient,
    ChatOrchestrator, Config, CredentialStore, FileStore, HttpAssistantApi, TerminalSurface,
    VoiceCapture,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issac", version, about = "Terminal client for the ISSAC assistant")]
struct Cli {
    /// Configuration file (TOML/YAML/JSON); defaults to ./issac.* if present
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the assistant base URL
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in and store the access token
    Login {
        username: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// List cached chats
    Sessions,
    /// Search the assistant's documents
    Search { query: Vec<String> },
    /// Interactive chat
    Chat {
        /// Open an existing chat by id
        #[arg(long)]
        session: Option<String>,
    },
    /// Send a recorded WAV file as one voice turn
    Voice {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("issac_client=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cfg = Config::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        cfg.server.base_url = server;
    }
    info!("Using assistant at {}", cfg.server.base_url);

    let store = FileStore::open(cfg.storage_dir())?;
    let credentials = CredentialStore::new(Arc::new(store));

    match cli.command {
        Command::Register { username, password } => {
            let password = password_or_prompt(password).await?;
            let auth = AuthClient::new(&cfg.server.base_url, cfg.request_timeout(), credentials)?;
            let msg = auth.register(&username, &password).await?;
            println!("{}", msg);
        }
        Command::Login { username, password } => {
            let password = password_or_prompt(password).await?;
            let auth = AuthClient::new(&cfg.server.base_url, cfg.request_timeout(), credentials)?;
            auth.login(&username, &password).await?;
            println!("Logged in as {}.", username.trim());
        }
        Command::Logout => {
            credentials.clear()?;
            println!("Logged out.");
        }
        Command::Sessions => {
            let (chat, _) = open_chat(&cfg, credentials)?;
            let sessions = chat.sessions();
            if sessions.is_empty() {
                println!("No chats yet.");
            }
            for row in format_sessions(&sessions, None) {
                println!("{}", row);
            }
        }
        Command::Search { query } => {
            let api = HttpAssistantApi::new(&cfg.server.base_url, cfg.request_timeout(), credentials)?;
            for (i, snippet) in api.search(&query.join(" ")).await?.iter().enumerate() {
                println!("[{}] {}", i + 1, snippet);
            }
        }
        Command::Chat { session } => {
            let (mut chat, api) = open_chat(&cfg, credentials)?;
            if let Some(input) = microphone(&cfg) {
                chat = chat.with_voice(VoiceCapture::new(input));
            }
            chat.init().await;
            if let Some(id) = session {
                chat.switch_session(&id).await;
            }
            repl(chat, api.as_ref(), &cfg).await?;
        }
        Command::Voice { file, session } => {
            let (mut chat, _) = open_chat(&cfg, credentials)?;
            if let Some(id) = session {
                chat.switch_session(&id).await;
            }
            send_file(&mut chat, &cfg, file).await?;
        }
    }

    Ok(())
}

fn open_chat(
    cfg: &Config,
    credentials: CredentialStore,
) -> Result<(ChatOrchestrator, Arc<HttpAssistantApi>)> {
    if !credentials.is_authenticated() {
        bail!("Not logged in. Run `issac login <username>` first.");
    }
    let api = Arc::new(HttpAssistantApi::new(
        &cfg.server.base_url,
        cfg.request_timeout(),
        credentials.clone(),
    )?);
    let chat = ChatOrchestrator::new(
        api.clone(),
        credentials,
        Box::new(TerminalSurface::stdout()),
    )?;
    Ok((chat, api))
}

fn microphone(cfg: &Config) -> Option<Box<dyn AudioInput>> {
    let source = AudioSource::Microphone {
        device: cfg.audio.device.clone(),
    };
    match AudioInputFactory::create(source, AudioInputConfig::from(&cfg.audio)) {
        Ok(input) => Some(input),
        Err(e) => {
            debug!("Voice input disabled: {:#}", e);
            None
        }
    }
}

/// Send a WAV file as one voice turn
async fn send_file(chat: &mut ChatOrchestrator, cfg: &Config, file: PathBuf) -> Result<()> {
    let source = AudioSource::File(file);
    let input = AudioInputFactory::create(source, AudioInputConfig::from(&cfg.audio))?;
    chat.send_recording(input).await;
    Ok(())
}

const HELP: &str = "\
commands:
  <text>            send a message
  /new <name>       start a new chat
  /sessions         list chats
  /switch <n>       open chat number n
  /voice            start/stop recording from the microphone
  /voice <file>     send a WAV file as a voice turn
  /search <query>   search documents
  /logout           sign out and exit
  /quit             exit";

async fn repl(mut chat: ChatOrchestrator, api: &dyn AssistantApi, cfg: &Config) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, arg) = match line.split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/new" => {
                if arg.is_empty() {
                    println!("usage: /new <name>");
                } else {
                    chat.create_session(arg);
                }
            }
            "/sessions" => {
                for row in format_sessions(&chat.sessions(), chat.current_session_id()) {
                    println!("{}", row);
                }
            }
            "/switch" => {
                let sessions = chat.sessions();
                let picked = arg
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| sessions.get(i));
                match picked {
                    Some(session) => match session.id.clone() {
                        Some(id) => chat.switch_session(&id).await,
                        None => chat.select_pending(),
                    },
                    None => println!("usage: /switch <n> (see /sessions)"),
                }
            }
            "/voice" if arg.is_empty() => chat.send_voice().await,
            "/voice" => {
                if let Err(e) = send_file(&mut chat, cfg, PathBuf::from(arg)).await {
                    eprintln!("! {:#}", e);
                }
            }
            "/search" => {
                match api.search(arg).await {
                    Ok(results) => {
                        for (i, snippet) in results.iter().enumerate() {
                            println!("[{}] {}", i + 1, snippet);
                        }
                    }
                    Err(e) => eprintln!("! {}", e.user_message()),
                }
            }
            "/logout" => {
                chat.logout().context("Failed to clear credentials")?;
                return Ok(());
            }
            c if c.starts_with('/') => println!("unknown command {} (/help lists commands)", c),
            _ => chat.send_text(line).await,
        }

        let mut stdout = tokio::io::stdout();
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Password: ").await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    Ok(lines.next_line().await?.unwrap_or_default())
}
