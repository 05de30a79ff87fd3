//! vidchat: command-line front end for the video chat backend.
//! Asks questions (streaming the answer), exports chat history and lists videos.

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vidchat_client::api::{ChatMessage, ChatRequest, ChatSummary, VideoQuery};
use vidchat_client::{ApiClient, ApiError, ChatCallbacks, ConfigManager};

const USAGE: &str = "\
Usage: vidchat [--config <path>] <command>

Commands:
  ask [--group <id> | --share <token>] <question...>   Ask a question, streaming the answer
  export <group_id> [--dir <path>]                     Save a group's chat history as CSV
  videos                                               List videos

Environment:
  VIDCHAT_CONFIG                        Config file path
  VIDCHAT_USERNAME, VIDCHAT_PASSWORD    Log in before running the command
  VIDCHAT_API_URL, VIDCHAT_APP_URL      Override configured URLs";

#[derive(Debug, PartialEq)]
enum Scope {
    All,
    Group(i64),
    Share(String),
}

#[derive(Debug, PartialEq)]
enum Command {
    Ask { scope: Scope, question: String },
    Export { group_id: i64, dir: Option<PathBuf> },
    Videos,
}

#[derive(Debug, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    command: Command,
}

fn flag_value(args: &mut Vec<String>, flag: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{flag} needs a value");
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn parse_args(mut args: Vec<String>) -> Result<Args> {
    let config = flag_value(&mut args, "--config")?.map(PathBuf::from);

    if args.is_empty() {
        bail!("missing command");
    }
    let command = match args.remove(0).as_str() {
        "ask" => {
            let group = flag_value(&mut args, "--group")?;
            let share = flag_value(&mut args, "--share")?;
            let scope = match (group, share) {
                (Some(_), Some(_)) => bail!("--group and --share are mutually exclusive"),
                (Some(id), None) => Scope::Group(id.parse().context("--group must be a number")?),
                (None, Some(token)) => Scope::Share(token),
                (None, None) => Scope::All,
            };
            let question = args.join(" ");
            if question.trim().is_empty() {
                bail!("no question given");
            }
            Command::Ask { scope, question }
        }
        "export" => {
            let dir = flag_value(&mut args, "--dir")?.map(PathBuf::from);
            let group_id = args
                .first()
                .context("missing group id")?
                .parse()
                .context("group id must be a number")?;
            Command::Export { group_id, dir }
        }
        "videos" => Command::Videos,
        other => bail!("unknown command: {other}"),
    };

    Ok(Args { config, command })
}

fn load_config(path: Option<PathBuf>) -> Result<ConfigManager> {
    // --config, then VIDCHAT_CONFIG, then the default location
    match path.or_else(|| std::env::var_os("VIDCHAT_CONFIG").map(PathBuf::from)) {
        Some(path) => Ok(ConfigManager::from_path(path)),
        None => ConfigManager::new(),
    }
}

async fn ask(client: &ApiClient, scope: Scope, question: String) -> Result<()> {
    let messages = vec![ChatMessage::user(question)];
    let request = match scope {
        Scope::All => ChatRequest::new(messages),
        Scope::Group(id) => ChatRequest::for_group(messages, id),
        Scope::Share(token) => ChatRequest::for_share(messages, token),
    };

    let mut failure: Option<ApiError> = None;
    let mut summary: Option<ChatSummary> = None;
    {
        let mut handler = ChatCallbacks {
            on_token: |content: &str| {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "{content}");
                let _ = out.flush();
            },
            on_done: |done: ChatSummary| summary = Some(done),
            on_error: |error: ApiError| failure = Some(error),
        };
        client
            .chat_stream(&request, &mut handler, &client.cancellation_token())
            .await;
    }
    println!();

    if let Some(error) = failure {
        return Err(error.into());
    }
    if let Some(summary) = summary {
        if !summary.related_videos.is_empty() {
            println!("\nRelated videos:");
            for video in &summary.related_videos {
                println!("  [{}] {}", video.video_id, video.title);
            }
        }
    }
    Ok(())
}

async fn run(client: &ApiClient, command: Command) -> Result<()> {
    match command {
        Command::Ask { scope, question } => ask(client, scope, question).await,
        Command::Export { group_id, .. } => {
            let path = client.export_chat_history(group_id).await?;
            println!("Saved {}", path.display());
            Ok(())
        }
        Command::Videos => {
            for video in client.list_videos(&VideoQuery::default()).await? {
                println!(
                    "{:>6}  {:<12}  {}",
                    video.id,
                    video.status.as_deref().unwrap_or("-"),
                    video.title
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match parse_args(std::env::args().skip(1).collect()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e:#}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let manager = load_config(args.config)?;
    let mut config = manager.get();
    if let Command::Export { dir: Some(dir), .. } = &args.command {
        config.download_dir = Some(dir.clone());
    }
    tracing::debug!(path = %manager.path().display(), api = %config.api_base_url, "Configuration loaded");

    let client = ApiClient::new(&config)?;

    let interrupt = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling");
            interrupt.shutdown();
        }
    });

    if let (Ok(username), Ok(password)) = (
        std::env::var("VIDCHAT_USERNAME"),
        std::env::var("VIDCHAT_PASSWORD"),
    ) {
        client
            .login(&username, &password)
            .await
            .context("Login failed")?;
    }

    run(&client, args.command).await
}
