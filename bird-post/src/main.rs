//! bird-post - Publish a post to Twitter/X

use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use libbirdcast::publisher::{INVALID_CREDENTIALS_MESSAGE, NOT_CONFIGURED_MESSAGE, UNAUTHORIZED_MESSAGE};
use libbirdcast::{AccountStatus, BirdcastError, Config, PublishResult, Publisher, Result};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bird-post")]
#[command(version)]
#[command(about = "Publish a post to Twitter/X", long_about = None)]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Media to attach: URL, file:// reference or local path
    #[arg(short, long)]
    media: Option<String>,

    /// Check the configured account instead of posting
    #[arg(long)]
    status: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (defaults to $BIRDCAST_CONFIG or the XDG config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    libbirdcast::logging::init_with_verbosity(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let publisher = Publisher::from_config(&config)?;

    if cli.status {
        let status = publisher.get_status().await;
        print_status(&status, cli.format)?;
        return Ok(status_exit_code(&status));
    }

    let content = read_content(cli.content)?;

    if !publisher.is_configured() {
        return Err(BirdcastError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()));
    }

    let result = publisher.post(&content, cli.media.as_deref()).await;
    print_result(&result, cli.format)?;
    Ok(publish_exit_code(&result))
}

/// Take content from the argument, or stdin when it is piped
fn read_content(arg: Option<String>) -> Result<String> {
    match arg {
        Some(content) => check_content(content),
        None if !std::io::stdin().is_terminal() => {
            debug!("Reading content from stdin");
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| BirdcastError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
            check_content(strip_final_newline(buffer))
        }
        None => Err(BirdcastError::InvalidInput(
            "No content provided. Pass it as an argument or pipe it to stdin.".to_string(),
        )),
    }
}

/// Reject blank content; the text itself is published as given
fn check_content(content: String) -> Result<String> {
    if content.trim().is_empty() {
        return Err(BirdcastError::InvalidInput(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(content)
}

/// Drop the single line terminator `echo` and editors leave on piped input
fn strip_final_newline(mut content: String) -> String {
    if content.ends_with('\n') {
        content.pop();
        if content.ends_with('\r') {
            content.pop();
        }
    }
    content
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| BirdcastError::Publish(e.to_string()))
}

fn print_result(result: &PublishResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(result)?),
        OutputFormat::Text => {
            if let Some(warning) = &result.media_warning {
                eprintln!("Warning: {}", warning);
            }
            match (&result.post_url, &result.error) {
                (Some(url), _) if result.success => println!("{}", url),
                (_, Some(error)) => eprintln!("Error: {}", error),
                _ => eprintln!("Error: publish failed"),
            }
        }
    }
    Ok(())
}

fn print_status(status: &AccountStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", to_json(status)?),
        OutputFormat::Text if status.connected => {
            println!(
                "Connected as @{}",
                status.username.as_deref().unwrap_or_default()
            );
            if let (Some(followers), Some(following)) =
                (status.followers_count, status.following_count)
            {
                println!("{} followers, {} following", followers, following);
            }
        }
        OutputFormat::Text => {
            println!(
                "Not connected: {}",
                status.error.as_deref().unwrap_or("unknown error")
            );
            if let Some(keys) = &status.required_keys {
                println!("Required: {}", keys.join(", "));
            }
        }
    }
    Ok(())
}

fn publish_exit_code(result: &PublishResult) -> i32 {
    match result.error.as_deref() {
        _ if result.success => 0,
        Some(UNAUTHORIZED_MESSAGE) => 2,
        _ => 1,
    }
}

fn status_exit_code(status: &AccountStatus) -> i32 {
    if status.connected {
        0
    } else if status.required_keys.is_some()
        || status.error.as_deref() == Some(INVALID_CREDENTIALS_MESSAGE)
    {
        2
    } else {
        1
    }
}
