use clap::{Parser, Subcommand};
use nanbot::channels::text_payload;
use nanbot::delivery::{DeliveryClient, RetryPolicy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "nanbot")]
#[command(about = "ÑanBot WhatsApp assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory with a default config.json and the bundled catalog.json.
    Init {
        /// Config file path (default: NANBOT_CONFIG_PATH or ~/.nanbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the webhook server and answer inbound messages.
    Serve {
        /// Config file path (default: NANBOT_CONFIG_PATH or ~/.nanbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one text message through the retrying delivery path (smoke test for credentials).
    Send {
        /// Config file path (default: NANBOT_CONFIG_PATH or ~/.nanbot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Recipient phone number, international format without '+'
        #[arg(long, value_name = "NUMBER")]
        to: String,

        /// Message body
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("nanbot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send { config, to, text }) => {
            if let Err(e) = run_send(config, &to, &text).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(nanbot::config::default_config_path);
    let dir = nanbot::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = nanbot::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting webhook on {}:{}",
        config.server.bind,
        config.server.port
    );
    nanbot::webhook::run_server(config, path).await
}

async fn run_send(config_path: Option<PathBuf>, to: &str, text: &str) -> anyhow::Result<()> {
    let (config, _) = nanbot::config::load_config(config_path)?;
    let client = DeliveryClient::from_config(&config);
    let payload = text_payload(to, text)?;
    let response = client
        .send(&payload, RetryPolicy::send_from_config(&config.delivery))
        .await?;
    let id = response
        .pointer("/messages/0/id")
        .and_then(|v| v.as_str())
        .unwrap_or("(no id)");
    println!("sent {}", id);
    log::debug!("response: {}", serde_json::to_string(&response)?);
    Ok(())
}
