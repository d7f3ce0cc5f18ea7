use clap::Parser;
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;

use wikichat::core::config::{self, CliOverrides};
use wikichat::tui;

#[derive(Parser)]
#[command(name = "wikichat", about = "Streaming chat client for a knowledge-base backend")]
struct Args {
    /// Backend API root, e.g. http://localhost:3000/api
    #[arg(long)]
    base_url: Option<String>,

    /// Model name sent with every prompt
    #[arg(short, long)]
    model: Option<String>,

    /// Model provider sent with every prompt
    #[arg(short, long)]
    provider: Option<String>,

    /// Open this conversation on start
    #[arg(short, long)]
    conversation: Option<String>,

    /// Let the backend search online
    #[arg(long)]
    online: bool,

    /// Ask for extended reasoning
    #[arg(long)]
    deep_think: bool,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            base_url: args.base_url,
            model: args.model,
            provider: args.provider,
            conversation: args.conversation,
            online: args.online,
            deep_think: args.deep_think,
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to wikichat.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = File::create("wikichat.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = config::load_config().unwrap_or_else(|e| {
        log::warn!("Falling back to default config: {}", e);
        config::WikichatConfig::default()
    });
    let resolved = config::resolve(&file_config, &CliOverrides::from(args));

    log::info!(
        "wikichat starting up against {} (model: {}/{})",
        resolved.base_url,
        resolved.model_provider,
        resolved.model_name
    );

    tui::run(resolved)
}
