use clap::Parser;
use uno_chat::uno_game::api;

/// UNO rules engine with a chat-style HTTP bridge.
#[derive(Parser)]
#[command(name = "uno-chat")]
struct Args {
    /// Address to bind the HTTP bridge to.
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    tracing::info!("starting uno-chat on {}", args.listen);

    api::start_api_server(&args.listen).await
}
