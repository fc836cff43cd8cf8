use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;

mod dedup;
mod feed;
mod fetch;
mod fingerprint;
mod init;
mod normalize;
mod parse;
mod poll;
mod telemetry;

#[derive(Parser)]
#[command(name = "groupfeeder", about = "Feed ingestion and deduplication CLI")]
struct Cli {
    #[arg(global = true, short, long)]
    dsn: Option<String>,
    /// Emit a single JSON envelope to stdout; logs go to stderr
    #[arg(global = true, long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Init(init::InitCmd),
    Feed(feed::FeedCmd),
    Fetch(fetch::FetchCmd),
    Poll(poll::PollCmd),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    telemetry::config::set_json_mode(cli.json);

    // logging/tracing on stderr; respects RUST_LOG and GROUPFEEDER_LOG_FORMAT
    telemetry::config::init_tracing();

    let dsn = cli
        .dsn
        .or_else(|| env::var("DATABASE_URL").ok())
        .expect("Please provide --dsn or set DATABASE_URL in .env");

    let pool = PgPoolOptions::new().max_connections(5).connect(&dsn).await?;

    match cli.command {
        Commands::Init(args) => init::run(&pool, args).await?,
        Commands::Feed(args) => feed::run(&pool, args).await?,
        Commands::Fetch(args) => fetch::run(&pool, args).await?,
        Commands::Poll(args) => poll::run(&pool, args).await?,
    }

    Ok(())
}
