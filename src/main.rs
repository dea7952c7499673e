use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagepilot::cli::{self, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let outcome = cli::run(Cli::parse()).await;

    // stdout carries exactly one line: the structured outcome. Logs go to
    // stderr so callers can parse this.
    match serde_json::to_string(&outcome) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize outcome: {e}"),
    }
    std::process::exit(outcome.exit_code());
}
