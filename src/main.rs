//! quiz-game: a line-oriented TCP quiz
//!
//! The server asks a fixed sequence of questions to every client that
//! connects, grades each answer and reports a final score. The client
//! relays questions to the console and sends back what the operator types.
//!
//! Features:
//! - One independent session task per connection
//! - Address shared through a two-line `server_info.txt` file
//! - Configuration via CLI arguments or TOML file

mod address;
mod client;
mod config;
mod protocol;
mod quiz;
mod server;
mod session;

use address::ServerInfo;
use config::{Config, Mode};
use quiz::{QuestionBank, Score};
use server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match config.mode {
        Mode::Server => run_server(config),
        Mode::Client => run_client(config),
    };

    // Runtime failures are reported once here, after logging is up.
    if let Err(e) = result {
        error!(error = %e, "Exiting");
        std::process::exit(1);
    }
    Ok(())
}

/// Run the quiz server on a multi-threaded runtime
fn run_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let info = ServerInfo::resolve_for_server(&config.info_file);

    info!(
        host = %info.host,
        port = info.port,
        workers = ?config.workers,
        questions = config.questions.len(),
        "Starting quiz server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.worker_threads() {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build()?;

    let questions: QuestionBank = config.questions.into();
    runtime.block_on(serve(info, questions))
}

/// Bind and serve forever; a bind failure is fatal
async fn serve(
    info: ServerInfo,
    questions: QuestionBank,
) -> Result<(), Box<dyn std::error::Error>> {
    let server = info
        .socket_addr()
        .map_err(Box::<dyn std::error::Error>::from)
        .and_then(|addr| Server::bind(addr, questions).map_err(Into::into))
        .map_err(|e| format!("Failed to bind {}: {}", info, e))?;

    server.run().await?;
    Ok(())
}

/// Run the console client on a single-threaded runtime
fn run_client(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let info = ServerInfo::load_for_client(&config.info_file);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    match runtime.block_on(play(&info))? {
        Some(score) => info!(%score, "Quiz finished"),
        None => info!("Quiz finished"),
    }
    Ok(())
}

async fn play(info: &ServerInfo) -> Result<Option<Score>, client::ClientError> {
    let stream = client::connect(info).await?;
    println!("Connected to quiz server at {}", info);
    client::run(stream, tokio::io::stdin(), tokio::io::stdout()).await
}
