use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{info, warn};

use line_chat::{
    cli::Cli,
    config::SessionConfig,
    session::{Connection, SessionEnd, Username},
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn wait_for_ctrl_c() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
}

async fn run(cli: &Cli) -> Result<SessionEnd> {
    let config = SessionConfig::from(cli);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    let mut session = Connection::connect(&config)
        .await?
        .start(tokio::io::stdout());

    let username = match &cli.username {
        Some(username) => username.clone(),
        None => match session
            .prompt_username(&mut stdin, &mut stdout, wait_for_ctrl_c())
            .await
            .context("failed to read username")?
        {
            Username::Entered(username) => username,
            Username::Ended(end) => return Ok(session.close(end).await?),
        },
    };

    session
        .register(&username)
        .await
        .context("failed to register username")?;
    info!(peer = %session.peer_addr(), username = session.username(), "relaying");

    let end = session.relay(stdin, stdout, wait_for_ctrl_c()).await?;
    Ok(end)
}

// The process is ended explicitly: a console read may still be parked on tokio's blocking
// stdin thread, which would otherwise keep the runtime from shutting down.
#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    match run(&cli).await {
        Ok(SessionEnd::PeerClosed) => process::exit(0),
        Ok(end) => {
            info!(?end, "leaving chat");
            println!("\nBye.");
            process::exit(0);
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            process::exit(1);
        }
    }
}
