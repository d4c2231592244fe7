//! sqlchat - Chat with a SQL database from your terminal.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::info;

use sqlchat::agent::{AgentEvent, MockResponder, Responder};
use sqlchat::app::{ChatContext, InputResult};
use sqlchat::cli::Cli;
use sqlchat::config::DatabaseConfig;
use sqlchat::db::HandleCache;
use sqlchat::error::{ChatError, Result};
use sqlchat::{logging, tui};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    if let Err(message) = cli.validate_headless() {
        eprintln!("{message}");
        std::process::exit(2);
    }

    let result = if cli.is_headless() {
        // stderr logging keeps stdout clean for the answer
        logging::init_stderr_logging();
        run_headless(&cli).await
    } else {
        logging::init_file_logging();
        tui::run(&cli).await
    };

    if let Err(e) = result {
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

/// Answers a single question and prints the result to stdout.
async fn run_headless(cli: &Cli) -> Result<()> {
    let question = cli
        .question
        .as_deref()
        .ok_or_else(|| ChatError::internal("Headless mode without a question"))?;

    let handles = Arc::new(Mutex::new(HandleCache::new()));

    let mut context = if cli.mock_agent {
        let responder: Arc<dyn Responder> = Arc::new(MockResponder::new(
            "This is the mock responder; no model or database was used.",
        ));
        ChatContext::with_responder(responder, "mock responder".to_string())
    } else {
        let config = cli
            .to_database_config()
            .unwrap_or_else(DatabaseConfig::local_default);
        let credential = cli
            .credential()
            .ok_or_else(|| ChatError::config("A Groq API key is required"))?;

        info!("Connecting to {}", config.display_string());
        ChatContext::create(&handles, &config, &credential, &cli.model).await?
    };

    // Progress goes to stderr while the answer is pending
    let (tx, mut rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                AgentEvent::Thinking(_) => {}
                AgentEvent::Sql(sql) => eprintln!("query: {sql}"),
                AgentEvent::Executing => eprintln!("running query..."),
                AgentEvent::Rows(n) => eprintln!("{n} row(s)"),
            }
        }
    });

    let result = context.handle_input(question, &tx).await;
    drop(tx);
    let _ = printer.await;

    match result? {
        InputResult::Answered => {
            if let Some(message) = context.store().messages().last() {
                println!("{}", message.content);
            }
        }
        InputResult::Notice(text) => println!("{text}"),
        InputResult::None | InputResult::Exit => {}
    }

    handles.lock().await.evict().await;
    Ok(())
}
