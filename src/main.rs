//! # docchat CLI
//!
//! Terminal interface for chatting with a single document.
//!
//! ## Usage
//!
//! ```bash
//! docchat --config ./config/docchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat ingest` | Load, chunk, and index the configured document |
//! | `docchat chunks` | Print the ingested chunks in ingestion order |
//! | `docchat search "<pattern>"` | Lexical search over the chunks |
//! | `docchat ask "<question>"` | Ask one question and print the answer |
//! | `docchat chat` | Interactive chat loop (`q` to quit) |
//!
//! The OpenAI API key is read from the `OPENAI_API_KEY` environment variable
//! (a `.env` file is honored).

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docchat::config;
use docchat::lexical::MatchMode;
use docchat::models::Answer;
use docchat::session::RagSession;

/// docchat — chat with a document from the terminal.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Chat with a document: ingest, search, and ask questions with retrieval-augmented generation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, chunk, and index the configured document.
    ///
    /// With a sqlite store backend the vectors persist across runs;
    /// re-ingesting the same document overwrites rather than duplicates.
    Ingest,

    /// Print the ingested chunks in ingestion order.
    Chunks,

    /// Lexical search over the ingested chunks.
    ///
    /// Case-insensitive substring match by default; `--regex` switches to
    /// unanchored regular-expression matching.
    Search {
        /// Substring or regular expression to look for.
        pattern: String,

        /// Interpret the pattern as a regular expression.
        #[arg(long)]
        regex: bool,
    },

    /// Ask a single question about the document.
    Ask {
        /// The question.
        question: String,
    },

    /// Interactive chat loop. Type `q` to quit.
    Chat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let mut session = RagSession::from_config(cfg).await?;

    match cli.command {
        Commands::Ingest => {
            let summary = session.ingest().await?;
            println!(
                "Ingested '{}': {} pages, {} chunks ({} indexed).",
                summary.document_id, summary.page_count, summary.chunk_count, summary.indexed
            );
        }
        Commands::Chunks => {
            session.ingest().await?;
            for chunk in session.chunks() {
                println!(
                    "[{}] page {} offset {}",
                    chunk.id, chunk.page_number, chunk.offset_in_page
                );
                println!("{}\n", chunk.text);
            }
        }
        Commands::Search { pattern, regex } => {
            session.ingest().await?;
            let mode = if regex {
                MatchMode::Regex
            } else {
                MatchMode::Literal
            };
            let matches = session.textual_search(&pattern, mode)?;
            if matches.is_empty() {
                println!("No matches.");
            }
            for chunk in matches {
                println!("[{}] page {}", chunk.id, chunk.page_number);
                println!("{}\n", chunk.text);
            }
        }
        Commands::Ask { question } => {
            session.ingest().await?;
            let answer = session.ask(&question).await?;
            print_answer(&answer);
        }
        Commands::Chat => {
            let summary = session.ingest().await?;
            println!(
                "Chatting with '{}' ({} chunks). Type q to quit.",
                summary.document_id, summary.chunk_count
            );
            run_chat_loop(&mut session).await?;
        }
    }

    Ok(())
}

async fn run_chat_loop(session: &mut RagSession) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "q" {
            break;
        }

        match session.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    if !answer.context.is_empty() {
        let mut pages: Vec<usize> = answer.context.iter().map(|c| c.page_number).collect();
        pages.sort_unstable();
        pages.dedup();
        let pages: Vec<String> = pages.iter().map(|p| p.to_string()).collect();
        println!("(sources: page {})", pages.join(", "));
    }
}
