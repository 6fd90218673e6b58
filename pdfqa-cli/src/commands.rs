//! Command-line interface and command handlers.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pdfqa_rag::{Answer, IngestReport};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::app::App;
use crate::settings::Settings;

/// Ask questions about your PDF documents.
#[derive(Parser, Debug)]
#[command(name = "pdfqa", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Extract, chunk, and index one or more documents
    Ingest {
        /// PDF, .txt or .md files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Answer a single question
    Ask {
        question: String,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively
    Chat,
    /// Show how many chunks are indexed
    Status,
    /// Remove every indexed chunk
    Clear,
}

/// Run `cli` against a pipeline built from the environment.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::from_env().context("invalid configuration")?;
    let app = App::from_settings(&settings).await.context("failed to initialize pipeline")?;

    match cli.command {
        Command::Ingest { files } => ingest(&app, &files).await,
        Command::Ask { question, json } => ask(&app, &question, json).await,
        Command::Chat => chat(&app).await,
        Command::Status => {
            let count = app.status().await?;
            println!("{count} chunks indexed in collection '{}'", app.collection());
            println!("answers by: {}", app.generator_description());
            Ok(())
        }
        Command::Clear => {
            app.clear().await?;
            println!("Cleared collection '{}'.", app.collection());
            Ok(())
        }
    }
}

async fn ingest(app: &App, files: &[PathBuf]) -> anyhow::Result<()> {
    let mut failed = 0;
    for file in files {
        match app.ingest(file).await {
            Ok(report) => println!("{}", format_report(&report)),
            Err(e) if e.is_recoverable() => {
                warn!(path = %file.display(), error = %e, "skipping file");
                eprintln!("{}: {e}", file.display());
                failed += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("failed to ingest {}", file.display())),
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} files could not be ingested", files.len());
    }
    Ok(())
}

async fn ask(app: &App, question: &str, json: bool) -> anyhow::Result<()> {
    let answer = app.ask(question).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        println!("{}", format_answer(&answer));
    }
    Ok(())
}

async fn chat(app: &App) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    println!("Ask about your documents. Type 'exit' or press Ctrl-D to quit.");
    loop {
        let line = match editor.readline("pdfqa> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit") {
            break;
        }
        editor.add_history_entry(question)?;
        match app.ask(question).await {
            Ok(answer) => println!("{}\n", format_answer(&answer)),
            Err(e) => eprintln!("error: {e}\n"),
        }
    }
    Ok(())
}

/// Render an ingestion report the way the upload endpoint reported it.
pub fn format_report(report: &IngestReport) -> String {
    format!(
        "Document uploaded and processed successfully\n  file:   {}\n  pages:  {}\n  chunks: {}",
        report.filename, report.pages_processed, report.chunks_indexed
    )
}

/// Render an answer followed by its numbered sources.
pub fn format_answer(answer: &Answer) -> String {
    let mut out = answer.text.clone();
    if !answer.sources.is_empty() {
        out.push_str("\n\nSources:");
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!("\n  [{}] {}", i + 1, source.replace('\n', " ")));
        }
    }
    out
}
