//! Operator CLI: ingest, delete and ask against the configured services.

use std::path::PathBuf;

use ai_llm_service::telemetry;
use anyhow::{Context, Result};
use api::AppState;
use clap::{Args, Parser, Subcommand};
use colored::*;
use contextor::{AnswerFilter, Confidence};
use rag_store::{DocumentRef, IndicatifProgress, IngestRequest};

#[derive(Parser)]
#[command(name = "syllabus-cli")]
#[command(about = "Manage syllabus ingestion and ask questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest one syllabus document, replacing its previous version
    Ingest {
        #[command(flatten)]
        document: DocumentArg,
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        course_code: Option<String>,
        #[arg(long)]
        semester: Option<String>,
    },
    /// Delete every vector of one department and year
    Delete {
        #[command(flatten)]
        scope: Scope,
    },
    /// Ask a question against one department and year
    Ask {
        #[command(flatten)]
        scope: Scope,
        #[arg(long)]
        semester: Option<String>,
        question: String,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DocumentArg {
    /// PDF or text document URL
    #[arg(long)]
    url: Option<String>,
    /// Local PDF or text file
    #[arg(long)]
    file: Option<PathBuf>,
}

impl DocumentArg {
    fn into_ref(self) -> Result<DocumentRef> {
        match (self.url, self.file) {
            (Some(url), _) => Ok(DocumentRef::Url(url)),
            (None, Some(file)) => Ok(DocumentRef::Path(file)),
            (None, None) => anyhow::bail!("either --url or --file is required"),
        }
    }
}

#[derive(Args)]
struct Scope {
    #[arg(long)]
    dept: String,
    #[arg(long)]
    year: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init("warn").context("installing tracing subscriber")?;

    let state = AppState::from_env()
        .await
        .context("starting services from environment")?;

    match cli.command {
        Command::Ingest {
            document,
            scope,
            course_code,
            semester,
        } => {
            let req = IngestRequest {
                document: document.into_ref()?,
                dept: scope.dept,
                year: scope.year,
                course_code,
                semester,
            };
            let progress = IndicatifProgress::for_document(req.document.source_id());
            let result = state.store.ingestion().ingest(&req, &progress).await?;
            println!(
                "{} {} chunks, {} vectors stored for {}",
                "ingested".green().bold(),
                result.chunks_processed,
                result.vectors_stored,
                req.document.source_id()
            );
        }
        Command::Delete { scope } => {
            let deleted = state
                .store
                .ingestion()
                .delete(&scope.dept, &scope.year)
                .await?;
            println!(
                "{} {deleted} vectors for {} {}",
                "deleted".yellow().bold(),
                scope.dept,
                scope.year
            );
        }
        Command::Ask {
            scope,
            semester,
            question,
        } => {
            let filter = AnswerFilter {
                dept: scope.dept,
                year: scope.year,
                semester,
            };
            let res = state.answers.answer(&question, &filter).await?;
            let confidence = match res.confidence {
                Confidence::High => "high".green(),
                Confidence::Medium => "medium".yellow(),
                Confidence::Low => "low".red(),
            };
            println!("{}\n", res.answer);
            println!("{} {}", "confidence:".bold(), confidence.bold());
            for s in &res.sources {
                println!(
                    "  {:.3}  {} #{}  {}",
                    s.score,
                    s.source.cyan(),
                    s.chunk_index,
                    s.section.dimmed()
                );
            }
        }
    }

    Ok(())
}
