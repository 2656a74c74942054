use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use heritage_rag::workflow::{LlmGenerator, LlmGrader, LlmRewriter};
use heritage_rag::{
    AskError, Components, Config, FlatIndex, OllamaClient, ScriptIdentifier, Workflow,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type HeritageWorkflow = Workflow<
    ScriptIdentifier,
    OllamaClient,
    Arc<FlatIndex>,
    LlmGrader<OllamaClient>,
    LlmGenerator<OllamaClient>,
    LlmRewriter<OllamaClient>,
>;

/// Ask questions about the heritage knowledge base in Arabic or English.
#[derive(Parser, Debug)]
#[command(name = "heritage-rag", version)]
struct Cli {
    /// Path to the JSON passage index (overrides RAG_INDEX_PATH).
    #[arg(long)]
    index: Option<PathBuf>,

    /// Passages retrieved per attempt (overrides RAG_TOP_K).
    #[arg(long)]
    top_k: Option<usize>,

    /// Maximum retrieval attempts per question (overrides RAG_MAX_ATTEMPTS).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Print each attempt's query and relevance counts before the answer.
    #[arg(long)]
    verbose: bool,

    /// List the passages an answer was grounded on after the answer.
    #[arg(long)]
    sources: bool,

    /// Question to answer; reads questions line by line from stdin when empty.
    #[arg(trailing_var_arg = true)]
    question: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("heritage_rag=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.index.clone() {
        config.index_path = path;
    }
    if let Some(k) = cli.top_k {
        config.settings.top_k = k;
    }
    if let Some(n) = cli.max_attempts {
        config.settings.max_attempts = n;
    }

    let workflow = build_workflow(&config)?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received Ctrl+C, cancelling");
        shutdown.cancel();
    });

    if !cli.question.is_empty() {
        let question = cli.question.join(" ");
        if !answer(&workflow, &question, &cancel, &cli).await {
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(question) = next_question(&mut lines, &cancel).await? {
        answer(&workflow, &question, &cancel, &cli).await;
    }
    Ok(())
}

/// Next non-empty trimmed line, or `None` on EOF or once `cancel` fires, even
/// while blocked waiting for input.
async fn next_question<R>(
    lines: &mut Lines<R>,
    cancel: &CancellationToken,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(None),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(None);
        };
        let question = line.trim();
        if !question.is_empty() {
            return Ok(Some(question.to_string()));
        }
    }
}

fn build_workflow(config: &Config) -> Result<HeritageWorkflow, Box<dyn std::error::Error>> {
    let index = Arc::new(FlatIndex::load(&config.index_path)?);
    let http = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;
    let ollama = OllamaClient::new(http, &config.ollama)?;

    let passages = index.len();
    let parts = Components {
        identifier: ScriptIdentifier,
        encoder: ollama.clone(),
        index,
        grader: LlmGrader::new(ollama.clone()),
        generator: LlmGenerator::new(ollama.clone()),
        rewriter: LlmRewriter::new(ollama),
    };
    let workflow = Workflow::new(parts, config.settings.clone())?;

    let settings = workflow.settings();
    info!(
        passages,
        top_k = settings.top_k,
        max_attempts = settings.max_attempts,
        chat_model = %config.ollama.chat_model,
        embed_model = %config.ollama.embed_model,
        "heritage-rag ready"
    );
    Ok(workflow)
}

/// Prints the answer to stdout or the failure to stderr; returns whether a
/// text (answer or not-found message) was produced.
async fn answer(
    workflow: &HeritageWorkflow,
    question: &str,
    cancel: &CancellationToken,
    cli: &Cli,
) -> bool {
    match workflow.run(question, cancel).await {
        Ok(report) => {
            if cli.verbose {
                for (n, attempt) in report.attempts.iter().enumerate() {
                    eprintln!(
                        "attempt {}: {:?} -> {}/{} relevant",
                        n + 1,
                        attempt.query,
                        attempt.relevant_count(),
                        attempt.passages.len()
                    );
                }
            }
            println!("{}", report.outcome.text());
            let sources = report.sources();
            if cli.sources && !sources.is_empty() {
                println!("\nSources:");
                for line in sources {
                    println!("  {line}");
                }
            }
            true
        }
        Err(AskError::Cancelled) => {
            eprintln!("cancelled");
            false
        }
        Err(e) => {
            error!(error = %e, "question failed");
            let hint = if e.is_transient() {
                " (temporary, try again)"
            } else {
                ""
            };
            eprintln!("error: {e}{hint}");
            false
        }
    }
}
