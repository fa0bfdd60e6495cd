//! Document QA Eval CLI
//!
//! Generates synthetic test sets against the document QA service and grades
//! its answers question by question.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_eval::{
    config::Config,
    eval::{
        DocumentSelection, EvaluationOrchestrator, FileTestSetProvider, ProgressSnapshot,
        RunEvent, TestSet, TestSetProvider,
    },
    persistence::{
        DEFAULT_REPORT_FILENAME, DEFAULT_TEST_SET_FILENAME, file_exists, load_report, save_report,
        save_test_set,
    },
    service::QaServiceClient,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Document QA Eval - grade a RAG question-answering service
#[derive(Parser)]
#[command(name = "docqa-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List documents indexed by the QA service
    Documents,

    /// Generate a test set and save it for later runs
    Generate {
        /// Documents to draw questions from
        #[arg(required = true)]
        documents: Vec<String>,

        /// Number of questions to request
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Output path for the test set
        #[arg(short, long, default_value = DEFAULT_TEST_SET_FILENAME)]
        output: PathBuf,
    },

    /// Run an evaluation
    Run {
        /// Documents to evaluate against
        #[arg(required = true)]
        documents: Vec<String>,

        /// Number of questions to request
        #[arg(short = 'n', long)]
        samples: Option<usize>,

        /// Replay a saved test set instead of generating one
        #[arg(long)]
        test_set: Option<PathBuf>,

        /// Per-question grading timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Save the report (.json, or .bin for binary)
        #[arg(short, long, default_value = DEFAULT_REPORT_FILENAME)]
        output: PathBuf,
    },

    /// Display a saved report
    Show {
        /// Path to the report file
        #[arg(default_value = DEFAULT_REPORT_FILENAME)]
        report: PathBuf,

        /// Output as JSON instead of formatted summary
        #[arg(long)]
        json: bool,
    },

    /// Test QA service connection
    Test,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Documents => cmd_documents().await,
        Commands::Generate {
            documents,
            samples,
            output,
        } => cmd_generate(documents, samples, output).await,
        Commands::Run {
            documents,
            samples,
            test_set,
            timeout,
            output,
        } => cmd_run(documents, samples, test_set, timeout, output).await,
        Commands::Show { report, json } => cmd_show(report, json),
        Commands::Test => cmd_test().await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "docqa_eval=debug" } else { "docqa_eval=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn cmd_documents() -> Result<()> {
    let config = load_config()?;
    let client = QaServiceClient::new(config.service);

    let documents = client
        .list_documents()
        .await
        .context("Failed to list documents")?;

    if documents.is_empty() {
        println!("No documents found.");
    } else {
        for doc in &documents {
            println!("{}", doc);
        }
    }

    Ok(())
}

async fn cmd_generate(
    documents: Vec<String>,
    samples: Option<usize>,
    output: PathBuf,
) -> Result<()> {
    let config = load_config()?;
    let selection = DocumentSelection::new(documents).context("Invalid document selection")?;
    let sample_count = samples.unwrap_or(config.evaluation.sample_count);
    if sample_count == 0 {
        anyhow::bail!("--samples must be at least 1");
    }

    println!("Generating {} questions from {}...", sample_count, selection);
    let client = QaServiceClient::new(config.service);
    let start = Instant::now();

    let items = tokio::time::timeout(
        config.evaluation.generate_timeout(),
        client.generate(&selection, sample_count),
    )
    .await
    .context("Test set generation timed out")?
    .context("Test set generation failed")?;

    if items.is_empty() {
        anyhow::bail!("The service returned no questions for {}", selection);
    }

    let test_set = TestSet::new(selection, items);
    save_test_set(&test_set, &output).context("Failed to save test set")?;

    println!(
        "Saved {} questions to {} in {:.2?}",
        test_set.len(),
        output.display(),
        start.elapsed()
    );

    Ok(())
}

async fn cmd_run(
    documents: Vec<String>,
    samples: Option<usize>,
    test_set: Option<PathBuf>,
    timeout: Option<u64>,
    output: PathBuf,
) -> Result<()> {
    let mut config = load_config()?;
    if let Some(secs) = timeout {
        config.evaluation.grade_timeout_secs = secs;
        config.validate().context("Invalid --timeout")?;
    }

    let selection = DocumentSelection::new(documents).context("Invalid document selection")?;
    let client = QaServiceClient::new(config.service.clone());

    println!("Evaluating against {}", selection);
    println!("Service: {}", config.service.api_base);

    match test_set {
        Some(path) => {
            let provider = FileTestSetProvider::load(&path)
                .with_context(|| format!("Failed to load test set {}", path.display()))?;
            let sample_count = samples.unwrap_or(provider.test_set().len());
            println!("Replaying test set: {}", path.display());
            execute(provider, client, config, selection, sample_count, output).await
        }
        None => {
            let sample_count = samples.unwrap_or(config.evaluation.sample_count);
            execute(client.clone(), client, config, selection, sample_count, output).await
        }
    }
}

async fn execute<P>(
    provider: P,
    client: QaServiceClient,
    config: Config,
    selection: DocumentSelection,
    sample_count: usize,
    output: PathBuf,
) -> Result<()>
where
    P: TestSetProvider + 'static,
{
    println!(
        "Requesting {} questions (grading timeout {}s)...\n",
        sample_count, config.evaluation.grade_timeout_secs
    );

    let orchestrator = Arc::new(EvaluationOrchestrator::new(
        provider,
        client,
        config.evaluation,
    ));
    let mut handle = orchestrator.start_run(selection, sample_count);
    let cancel = handle.cancellation_token();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let result = loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(RunEvent::Progress(snapshot)) => render_progress(&snapshot),
                Some(RunEvent::Finished(result)) => break result,
                None => anyhow::bail!("Evaluation ended without a report"),
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                eprintln!("\nInterrupted: finishing the current question, then stopping...");
                cancel.cancel();
            }
        }
    };
    println!();

    let run = result.context("Evaluation failed")?;
    run.print_summary();

    save_report(&run, &output).context("Failed to save report")?;
    println!("Report saved to {}", output.display());

    Ok(())
}

fn render_progress(snapshot: &ProgressSnapshot) {
    let avg = snapshot
        .average_score
        .map(|a| format!("{:.2}", a))
        .unwrap_or_else(|| "-".to_string());

    print!(
        "\rProcessing {} of {} | graded {} | failed {} | avg {}/5   ",
        snapshot.current(),
        snapshot.total_tasks,
        snapshot.completed_count,
        snapshot.failed_count,
        avg
    );
    std::io::stdout().flush().ok();
}

fn cmd_show(report: PathBuf, json: bool) -> Result<()> {
    if !file_exists(&report) {
        anyhow::bail!(
            "Report not found at '{}'. Run the 'run' command first.",
            report.display()
        );
    }

    let run = load_report(&report).context("Failed to load report")?;

    if json {
        let json_str = serde_json::to_string_pretty(&run).context("Failed to serialize report")?;
        println!("{}", json_str);
    } else {
        run.print_summary();
    }

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing QA service connection...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:        {}", config.service.api_base);
    println!(
        "  API Key:         {}",
        if config.service.api_key.is_some() { "set" } else { "not set" }
    );
    println!("  Grade timeout:   {}s", config.evaluation.grade_timeout_secs);
    println!("  Sample count:    {}", config.evaluation.sample_count);
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    let client = QaServiceClient::new(config.service);

    println!("Sending test request...");
    match client.test_connection().await {
        Ok(count) => println!("Connection successful! {} documents indexed.", count),
        Err(e) => println!("Connection failed: {}", e),
    }

    Ok(())
}
