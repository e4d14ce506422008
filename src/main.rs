use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use log::info;
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use ghidra_bridge::executor::{HttpToolApi, MockToolApi, OutcomeStatus, ToolApi, ToolExecutor};
use ghidra_bridge::llm::{ModelBackend, OllamaBackend};
use ghidra_bridge::orchestrator::{Orchestrator, QueryResult, SessionMemory, TerminalStatus};
use ghidra_bridge::registry::ToolRegistry;

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ghidra-bridge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ghidra-bridge.log");

    // Setup env_logger with file output
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    let env = env_logger::Env::default().default_filter_or(level.unwrap_or("info"));
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let registry = Arc::new(config.registry()?);

    if config.ghidra.mock_mode {
        println!("{}", "Mock mode: tool calls are answered from canned data".yellow());
        dispatch(cli, config, registry, Arc::new(MockToolApi::new())).await
    } else {
        let api = HttpToolApi::new(Duration::from_secs(config.ghidra.timeout_secs))?;
        dispatch(cli, config, registry, Arc::new(api)).await
    }
}

async fn dispatch<A: ToolApi>(cli: &Cli, config: &Config, registry: Arc<ToolRegistry>, api: Arc<A>) -> Result<()> {
    let backend = Arc::new(OllamaBackend::new(config.ollama_config())?);
    let executor = ToolExecutor::new(api, registry.clone(), config.executor_config());

    match &cli.command {
        Some(Commands::Tools) => {
            handle_tools_command(&registry);
            Ok(())
        }
        Some(Commands::Health) => {
            if check_health(&backend, &executor, &config.ollama.model).await {
                Ok(())
            } else {
                Err(eyre!("Health check failed"))
            }
        }
        Some(Commands::Query { text, json }) => {
            let mut orchestrator = Orchestrator::new(backend, executor, config.orchestrator_config()?)?;
            handle_query_command(&mut orchestrator, text.as_deref(), *json, cli.is_verbose()).await
        }
        None | Some(Commands::Interactive) => {
            let orchestrator = Orchestrator::new(backend, executor, config.orchestrator_config()?)?
                .with_context(Arc::new(SessionMemory::default()));
            run_interactive(orchestrator, &config.ollama.model, cli.is_verbose()).await
        }
    }
}

fn handle_tools_command(registry: &ToolRegistry) {
    println!("{} ({})", "Available tools".green().bold(), registry.len());
    for tool in registry.iter() {
        println!("  {}", tool.signature().cyan());
        if !tool.description.is_empty() {
            println!("      {}", tool.description);
        }
    }
}

fn status_mark(ok: bool) -> ColoredString {
    if ok { "OK".green() } else { "FAILED".red() }
}

async fn check_health<A: ToolApi>(backend: &OllamaBackend, executor: &ToolExecutor<A>, model: &str) -> bool {
    let backend_ok = backend.health_check().await;
    println!("Ollama:            {}", status_mark(backend_ok));
    if backend_ok {
        match backend.list_models().await {
            Ok(models) if !models.iter().any(|m| m == model || m.starts_with(&format!("{}:", model))) => {
                println!("  {} model '{}' is not installed", "warning:".yellow(), model);
            }
            Ok(models) => println!("  {} models installed", models.len()),
            Err(e) => println!("  {} could not list models: {}", "warning:".yellow(), e),
        }
    }

    let primary_ok = executor.api().health_check(executor.primary()).await;
    println!("GhidraMCP primary: {} ({})", status_mark(primary_ok), executor.primary().base_url);

    let secondary_ok = match executor.secondary() {
        Some(secondary) => {
            let ok = executor.api().health_check(secondary).await;
            println!("GhidraMCP secondary: {} ({})", status_mark(ok), secondary.base_url);
            ok
        }
        None => false,
    };

    backend_ok && (primary_ok || secondary_ok)
}

/// Run one query; Ctrl-C cancels it and keeps the partial transcript
async fn run_query<B: ModelBackend, A: ToolApi>(
    orchestrator: &mut Orchestrator<B, A>,
    query: &str,
) -> QueryResult {
    let cancel = CancellationToken::new();
    let run = orchestrator.run(query, &cancel);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}", "Cancelling...".yellow());
            cancel.cancel();
            run.await
        }
    }
}

fn print_transcript(result: &QueryResult) {
    for record in result.transcript.records() {
        let mut header = format!("[{}/{}]", record.iteration, record.kind);
        if record.degraded {
            header.push_str(" degraded");
        }
        if record.interrupted {
            header.push_str(" interrupted");
        }
        println!("{}", header.dimmed());
        for invocation in &record.invocations {
            match (&invocation.normalized, &invocation.outcome) {
                (Ok(command), Some(outcome)) => {
                    let status = match outcome.status {
                        OutcomeStatus::Success => "ok".green(),
                        OutcomeStatus::ToolError => "tool error".red(),
                        OutcomeStatus::TransportError => "unreachable".red(),
                        OutcomeStatus::Unsupported => "unsupported".yellow(),
                    };
                    println!("  {} -> {} ({})", command.to_directive(), status, outcome.endpoint);
                }
                (Ok(command), None) => println!("  {} -> {}", command.to_directive(), "not run".dimmed()),
                (Err(rejection), _) => println!("  {} -> {}", invocation.raw.name, rejection.to_string().red()),
            }
        }
    }
}

fn print_result(result: &QueryResult, verbose: bool) {
    if verbose {
        print_transcript(result);
    }
    match result.status {
        TerminalStatus::Done => {
            println!("{}", result.answer.as_deref().unwrap_or_default());
            println!(
                "{}",
                format!("({} after {} iteration(s))", result.reason, result.iterations).dimmed()
            );
        }
        TerminalStatus::Failed => println!("{} {}", "Failed:".red().bold(), result.reason),
        TerminalStatus::Cancelled => println!("{}", "Query cancelled".yellow()),
    }
}

async fn handle_query_command<B: ModelBackend, A: ToolApi>(
    orchestrator: &mut Orchestrator<B, A>,
    text: Option<&str>,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let query = match text {
        Some(text) => text.to_string(),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read query from stdin")?;
            input
        }
    };
    let query = query.trim();
    if query.is_empty() {
        return Err(eyre!("Query is empty"));
    }

    let result = run_query(orchestrator, query).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, verbose);
    }

    match result.status {
        TerminalStatus::Done => Ok(()),
        _ => Err(eyre!("Query ended with status {}", result.status)),
    }
}

async fn run_interactive<A: ToolApi>(
    mut orchestrator: Orchestrator<OllamaBackend, A>,
    model: &str,
    verbose: bool,
) -> Result<()> {
    info!("Entering interactive mode");
    println!("{}", "ghidra-bridge interactive session".green().bold());
    println!("Type a question, 'health' to check services, or 'exit' to quit. Ctrl-C cancels a running query.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "ghidra>".cyan().bold());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "health" => {
                check_health(orchestrator.backend(), orchestrator.executor(), model).await;
            }
            "tools" => handle_tools_command(orchestrator.executor().registry()),
            query => {
                let result = run_query(&mut orchestrator, query).await;
                print_result(&result, verbose);
            }
        }
    }

    println!("Goodbye");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration, then apply environment and command-line overrides
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env();
    config.apply_overrides(
        cli.ollama_url.as_deref(),
        cli.ghidra_url.as_deref(),
        cli.model.as_deref(),
        cli.mock,
    );

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
