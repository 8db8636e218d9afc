//! calcview CLI - Show a /calc result in the terminal
//!
//! Usage:
//!   calcview <MODE> <EXPR> [--backend <url>] [--config <file>] [--json]
//!
//! Example:
//!   calcview lambda "(\x. x x) (\y. y)"
//!   calcview ski "S K K a" --backend http://localhost:9000 --json

use anyhow::{Context, Result};
use calcview::renderer::{smoke_test, DiagramRenderer, GraphvizRenderer};
use calcview::{ContentMapper, DisplayRecord, HttpBackend, RecordState, ResultController, ViewConfig};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn print_usage() {
    eprintln!(
        r#"
{} - Show a /calc result in the terminal

{}
    calcview <MODE> <EXPR> [OPTIONS]
    calcview --check-renderer [OPTIONS]

{}
    <MODE>     Calculation mode, forwarded as the first path segment
    <EXPR>     Expression to calculate (percent-encoded for you)

{}
    -c, --config <FILE>     TOML config file
    -b, --backend <URL>     Backend base URL (default: http://localhost:8080)
    --dot <PATH>            Graphviz dot executable (default: dot)
    --json                  Print the settled view state as JSON
    --check-renderer        Render a sample graph and exit
    -v, --verbose           Log requests and renders
    -vv                     Extra verbose (debug logs)
    -h, --help              Print this help message

{}
    calcview lambda "(\x. x x) (\y. y)"
    calcview ski "S K K a" -b http://localhost:9000 --json
"#,
        "calcview".bold(),
        "USAGE:".bold(),
        "ARGS:".bold(),
        "OPTIONS:".bold(),
        "EXAMPLES:".bold(),
    );
}

struct CliArgs {
    mode: String,
    expr: String,
    config: Option<PathBuf>,
    backend: Option<String>,
    dot: Option<String>,
    json: bool,
    check_renderer: bool,
    verbose: u8, // 0=warnings, 1=info, 2=debug
}

fn parse_args() -> Result<CliArgs> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }

    let mut positional = Vec::new();
    let mut config = None;
    let mut backend = None;
    let mut dot = None;
    let mut json = false;
    let mut check_renderer = false;
    let mut verbose: u8 = 0;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                let value = args.get(i).context("--config needs a file")?;
                config = Some(PathBuf::from(value));
            }
            "--backend" | "-b" => {
                i += 1;
                backend = Some(args.get(i).context("--backend needs a URL")?.clone());
            }
            "--dot" => {
                i += 1;
                dot = Some(args.get(i).context("--dot needs a path")?.clone());
            }
            "--json" => {
                json = true;
            }
            "--check-renderer" => {
                check_renderer = true;
            }
            "--verbose" | "-v" => {
                verbose = verbose.max(1);
            }
            "-vv" => {
                verbose = 2;
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    if !check_renderer && positional.len() != 2 {
        print_usage();
        std::process::exit(1);
    }

    let mut positional = positional.into_iter();
    Ok(CliArgs {
        mode: positional.next().unwrap_or_default(),
        expr: positional.next().unwrap_or_default(),
        config,
        backend,
        dot,
        json,
        check_renderer,
        verbose,
    })
}

fn print_record(index: usize, record: &DisplayRecord) {
    eprintln!(
        "{}",
        format!("┌─ {} · {} ─────────────────────────────────────────", index + 1, record.name).cyan()
    );
    match &record.state {
        RecordState::Pending => {
            eprintln!("{} {}", "│".cyan(), "(unresolved)".dimmed());
        }
        RecordState::Markup(markup) => {
            for line in markup.lines() {
                println!("{}", line);
            }
        }
        RecordState::Steps(steps) => {
            for (n, step) in steps.iter().enumerate() {
                eprintln!(
                    "{} {} {}",
                    "│".cyan(),
                    format!("step {}:", n + 1).yellow(),
                    step.expr.bold()
                );
                for line in step.rendered_markup.lines() {
                    println!("{}", line);
                }
            }
        }
        RecordState::RenderFailed(detail) => {
            eprintln!("{} {} {}", "│".cyan(), "Render failed:".red(), detail);
        }
        RecordState::Unrecognized(detail) => {
            eprintln!("{} {} {}", "│".cyan(), "Unrecognized:".yellow(), detail);
        }
    }
    eprintln!(
        "{}",
        "└────────────────────────────────────────────────────────────────".cyan()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = parse_args()?;

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match &args.config {
        Some(path) => ViewConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => ViewConfig::default(),
    };
    if let Some(backend) = &args.backend {
        config.backend_url = backend.clone();
    }
    if let Some(dot) = &args.dot {
        config.renderer.dot_path = dot.clone();
    }

    let renderer: Arc<dyn DiagramRenderer> = Arc::new(GraphvizRenderer::from_config(&config.renderer));

    if args.check_renderer {
        let markup = smoke_test(renderer.as_ref())
            .await
            .with_context(|| format!("Renderer {} failed", renderer.name()))?;
        eprintln!("{} {}", "Renderer OK:".green().bold(), renderer.name());
        println!("{}", markup.outer_markup());
        return Ok(());
    }

    let backend = HttpBackend::from_config(&config).context("Failed to create HTTP client")?;
    let controller = ResultController::new(Arc::new(backend), ContentMapper::new(renderer))
        .with_modes(config.modes.clone());

    let pending = controller.trigger(&args.mode, &args.expr).await?;
    pending.settle().await;

    let state = controller.snapshot().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        for (index, record) in state.results.iter().enumerate() {
            print_record(index, record);
        }
        if state.results.is_empty() && !state.error_flag {
            eprintln!("{}", "(no results)".dimmed());
        }
    }

    if state.error_flag {
        eprintln!("{} {}", "Error:".red().bold(), state.error_message);
        std::process::exit(1);
    }

    Ok(())
}
