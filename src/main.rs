use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use infra0_sections::parser::{find_block, step_statuses};
use infra0_sections::settings::Settings;
use infra0_sections::stream::{split_chunks, ReplyStream, StreamEvent};
use infra0_sections::{classify, extract_active_section, extract_final_section, ParsedState, SectionKind};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Parser)]
#[command(name = "infra0-sections", about = "Inspect streamed infra0 replies section by section")]
struct Cli {
    /// Print JSON instead of tables (also INFRA0_JSON=true)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a reply transcript ("-" reads stdin)
    Classify { input: PathBuf },
    /// Print the closed outro; exits 1 if it has not closed yet
    Final { input: PathBuf },
    /// Print the active section and its content so far
    Active { input: PathBuf },
    /// Replay a transcript chunk by chunk, printing section transitions
    Replay {
        input: PathBuf,
        /// Chars per chunk (default: INFRA0_CHUNK_SIZE or 16)
        #[arg(short = 'c', long)]
        chunk_size: Option<usize>,
        /// Delay between chunks in ms (default: INFRA0_DELAY_MS or 0)
        #[arg(short = 'd', long)]
        delay_ms: Option<u64>,
    },
    /// Classify every .md/.txt transcript in a directory
    Batch {
        dir: PathBuf,
        /// Max files to classify
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    debug!(?settings, "Loaded settings");
    let json = cli.json || settings.json;

    let result = match cli.command {
        Commands::Classify { input } => {
            let buffer = read_input(&input)?;
            let state = classify(&buffer);
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state_table(&buffer, &state);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Final { input } => {
            let buffer = read_input(&input)?;
            match extract_final_section(&buffer) {
                Some(outro) => {
                    println!("{}", outro);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("Final section has not closed yet.");
                    Ok(ExitCode::from(1))
                }
            }
        }
        Commands::Active { input } => {
            let buffer = read_input(&input)?;
            let active = classify(&buffer).active_section;
            let content = extract_active_section(&buffer);
            if json {
                let out = serde_json::json!({ "activeSection": active, "content": content });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("Active: {}", active);
                println!("{}", content.as_deref().unwrap_or("(nothing yet)"));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Replay {
            input,
            chunk_size,
            delay_ms,
        } => {
            let buffer = read_input(&input)?;
            let settings = settings.with_overrides(chunk_size, delay_ms)?;
            let delay = Duration::from_millis(settings.delay_ms);
            replay(buffer, settings.chunk_size, delay, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Batch { dir, limit } => {
            batch(&dir, limit, json)?;
            Ok(ExitCode::SUCCESS)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_state_table(buffer: &str, state: &ParsedState) {
    println!(
        "{:<14} | {:<9} | {:<6} | {:>6} | {}",
        "Section", "Status", "Closed", "Chars", "Preview"
    );
    println!("{}", "-".repeat(86));

    for (kind, status) in step_statuses(state) {
        let block = find_block(buffer, kind);
        let closed = match &block {
            Some(b) if b.closed => "yes",
            Some(_) => "no",
            None => "-",
        };
        let chars = block
            .as_ref()
            .map(|b| b.content.chars().count().to_string())
            .unwrap_or_else(|| "-".into());
        let preview = block
            .as_ref()
            .map(|b| truncate(b.content.lines().next().unwrap_or(""), 40))
            .unwrap_or_default();

        println!(
            "{:<14} | {:<9} | {:<6} | {:>6} | {}",
            kind.tag(),
            status.label(),
            closed,
            chars,
            preview
        );
    }

    println!("\nActive: {}", state.active_section);
}

/// Feed the transcript through a channel the way a network read would.
async fn replay(
    buffer: String,
    chunk_size: usize,
    delay: Duration,
    json: bool,
) -> Result<ParsedState> {
    let chunks = split_chunks(&buffer, chunk_size);
    let total = chunks.len();
    info!("Replaying {} chars in {} chunks", buffer.chars().count(), total);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let (tx, mut rx) = tokio::sync::mpsc::channel::<String>(CHANNEL_CAPACITY);
    let producer = tokio::spawn(async move {
        for chunk in chunks {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
    });

    let mut stream = ReplyStream::with_capacity(buffer.len());
    while let Some(chunk) = rx.recv().await {
        for event in stream.push(&chunk) {
            let offset = stream.buffer().len();
            pb.suspend(|| print_event(offset, &event, json))?;
        }
        pb.set_message(stream.state().active_section.tag());
        pb.inc(1);
    }
    producer.await?;
    pb.finish_and_clear();

    let state = stream.state();
    if json {
        println!("{}", serde_json::to_string(&state)?);
    } else {
        println!();
        for (kind, status) in step_statuses(&state) {
            println!("  {:<14} {}", kind.tag(), status.label());
        }
        println!(
            "\nStream {}.",
            if stream.is_complete() { "complete" } else { "incomplete" }
        );
    }
    Ok(state)
}

fn print_event(offset: usize, event: &StreamEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        StreamEvent::SectionStarted { section } => {
            println!("[{:>6}] started {}", offset, section)
        }
        StreamEvent::SectionClosed { section } => {
            println!("[{:>6}] closed  {}", offset, section)
        }
        StreamEvent::ActiveChanged { from, to } => {
            println!("[{:>6}] active  {} -> {}", offset, from, to)
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct BatchRow {
    file: String,
    sections: Vec<SectionKind>,
    active: SectionKind,
    complete: bool,
}

fn batch(dir: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("md" | "txt")))
        .collect();
    paths.sort();
    if let Some(n) = limit {
        paths.truncate(n);
    }

    if paths.is_empty() {
        println!("No transcripts found in {}.", dir.display());
        return Ok(());
    }
    info!("Classifying {} transcripts", paths.len());

    let rows: Vec<BatchRow> = paths
        .par_iter()
        .filter_map(|path| match std::fs::read_to_string(path) {
            Ok(text) => {
                let state = classify(&text);
                Some(BatchRow {
                    file: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    sections: state.sections.keys().copied().collect(),
                    active: state.active_section,
                    complete: extract_final_section(&text).is_some(),
                })
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:>3} | {:<28} | {:<8} | {:<14} | {:<8}",
        "#", "File", "Sections", "Active", "Complete"
    );
    println!("{}", "-".repeat(72));
    for (i, r) in rows.iter().enumerate() {
        println!(
            "{:>3} | {:<28} | {:<8} | {:<14} | {:<8}",
            i + 1,
            truncate(&r.file, 28),
            format!("{}/{}", r.sections.len(), SectionKind::ALL.len()),
            r.active.tag(),
            if r.complete { "yes" } else { "no" }
        );
    }

    let complete = rows.iter().filter(|r| r.complete).count();
    println!("\n{} transcripts | {} complete", rows.len(), complete);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
