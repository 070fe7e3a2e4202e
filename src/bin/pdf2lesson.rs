//! CLI binary for pdf2lesson.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `LessonConfig`, drives the orchestrator, and renders results.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2lesson::{
    GeminiBackend, LessonConfig, ModelTier, Orchestrator, Outcome, ProgressTicker, Section,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI definition ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TierArg {
    /// Flash model: fastest responses.
    Fast,
    /// Pro model: higher quality, slower.
    Pro,
}

impl From<TierArg> for ModelTier {
    fn from(t: TierArg) -> Self {
        match t {
            TierArg::Fast => ModelTier::Fast,
            TierArg::Pro => ModelTier::Pro,
        }
    }
}

/// Generate structured lesson material from a PDF document.
#[derive(Debug, Parser)]
#[command(name = "pdf2lesson", version, about)]
struct Cli {
    /// Path to the input PDF.
    input: PathBuf,

    /// Model quality tier.
    #[arg(long, value_enum, default_value = "fast")]
    model: TierArg,

    /// Skip per-topic illustration generation.
    #[arg(long)]
    no_illustrations: bool,

    /// After generating, narrate the lesson and write the audio next to
    /// the lesson JSON (or to --audio-output).
    #[arg(long)]
    tutor: bool,

    /// Write the lesson JSON here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the tutor narration audio. Default: <output>.wav.
    #[arg(long, requires = "tutor")]
    audio_output: Option<PathBuf>,

    /// API key override (otherwise GEMINI_API_KEY / API_KEY).
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Verbose logging (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut builder = LessonConfig::builder()
        .tier(cli.model.into())
        .illustrations(!cli.no_illustrations);
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    let config = builder.build()?;
    let tier: ModelTier = cli.model.into();

    let backend = GeminiBackend::from_config(&config)?;
    let orchestrator = Orchestrator::new(backend, config);

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("reading '{}'", cli.input.display()))?;
    orchestrator.select_file(
        &cli.input.file_name().map_or_else(
            || cli.input.display().to_string(),
            |n| n.to_string_lossy().into_owned(),
        ),
        "application/pdf",
        bytes,
    )?;

    eprintln!(
        "{} {}",
        cyan("◆"),
        bold(&format!(
            "Generating lesson material from '{}' ({tier:?} tier)…",
            cli.input.display()
        ))
    );

    // The remote call gives no true completion signal, so the bar tracks
    // the simulated clock: capped at 95 until the pipeline confirms.
    let ticker = ProgressTicker::spawn(tier);
    let bar = spawn_progress_bar(&ticker);

    let result = orchestrator.generate().await;
    match &result {
        Ok(_) => ticker.complete(),
        Err(_) => ticker.fail(),
    }
    // Give the bar task its final value, then clear the terminal line.
    tokio::time::sleep(Duration::from_millis(50)).await;
    bar.finish_and_clear();

    let output = match result? {
        Outcome::Completed(output) => output,
        Outcome::Superseded => {
            // Single-shot CLI run: nothing can supersede it.
            anyhow::bail!("generation was superseded unexpectedly");
        }
    };

    print_summary(&output);

    let lesson_json = serde_json::to_string_pretty(&output.lesson)?;
    match cli.output {
        Some(ref path) => {
            write_atomic(path, lesson_json.as_bytes())
                .await
                .with_context(|| format!("writing '{}'", path.display()))?;
            eprintln!("{} Lesson written to {}", green("✔"), path.display());
        }
        None => println!("{lesson_json}"),
    }

    if cli.tutor {
        run_tutor(&orchestrator, &cli).await?;
    }

    Ok(())
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "pdf2lesson=info",
        1 => "pdf2lesson=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Render the simulated-progress values on an indicatif bar.
fn spawn_progress_bar(ticker: &ProgressTicker) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  "),
    );
    bar.set_prefix("Generating");
    bar.enable_steady_tick(Duration::from_millis(80));

    let mut rx = ticker.subscribe();
    let bar_task = bar.clone();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            bar_task.set_position((*rx.borrow()).round() as u64);
        }
    });
    bar
}

fn print_summary(output: &pdf2lesson::GenerationOutput) {
    let lesson = &output.lesson;
    eprintln!("\n{} {}", green("✔"), bold(&lesson.title));
    for topic in &lesson.topics {
        let kinds: Vec<&str> = topic.sections.iter().map(Section::kind).collect();
        eprintln!(
            "  {} {}  {}{}",
            cyan("•"),
            topic.title,
            dim(&format!("{} sections [{}]", kinds.len(), kinds.join(", "))),
            if topic.image.is_some() {
                format!("  {}", dim("🖼"))
            } else {
                String::new()
            }
        );
    }

    let diag = &output.diagnostics;
    if diag.all_topics_dropped {
        eprintln!(
            "{} No topic survived validation; the lesson is empty. \
             Inspect the warnings above or retry with the pro tier.",
            yellow("⚠")
        );
    } else if !diag.is_clean() {
        eprintln!(
            "{} {} malformed item(s) dropped during validation ({} topic(s), {} section(s))",
            yellow("⚠"),
            diag.dropped_count(),
            diag.dropped_topics.len(),
            diag.dropped_sections.len()
        );
    }
}

async fn run_tutor<B: pdf2lesson::GenerativeBackend>(
    orchestrator: &Orchestrator<B>,
    cli: &Cli,
) -> Result<()> {
    eprintln!("{} {}", cyan("◆"), bold("Calling the tutor…"));
    let narration = match orchestrator.call_tutor().await? {
        Outcome::Completed(n) => n,
        Outcome::Superseded => anyhow::bail!("tutor call was superseded unexpectedly"),
    };

    let audio_path = cli.audio_output.clone().unwrap_or_else(|| {
        let base = cli
            .output
            .clone()
            .unwrap_or_else(|| cli.input.with_extension("json"));
        base.with_extension("wav")
    });
    write_atomic(&audio_path, &narration.audio.bytes)
        .await
        .with_context(|| format!("writing '{}'", audio_path.display()))?;

    eprintln!(
        "{} Narration audio ({}, {} bytes) written to {}",
        green("✔"),
        narration.audio.media_type,
        narration.audio.bytes.len(),
        audio_path.display()
    );
    eprintln!("\n{}\n{}", bold("Tutor says:"), narration.text);
    Ok(())
}

/// Atomic write (temp file + rename) to prevent partial files.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await
}
