mod report;
mod seeds;
mod sweep;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use frameplay_engine::{BirthDate, FrameConfig};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::time::Instant;

use report::{
    JsonReport, SessionReport, config_digest, generate_json_report, write_console_session,
    write_console_sweep,
};
use seeds::{resolve_seed_inputs, split_csv};
use sweep::{run_session, sweep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable summary
    Console,
    /// Machine-readable JSON document
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "frameplay-tester", version)]
#[command(
    about = "Preview randomized study frames and check counterbalancing for a frame configuration"
)]
struct Args {
    /// Path to a randomized frame configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Id of the randomized frame, passed to the frame resolver
    #[arg(long, default_value = "randomized-frame")]
    frame_id: String,

    /// Seeds to expand (comma-separated integers or start..end ranges)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Child birthday (YYYY-MM-DD or RFC 3339); omitted means unknown
    #[arg(long)]
    birthday: Option<String>,

    /// Evaluation date (YYYY-MM-DD); defaults to now
    #[arg(long)]
    today: Option<String>,

    /// Tally condition assignment over this many consecutive seeds instead of
    /// printing individual sessions
    #[arg(long)]
    sweep: Option<u64>,

    /// Fail when the swept distribution deviates from the configured weights
    /// by more than this many percentage points
    #[arg(long, requires = "sweep")]
    max_deviation: Option<f64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Print parameters and frames for each session
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start_time = Instant::now();

    let config = load_config(&args.config)?;
    let child = args
        .birthday
        .as_deref()
        .map_or(BirthDate::Missing, BirthDate::parse);
    let now = resolve_now(args.today.as_deref())?;
    let digest = config_digest(&config)?;
    log::debug!("loaded {} (digest {digest})", args.config.display());

    let mut output_target = OutputTarget::new(args.output.clone())?;
    if args.report == ReportFormat::Console {
        announce_banner(&mut output_target, &args, &digest)?;
    }

    if let Some(count) = args.sweep {
        let seeds: Vec<u64> = (0..count).collect();
        let summary = sweep(&config, &args.frame_id, &child, now, &seeds)
            .with_context(|| format!("sweep failed for {}", args.config.display()))?;
        match args.report {
            ReportFormat::Json => generate_json_report(
                &mut output_target,
                &JsonReport {
                    frame_id: &args.frame_id,
                    config_digest: digest,
                    sessions: Vec::new(),
                    sweep: Some(&summary),
                },
            )?,
            ReportFormat::Console => write_console_sweep(&mut output_target, &summary)?,
        }
        finish(&mut output_target, &args, start_time)?;

        if let Some(limit) = args.max_deviation {
            let deviation = summary.max_deviation() * 100.0;
            if deviation > limit {
                bail!("condition distribution deviates by {deviation:.2} pts (limit {limit:.2})");
            }
        }
        return Ok(());
    }

    let seeds = resolve_seed_inputs(&split_csv(&args.seeds))?;
    let mut expansions = Vec::with_capacity(seeds.len());
    for seed in &seeds {
        let expansion = run_session(&config, &args.frame_id, &child, now, *seed)
            .with_context(|| format!("expansion failed for seed {seed}"))?;
        expansions.push((*seed, expansion));
    }

    match args.report {
        ReportFormat::Json => generate_json_report(
            &mut output_target,
            &JsonReport {
                frame_id: &args.frame_id,
                config_digest: digest,
                sessions: expansions
                    .iter()
                    .map(|(seed, expansion)| SessionReport::new(*seed, expansion))
                    .collect(),
                sweep: None,
            },
        )?,
        ReportFormat::Console => {
            for (seed, expansion) in &expansions {
                write_console_session(&mut output_target, *seed, expansion, args.verbose)?;
            }
        }
    }
    finish(&mut output_target, &args, start_time)
}

fn load_config(path: &Path) -> Result<FrameConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    FrameConfig::from_json(&raw).with_context(|| format!("invalid frame config {}", path.display()))
}

fn resolve_now(today: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(raw) = today else {
        return Ok(Utc::now());
    };
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("--today must be YYYY-MM-DD (got {raw})"))?;
    Ok(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn announce_banner(out: &mut OutputTarget, args: &Args, digest: &str) -> Result<()> {
    writeln!(out, "{}", "🧸 Frameplay Tester".bright_cyan().bold())?;
    writeln!(out, "{}", "================================".cyan())?;
    writeln!(
        out,
        "config {} (digest {})",
        args.config.display(),
        digest.bright_white()
    )?;
    Ok(())
}

fn finish(out: &mut OutputTarget, args: &Args, start_time: Instant) -> Result<()> {
    if args.report == ReportFormat::Console {
        let duration = start_time.elapsed();
        writeln!(out)?;
        writeln!(out, "🏁 Total time: {duration:?}")?;
    }
    out.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn today_parses_to_midnight_utc() {
        let now = resolve_now(Some("2024-05-06")).unwrap();
        assert_eq!(now.to_rfc3339(), "2024-05-06T00:00:00+00:00");
        assert!(resolve_now(Some("May 6")).is_err());
    }

    #[test]
    fn args_parse_sweep_options() {
        let args = Args::try_parse_from([
            "frameplay-tester",
            "--config",
            "study.json",
            "--sweep",
            "500",
            "--max-deviation",
            "2.5",
            "--report",
            "json",
        ])
        .unwrap();
        assert_eq!(args.sweep, Some(500));
        assert_eq!(args.report, ReportFormat::Json);
        assert!(Args::try_parse_from(["frameplay-tester", "--config", "x", "--max-deviation", "1"]).is_err());
    }
}
