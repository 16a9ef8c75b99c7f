use std::hash::Hasher;
use std::io::Write;

use anyhow::Result;
use colored::Colorize;
use frameplay_engine::{ConditionRecord, Expansion, FrameConfig, SelectionTrace, Warning};
use serde::Serialize;
use serde_json::{Map, Value};
use twox_hash::XxHash64;

use crate::sweep::SweepSummary;

/// One expanded session as written to JSON reports.
#[derive(Debug, Serialize)]
pub struct SessionReport<'a> {
    pub seed: u64,
    pub condition: &'a ConditionRecord,
    pub trace: &'a SelectionTrace,
    pub warnings: &'a [Warning],
    pub frames: &'a [Value],
}

impl<'a> SessionReport<'a> {
    pub fn new(seed: u64, expansion: &'a Expansion<Value>) -> Self {
        Self {
            seed,
            condition: &expansion.condition,
            trace: &expansion.trace,
            warnings: &expansion.warnings,
            frames: &expansion.frames,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub frame_id: &'a str,
    pub config_digest: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sessions: Vec<SessionReport<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<&'a SweepSummary>,
}

/// Stable fingerprint of a configuration, independent of key order.
pub fn config_digest(config: &FrameConfig) -> Result<String> {
    let value = canonicalize_value(serde_json::to_value(config)?);
    let canonical = serde_json::to_string(&value)?;
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(canonical.as_bytes());
    Ok(format!("{:016x}", hasher.finish()))
}

fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut result = Map::with_capacity(entries.len());
            for (key, value) in entries {
                result.insert(key, canonicalize_value(value));
            }
            Value::Object(result)
        }
        other => other,
    }
}

pub fn generate_json_report<W: Write + ?Sized>(out: &mut W, report: &JsonReport<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_console_session<W: Write + ?Sized>(
    out: &mut W,
    seed: u64,
    expansion: &Expansion<Value>,
    verbose: bool,
) -> Result<()> {
    let condition = &expansion.condition;
    writeln!(
        out,
        "🎲 seed {} → condition {} ({} frame(s))",
        seed.to_string().bright_white(),
        condition.condition_num.to_string().green().bold(),
        expansion.frames.len()
    )?;
    if let Some(bracket) = expansion.trace.bracket {
        writeln!(out, "   age bracket {bracket} matched")?;
    }
    for warning in &expansion.warnings {
        writeln!(out, "   ⚠️  {}", warning.to_string().yellow())?;
    }
    if verbose {
        writeln!(
            out,
            "   parameters: {}",
            serde_json::to_string(&condition.parameter_set)?
        )?;
        for (index, frame) in expansion.frames.iter().enumerate() {
            writeln!(out, "   [{index}] {}", serde_json::to_string(frame)?)?;
        }
    }
    Ok(())
}

pub fn write_console_sweep<W: Write + ?Sized>(out: &mut W, summary: &SweepSummary) -> Result<()> {
    writeln!(out, "{}", "📊 Condition distribution".bright_yellow().bold())?;
    writeln!(out, "{}", "-".repeat(30).yellow())?;
    let observed = summary.observed_share();
    for (condition, count) in summary.counts.iter().enumerate() {
        let expected = summary.expected_share.get(condition).copied().unwrap_or(0.0);
        writeln!(
            out,
            "  condition {condition:>3}: {count:>7} sessions  observed {:>6.2}%  expected {:>6.2}%",
            observed[condition] * 100.0,
            expected * 100.0
        )?;
    }
    writeln!(
        out,
        "  max deviation {:.2} pts over {} sessions",
        summary.max_deviation() * 100.0,
        summary.sessions
    )?;
    if summary.sessions_with_warnings > 0 {
        writeln!(
            out,
            "  {} session(s) fell back on missing participant data",
            summary.sessions_with_warnings.to_string().yellow()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> FrameConfig {
        FrameConfig::from_json(json).unwrap()
    }

    #[test]
    fn digest_ignores_key_order() {
        let one = config(r#"{"frameList": [{"a": 1, "b": 2}], "parameterSets": [{}]}"#);
        let two = config(r#"{"parameterSets": [{}], "frameList": [{"b": 2, "a": 1}]}"#);
        assert_eq!(config_digest(&one).unwrap(), config_digest(&two).unwrap());

        let other = config(r#"{"frameList": [{"a": 2}], "parameterSets": [{}]}"#);
        assert_ne!(config_digest(&one).unwrap(), config_digest(&other).unwrap());
    }

    #[test]
    fn console_sweep_lists_every_condition() {
        let summary = SweepSummary {
            sessions: 4,
            counts: vec![1, 3],
            expected_share: vec![0.25, 0.75],
            sessions_with_warnings: 1,
        };
        let mut buffer = Vec::new();
        write_console_sweep(&mut buffer, &summary).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("condition   0"));
        assert!(text.contains("condition   1"));
        assert!(text.contains("fell back"));
    }
}
