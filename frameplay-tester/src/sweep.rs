use chrono::{DateTime, Utc};
use frameplay_engine::numbers::usize_to_f64;
use frameplay_engine::{
    ChildRecord, Expansion, FrameConfig, PassthroughResolver, RandomizerError, RngBundle, generate,
};
use serde::Serialize;
use serde_json::Value;

/// Expand `config` once for `seed`, returning templates as resolved frames.
pub fn run_session<C: ChildRecord + ?Sized>(
    config: &FrameConfig,
    frame_id: &str,
    child: &C,
    now: DateTime<Utc>,
    seed: u64,
) -> Result<Expansion<Value>, RandomizerError> {
    let mut rngs = RngBundle::from_user_seed(seed);
    generate::<Value, _, _>(
        frame_id,
        config,
        &[],
        &mut PassthroughResolver,
        child,
        now,
        &mut rngs,
    )
}

/// Condition assignment tallied over many seeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSummary {
    pub sessions: usize,
    /// Sessions assigned to each condition number.
    pub counts: Vec<usize>,
    /// Share of sessions each condition should receive for this child.
    pub expected_share: Vec<f64>,
    /// Sessions that reported at least one data warning.
    pub sessions_with_warnings: usize,
}

impl SweepSummary {
    #[must_use]
    pub fn observed_share(&self) -> Vec<f64> {
        if self.sessions == 0 {
            return vec![0.0; self.counts.len()];
        }
        self.counts
            .iter()
            .map(|count| ratio(*count, self.sessions))
            .collect()
    }

    /// Largest absolute gap between observed and expected shares.
    #[must_use]
    pub fn max_deviation(&self) -> f64 {
        self.observed_share()
            .iter()
            .zip(&self.expected_share)
            .map(|(observed, expected)| (observed - expected).abs())
            .fold(0.0, f64::max)
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    usize_to_f64(part) / usize_to_f64(whole)
}

/// Run one session per seed and tally the assigned conditions.
pub fn sweep<C: ChildRecord + ?Sized>(
    config: &FrameConfig,
    frame_id: &str,
    child: &C,
    now: DateTime<Utc>,
    seeds: &[u64],
) -> Result<SweepSummary, RandomizerError> {
    let mut counts = vec![0usize; config.parameter_sets.len()];
    let mut expected_share = Vec::new();
    let mut sessions_with_warnings = 0;

    for seed in seeds {
        let expansion = run_session(config, frame_id, child, now, *seed)?;
        counts[expansion.condition.condition_num] += 1;
        if !expansion.warnings.is_empty() {
            sessions_with_warnings += 1;
        }
        if expected_share.is_empty() {
            let total: f64 = expansion.trace.weights.iter().sum();
            expected_share = expansion
                .trace
                .weights
                .iter()
                .map(|weight| weight / total)
                .collect();
        }
    }
    log::info!("swept {} sessions for {frame_id}", seeds.len());

    Ok(SweepSummary {
        sessions: seeds.len(),
        counts,
        expected_share,
        sessions_with_warnings,
    })
}
