//! Weighted index selection.
use rand::Rng;
use serde::Serialize;

use crate::error::WeightError;

/// Outcome of a weighted draw, kept for decision traces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightedDraw {
    pub index: usize,
    /// Uniform roll in `[0, total)`.
    pub roll: f64,
    pub total: f64,
}

/// Draw one index with probability proportional to its weight.
///
/// # Errors
///
/// Returns an error when the list is empty, when any weight is negative or
/// non-finite, or when every weight is zero.
pub fn draw_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> Result<WeightedDraw, WeightError> {
    let total = total_weight(weights)?;
    let roll = rng.gen_range(0.0..total);
    let index = pick_index(weights, roll).ok_or(WeightError::ZeroTotal)?;
    Ok(WeightedDraw { index, roll, total })
}

/// First index whose running total is strictly greater than `roll`.
///
/// A roll landing exactly on a boundary goes to the next entry with positive
/// weight, so zero-weight entries are never picked, including at `roll == 0`.
fn pick_index(weights: &[f64], roll: f64) -> Option<usize> {
    let mut running = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        running += *weight;
        if roll < running {
            return Some(index);
        }
    }

    // Rounding can leave the roll just past the final running total.
    weights.iter().rposition(|weight| *weight > 0.0)
}

/// Sum of a validated weight list.
///
/// # Errors
///
/// See [`draw_weighted`].
pub fn total_weight(weights: &[f64]) -> Result<f64, WeightError> {
    if weights.is_empty() {
        return Err(WeightError::Empty);
    }
    let mut total = 0.0;
    for (index, weight) in weights.iter().enumerate() {
        if !weight.is_finite() || *weight < 0.0 {
            return Err(WeightError::Invalid {
                index,
                value: *weight,
            });
        }
        total += *weight;
    }
    if total <= 0.0 || !total.is_finite() {
        return Err(WeightError::ZeroTotal);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn draws_converge_to_weight_ratio() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let mut counts = [0u32; 2];
        for _ in 0..20_000 {
            let draw = draw_weighted(&[1.0, 3.0], &mut rng).unwrap();
            counts[draw.index] += 1;
        }
        let ratio = f64::from(counts[1]) / f64::from(counts[0]);
        assert!((2.7..3.3).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(
            draw_weighted(&[0.0, 0.0, 0.0], &mut rng),
            Err(WeightError::ZeroTotal)
        );
    }

    #[test]
    fn empty_and_negative_weights_are_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(draw_weighted(&[], &mut rng), Err(WeightError::Empty));
        assert_eq!(
            draw_weighted(&[1.0, -2.0], &mut rng),
            Err(WeightError::Invalid {
                index: 1,
                value: -2.0
            })
        );
        assert!(matches!(
            draw_weighted(&[f64::NAN], &mut rng),
            Err(WeightError::Invalid { index: 0, .. })
        ));
    }

    #[test]
    fn boundary_rolls_go_to_the_next_weighted_entry() {
        assert_eq!(pick_index(&[0.0, 1.0], 0.0), Some(1));
        assert_eq!(pick_index(&[1.0, 1.0], 1.0), Some(1));
        assert_eq!(pick_index(&[1.0, 0.0, 1.0], 1.0), Some(2));
        assert_eq!(pick_index(&[2.0, 1.0], 0.0), Some(0));
        assert_eq!(pick_index(&[1.0, 0.0], 1.0), Some(0));
        assert_eq!(pick_index(&[0.0, 0.0], 0.0), None);
    }

    #[test]
    fn zero_weight_entries_are_never_selected() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        for _ in 0..2_000 {
            let draw = draw_weighted(&[0.0, 2.0, 0.0, 1.0, 0.0], &mut rng).unwrap();
            assert!(draw.index == 1 || draw.index == 3);
            assert!(draw.roll < draw.total);
        }
    }
}
