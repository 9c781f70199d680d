use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use errp_core::TrialType;

/// Re-shuffle budget before the run-length constraints are given up on.
pub const MAX_SHUFFLE_ATTEMPTS: usize = 1000;

/// Generates a pseudorandom trial-type sequence of length `n_trials` with
/// `round(n_trials * error_rate)` error trials, re-shuffling until no run of
/// errors exceeds `max_consec_errors` and no run of correct trials exceeds
/// `max_consec_correct`.
///
/// Returns `(sequence, satisfied)`. When the attempt budget is exhausted the
/// last shuffle is returned with `satisfied == false`; the constraints are a
/// soft guarantee and the caller decides whether that is acceptable.
/// Reproducible only under a seeded `rng`.
pub fn generate_sequence<R: Rng + ?Sized>(
    n_trials: usize,
    error_rate: f64,
    max_consec_errors: usize,
    max_consec_correct: usize,
    rng: &mut R,
) -> (Vec<TrialType>, bool) {
    let n_errors = ((n_trials as f64) * error_rate).round() as usize;
    let n_errors = n_errors.min(n_trials);

    let mut sequence = vec![TrialType::Correct; n_trials - n_errors];
    sequence.extend(std::iter::repeat_n(TrialType::Error, n_errors));
    sequence.shuffle(rng);

    let mut attempts = 0;
    while !runs_within_limits(&sequence, max_consec_errors, max_consec_correct) {
        if attempts >= MAX_SHUFFLE_ATTEMPTS {
            return (sequence, false);
        }
        sequence.shuffle(rng);
        attempts += 1;
    }

    (sequence, true)
}

/// True when no run of either trial type exceeds its maximum.
pub fn runs_within_limits(
    sequence: &[TrialType],
    max_consec_errors: usize,
    max_consec_correct: usize,
) -> bool {
    let mut error_run = 0;
    let mut correct_run = 0;
    for trial_type in sequence {
        match trial_type {
            TrialType::Error => {
                error_run += 1;
                correct_run = 0;
                if error_run > max_consec_errors {
                    return false;
                }
            }
            TrialType::Correct => {
                correct_run += 1;
                error_run = 0;
                if correct_run > max_consec_correct {
                    return false;
                }
            }
        }
    }
    true
}

/// Picks a target index uniformly among indices at least `min_distance` away
/// from `start`. When no index satisfies the constraint, falls back to all
/// indices except `start` (the resolver guarantees that set is non-empty for
/// any configuration that reaches a trial).
pub fn target_position<R: Rng + ?Sized>(
    start: usize,
    n_positions: usize,
    min_distance: usize,
    rng: &mut R,
) -> usize {
    let candidates: Vec<usize> = (0..n_positions)
        .filter(|i| i.abs_diff(start) >= min_distance)
        .collect();

    let candidates = if candidates.is_empty() {
        (0..n_positions).filter(|&i| i != start).collect()
    } else {
        candidates
    };

    *candidates
        .choose(rng)
        .expect("n_positions >= 2 checked at startup")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn error_count(sequence: &[TrialType]) -> usize {
        sequence
            .iter()
            .filter(|t| **t == TrialType::Error)
            .count()
    }

    #[test]
    fn error_count_is_rounded_share() {
        let mut rng = StdRng::seed_from_u64(7);
        let (seq, _) = generate_sequence(80, 0.25, 3, 5, &mut rng);
        assert_eq!(seq.len(), 80);
        assert_eq!(error_count(&seq), 20);

        let (seq, _) = generate_sequence(10, 0.25, 3, 5, &mut rng);
        assert_eq!(error_count(&seq), 3); // 2.5 rounds away from zero
    }

    #[test]
    fn valid_sequence_within_budget_100_runs() {
        // n=10, rate 0.3, max runs 3/5: a satisfying shuffle is near-certain.
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let (seq, satisfied) = generate_sequence(10, 0.3, 3, 5, &mut rng);
            assert!(satisfied, "budget exhausted for seed {seed}");
            assert_eq!(seq.len(), 10);
            assert_eq!(error_count(&seq), 3);
            assert!(runs_within_limits(&seq, 3, 5));
        }
    }

    #[test]
    fn degenerate_lengths() {
        let mut rng = StdRng::seed_from_u64(1);
        let (seq, satisfied) = generate_sequence(0, 0.25, 3, 5, &mut rng);
        assert!(seq.is_empty());
        assert!(satisfied);

        let (seq, satisfied) = generate_sequence(1, 1.0, 3, 5, &mut rng);
        assert_eq!(seq, vec![TrialType::Error]);
        assert!(satisfied);
    }

    #[test]
    fn impossible_constraint_reports_soft_failure() {
        // All-correct sequence of 10 cannot avoid a run longer than 2.
        let mut rng = StdRng::seed_from_u64(3);
        let (seq, satisfied) = generate_sequence(10, 0.0, 3, 2, &mut rng);
        assert!(!satisfied);
        assert_eq!(seq.len(), 10);
        assert_eq!(error_count(&seq), 0);
    }

    #[test]
    fn run_length_scan() {
        use TrialType::{Correct as C, Error as E};
        assert!(runs_within_limits(&[C, C, E, E, C], 2, 2));
        assert!(!runs_within_limits(&[E, E, E], 2, 5));
        assert!(!runs_within_limits(&[C, C, C, C, C, C], 3, 5));
        assert!(runs_within_limits(&[], 1, 1));
    }

    #[test]
    fn target_respects_min_distance() {
        // start 10 of 20 with distance >= 3: indices 8..=12 are excluded.
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let idx = target_position(10, 20, 3, &mut rng);
            assert!(idx < 20);
            assert!(!(8..=12).contains(&idx), "forbidden index {idx}");
        }
    }

    #[test]
    fn target_falls_back_when_constraint_unsatisfiable() {
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            let idx = target_position(1, 4, 10, &mut rng);
            assert!(idx < 4);
            assert_ne!(idx, 1);
        }
    }
}
