use crate::descriptor::Descriptor;

/// Maximum Euclidean distance accepted as a positive identity match.
/// Exclusive: a candidate at exactly this distance is rejected.
pub const MATCH_THRESHOLD: f64 = 0.6;

/// An enrolled (identity, descriptor) pair, the unit of the candidate set.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub user_id: i64,
    pub descriptor: Descriptor,
}

/// Outcome of matching one probe descriptor against a candidate set.
/// Transient; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The candidate set was empty.
    NoEnrollment,
    /// A nearest candidate exists but its distance is not under the
    /// threshold. Carries the nearest distance for logging.
    NoMatch { nearest: f64 },
    /// Positive match under the threshold.
    Match { user_id: i64, distance: f64 },
}

impl MatchOutcome {
    /// Display confidence for a given distance: `(1 - d) * 100`.
    /// A heuristic percentage, not a probability; negative for d > 1.
    pub fn confidence(distance: f64) -> f64 {
        (1.0 - distance) * 100.0
    }
}

/// Strategy for matching a probe descriptor against enrolled candidates.
pub trait Matcher {
    fn find_match(&self, probe: &Descriptor, candidates: &[Candidate]) -> MatchOutcome;
}

/// Nearest-neighbour matcher over Euclidean distance.
///
/// Finds the true global minimum distance first, then accepts it only if
/// strictly under the threshold. Ties at the minimum keep the first-seen
/// candidate, so the result is deterministic for a deterministically
/// ordered candidate set.
#[derive(Debug, Clone, Copy)]
pub struct NearestMatcher {
    pub threshold: f64,
}

impl Default for NearestMatcher {
    fn default() -> Self {
        Self {
            threshold: MATCH_THRESHOLD,
        }
    }
}

impl Matcher for NearestMatcher {
    fn find_match(&self, probe: &Descriptor, candidates: &[Candidate]) -> MatchOutcome {
        let mut best: Option<(i64, f64)> = None;

        for candidate in candidates {
            let distance = probe.distance(&candidate.descriptor);
            let is_better = match best {
                None => true,
                Some((_, best_distance)) => distance < best_distance,
            };
            if is_better {
                best = Some((candidate.user_id, distance));
            }
        }

        match best {
            None => MatchOutcome::NoEnrollment,
            Some((user_id, distance)) if distance < self.threshold => {
                MatchOutcome::Match { user_id, distance }
            }
            Some((_, nearest)) => MatchOutcome::NoMatch { nearest },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DESCRIPTOR_DIMENSIONS;

    fn desc(fill: f64) -> Descriptor {
        Descriptor::new(vec![fill; DESCRIPTOR_DIMENSIONS]).unwrap()
    }

    /// Descriptor at a chosen Euclidean distance from the all-zero probe.
    fn desc_at_distance(d: f64) -> Descriptor {
        let mut values = vec![0.0; DESCRIPTOR_DIMENSIONS];
        values[0] = d;
        Descriptor::new(values).unwrap()
    }

    #[test]
    fn test_empty_candidates_is_no_enrollment() {
        let outcome = NearestMatcher::default().find_match(&desc(0.5), &[]);
        assert_eq!(outcome, MatchOutcome::NoEnrollment);
    }

    #[test]
    fn test_exact_match_distance_zero() {
        let probe = desc(0.3);
        let candidates = vec![
            Candidate { user_id: 1, descriptor: desc(0.9) },
            Candidate { user_id: 2, descriptor: desc(0.3) },
        ];
        let outcome = NearestMatcher::default().find_match(&probe, &candidates);
        assert_eq!(outcome, MatchOutcome::Match { user_id: 2, distance: 0.0 });
        assert_eq!(MatchOutcome::confidence(0.0), 100.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let probe = desc_at_distance(0.0);
        let candidates = vec![Candidate { user_id: 1, descriptor: desc_at_distance(0.6) }];
        let outcome = NearestMatcher::default().find_match(&probe, &candidates);
        assert_eq!(outcome, MatchOutcome::NoMatch { nearest: 0.6 });

        let candidates = vec![Candidate { user_id: 1, descriptor: desc_at_distance(0.59) }];
        let outcome = NearestMatcher::default().find_match(&probe, &candidates);
        assert_eq!(outcome, MatchOutcome::Match { user_id: 1, distance: 0.59 });
    }

    #[test]
    fn test_never_matches_at_or_beyond_threshold() {
        let probe = desc_at_distance(0.0);
        for d in [0.6, 0.61, 1.0, 5.0] {
            let candidates = vec![Candidate { user_id: 1, descriptor: desc_at_distance(d) }];
            match NearestMatcher::default().find_match(&probe, &candidates) {
                MatchOutcome::NoMatch { nearest } => assert!((nearest - d).abs() < 1e-12),
                other => panic!("unexpected outcome for d={d}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_global_minimum_wins_even_when_out_of_threshold() {
        // An in-threshold candidate scanned first must NOT be promoted when
        // an even nearer candidate exists: the global minimum decides, and
        // here it is in-threshold too.
        let probe = desc_at_distance(0.0);
        let candidates = vec![
            Candidate { user_id: 1, descriptor: desc_at_distance(0.5) },
            Candidate { user_id: 2, descriptor: desc_at_distance(0.1) },
        ];
        let outcome = NearestMatcher::default().find_match(&probe, &candidates);
        assert_eq!(outcome, MatchOutcome::Match { user_id: 2, distance: 0.1 });
    }

    #[test]
    fn test_out_of_threshold_minimum_suppresses_in_threshold_runner_up() {
        // Nearest candidate is out of threshold; a farther candidate being
        // in-threshold is irrelevant. A scan-order-dependent matcher could
        // keep a provisional in-threshold match here; we never do.
        let probe = desc_at_distance(0.0);
        let candidates = vec![
            Candidate { user_id: 1, descriptor: desc_at_distance(0.55) },
            Candidate { user_id: 2, descriptor: desc_at_distance(0.3) },
        ];
        // Sanity: both in threshold, nearest wins.
        assert_eq!(
            NearestMatcher::default().find_match(&probe, &candidates),
            MatchOutcome::Match { user_id: 2, distance: 0.3 }
        );

        let candidates = vec![
            Candidate { user_id: 1, descriptor: desc_at_distance(0.7) },
            Candidate { user_id: 2, descriptor: desc_at_distance(0.65) },
        ];
        assert_eq!(
            NearestMatcher::default().find_match(&probe, &candidates),
            MatchOutcome::NoMatch { nearest: 0.65 }
        );
    }

    #[test]
    fn test_tie_keeps_first_seen() {
        let probe = desc_at_distance(0.0);
        let candidates = vec![
            Candidate { user_id: 7, descriptor: desc_at_distance(0.2) },
            Candidate { user_id: 8, descriptor: desc_at_distance(0.2) },
        ];
        let outcome = NearestMatcher::default().find_match(&probe, &candidates);
        assert_eq!(outcome, MatchOutcome::Match { user_id: 7, distance: 0.2 });
    }

    #[test]
    fn test_confidence_can_go_negative() {
        assert!(MatchOutcome::confidence(1.2) < 0.0);
        assert_eq!(MatchOutcome::confidence(0.5), 50.0);
    }
}
