//! Filtered rank metrics for link prediction on triples.
//!
//! For each test triple (h, r, t) both the tail and the head are predicted : the true entity is ranked
//! among all entities, candidates giving a known triple (train, validation or test) other than the tested
//! one being filtered out. Ties count for half (mean of optimistic and pessimistic ranks).
//! We report the mean reciprocal rank and hits@1, 3, 10.

use ahash::AHashSet;
use rayon::prelude::*;

use crate::tools::triples::Triple;

/// mean reciprocal rank and hits@k over all head and tail predictions
#[derive(Copy, Clone, Debug, Default)]
pub struct RankMetrics {
    pub mrr: f64,
    pub hits_at_1: f64,
    pub hits_at_3: f64,
    pub hits_at_10: f64,
    /// number of ranks computed (2 by test triple)
    pub nb_ranks: usize,
}

impl RankMetrics {
    /// score(h, r, t) is the plausibility of triple, higher is better.
    pub fn compute<S>(test: &[Triple], known: &AHashSet<Triple>, nb_entities: usize, score: S) -> Self
    where
        S: Fn(usize, usize, usize) -> f32 + Sync,
    {
        if test.is_empty() {
            return RankMetrics::default();
        }
        let ranks: Vec<f64> = test
            .par_iter()
            .flat_map_iter(|triple| {
                let tail_rank = filtered_rank(triple, known, nb_entities, &score, false);
                let head_rank = filtered_rank(triple, known, nb_entities, &score, true);
                [tail_rank, head_rank]
            })
            .collect();
        let nb = ranks.len() as f64;
        let hits = |k: f64| ranks.iter().filter(|r| **r <= k).count() as f64 / nb;
        RankMetrics {
            mrr: ranks.iter().map(|r| 1. / r).sum::<f64>() / nb,
            hits_at_1: hits(1.),
            hits_at_3: hits(3.),
            hits_at_10: hits(10.),
            nb_ranks: ranks.len(),
        }
    } // end of compute
} // end of impl RankMetrics

// rank of the true head (corrupt_head = true) or tail among filtered candidates
fn filtered_rank<S>(triple: &Triple, known: &AHashSet<Triple>, nb_entities: usize, score: &S, corrupt_head: bool) -> f64
where
    S: Fn(usize, usize, usize) -> f32,
{
    let true_score = score(triple.head, triple.relation, triple.tail);
    let mut nb_greater: usize = 0;
    let mut nb_equal: usize = 0;
    for e in 0..nb_entities {
        let candidate = if corrupt_head {
            Triple::new(e, triple.relation, triple.tail)
        } else {
            Triple::new(triple.head, triple.relation, e)
        };
        if candidate == *triple || known.contains(&candidate) {
            continue;
        }
        let s = score(candidate.head, candidate.relation, candidate.tail);
        if s > true_score {
            nb_greater += 1;
        } else if s == true_score {
            nb_equal += 1;
        }
    }
    1. + nb_greater as f64 + nb_equal as f64 / 2.
} // end of filtered_rank

// end of mod tests
