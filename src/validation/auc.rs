//! Area under the ROC curve of a scored, labeled set of pairs.
//!
//! Computed exactly from the rank sum of positives (Mann-Whitney statistic), tied scores
//! getting their average rank.

use crate::errors::{EmbedError, Result};

/// labels\[i\] is true for a positive item, scores\[i\] is its score (higher means more likely positive).
/// Fails if lengths differ, a score is not finite, or one class is absent.
pub fn roc_auc(model: &str, labels: &[bool], scores: &[f32]) -> Result<f64> {
    if labels.len() != scores.len() {
        return Err(EmbedError::training(
            model,
            format!("auc : {} labels for {} scores", labels.len(), scores.len()),
        ));
    }
    if scores.iter().any(|s| !s.is_finite()) {
        return Err(EmbedError::training(model, "auc : non finite score"));
    }
    let nb_pos = labels.iter().filter(|l| **l).count();
    let nb_neg = labels.len() - nb_pos;
    if nb_pos == 0 || nb_neg == 0 {
        log::error!("roc_auc : {} positives, {} negatives", nb_pos, nb_neg);
        return Err(EmbedError::training(
            model,
            format!("auc needs both classes, got {} positives and {} negatives", nb_pos, nb_neg),
        ));
    }
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_unstable_by(|a, b| scores[*a].total_cmp(&scores[*b]));
    // sum of ranks (1 based) of positives, ties get their mean rank
    let mut pos_rank_sum = 0.0f64;
    let mut i = 0;
    while i < order.len() {
        let mut j = i + 1;
        while j < order.len() && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let mean_rank = (i + 1 + j) as f64 / 2.;
        let nb_pos_tied = order[i..j].iter().filter(|k| labels[**k]).count();
        pos_rank_sum += mean_rank * nb_pos_tied as f64;
        i = j;
    }
    let nb_pos = nb_pos as f64;
    let auc = (pos_rank_sum - nb_pos * (nb_pos + 1.) / 2.) / (nb_pos * nb_neg as f64);
    Ok(auc)
} // end of roc_auc

// end of mod tests
