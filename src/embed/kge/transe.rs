//! Translational model : a relation is a translation from head to tail, score(h, r, t) = -‖h + r − t‖₁

use ndarray::{Array1, ArrayView1, Zip};

use super::{Interaction, KgeEmbedder};
use crate::embedder::TRANSE;

pub struct TransEInteraction;

impl Interaction for TransEInteraction {
    const NAME: &'static str = TRANSE;

    fn score(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> f32 {
        let mut dist = 0.;
        Zip::from(&h).and(&r).and(&t).for_each(|h, r, t| dist += (h + r - t).abs());
        -dist
    }

    fn gradient(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>, Array1<f32>) {
        // sign of h + r - t, 0 at 0
        let sign = Zip::from(&h).and(&r).and(&t).map_collect(|h, r, t| {
            let d = h + r - t;
            if d > 0. {
                1f32
            } else if d < 0. {
                -1.
            } else {
                0.
            }
        });
        let neg = sign.mapv(|s| -s);
        (neg.clone(), neg, sign)
    }
} // end of impl Interaction for TransEInteraction

/// The TransE strategy
pub type TransE = KgeEmbedder<TransEInteraction>;

// end of mod tests
