//! Bilinear diagonal model, score(h, r, t) = Σ h·r·t. The score is symmetric in head and tail.

use ndarray::{Array1, ArrayView1, Zip};

use super::{Interaction, KgeEmbedder};
use crate::embedder::DISTMULT;

pub struct DistMultInteraction;

impl Interaction for DistMultInteraction {
    const NAME: &'static str = DISTMULT;

    fn score(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> f32 {
        let mut s = 0.;
        Zip::from(&h).and(&r).and(&t).for_each(|h, r, t| s += h * r * t);
        s
    }

    fn gradient(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>, Array1<f32>) {
        (&r * &t, &h * &t, &h * &r)
    }
} // end of impl Interaction for DistMultInteraction

/// The DistMult strategy
pub type DistMult = KgeEmbedder<DistMultInteraction>;

#[cfg(test)]
mod tests {

    use super::*;
    use crate::embed::kge::tests::check_gradient;
    use crate::embed::kge::KgeParams;
    use crate::embedder::EmbedderT;
    use crate::graph::testgraph;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_distmult_score() {
        let h = array![1f32, 2.];
        let r = array![0.5f32, -1.];
        let t = array![4f32, 1.];
        assert_eq!(DistMultInteraction::score(h.view(), r.view(), t.view()), 0.);
        assert_eq!(
            DistMultInteraction::score(h.view(), r.view(), t.view()),
            DistMultInteraction::score(t.view(), r.view(), h.view())
        );
        check_gradient::<DistMultInteraction>();
    }

    #[test]
    fn test_distmult_embed() {
        log_init_test();
        //
        let graph = testgraph::with_isolated();
        let mut embedder = DistMult::new(KgeParams::new(20, 0.01, 4, 1.), 5);
        assert_eq!(embedder.name(), DISTMULT);
        let table = embedder.embed(&graph, 5).unwrap();
        // isolated node keeps its initial vector
        assert_eq!(table.get_nb_nodes(), graph.nb_nodes());
        assert_eq!(table.get_dimension(), 20);
        assert!(table.contains("orphan"));
        assert_eq!(table.get_model(), DISTMULT);
    }

    #[test]
    fn test_seed_determinism() {
        log_init_test();
        //
        let graph = testgraph::scenario_a();
        let t1 = DistMult::new(KgeParams::default(), 9).embed(&graph, 2).unwrap();
        let t2 = DistMult::new(KgeParams::default(), 9).embed(&graph, 2).unwrap();
        assert_eq!(t1.get_embedded_data(), t2.get_embedded_data());
    }
} // end of mod tests
