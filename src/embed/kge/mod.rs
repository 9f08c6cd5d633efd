//! Knowledge graph factorization : entities and relations are vectors, an interaction function
//! scores the plausibility of a triple (head, relation, tail).
//!
//! Training is a stochastic local closed world one :
//! - triples are split 80/10/10 keeping every entity and relation in training
//!   (see [coverage_split](crate::tools::triples::coverage_split)).
//! - each training triple is paired with one corruption, its head or its tail replaced by a uniformly drawn entity.
//! - loss is the margin ranking loss max(0, margin - score(pos) + score(neg)) averaged on mini batches,
//!   optimized with Adam on the rows touched by the batch.
//! - entity rows are renormalized to unit L2 norm after each update.
//!
//! After training, filtered rank metrics on the test split are logged. The returned table
//! has all graph nodes, a node without edges keeps its initial vector.

use std::marker::PhantomData;
use std::time::SystemTime;

use ahash::AHashSet;
use cpu_time::ProcessTime;
use indexmap::IndexMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};

use rand::distributions::{Distribution, Uniform};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::embed::optim::Adam;
use crate::embedder::EmbedderT;
use crate::embedding::EmbeddingTable;
use crate::errors::{EmbedError, Result};
use crate::graph::KGraph;
use crate::tools::idmap::IdMap;
use crate::tools::triples::{coverage_split, extract_triples, triple_keys, Triple};
use crate::validation::rank::RankMetrics;

pub mod distmult;
pub mod params;
pub mod transe;

pub use params::KgeParams;

/// The interaction function of a factorization model
pub trait Interaction: Send + Sync + 'static {
    /// model name
    const NAME: &'static str;
    /// plausibility of (h, r, t), higher is better
    fn score(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> f32;
    /// gradient of score with respect to h, r and t
    fn gradient(h: ArrayView1<f32>, r: ArrayView1<f32>, t: ArrayView1<f32>) -> (Array1<f32>, Array1<f32>, Array1<f32>);
} // end of trait Interaction

/// entity and relation vectors
pub(crate) struct KgeModel<I: Interaction> {
    entities: Array2<f32>,
    relations: Array2<f32>,
    _interaction: PhantomData<I>,
}

impl<I: Interaction> KgeModel<I> {
    fn new(nb_entities: usize, nb_relations: usize, dimension: usize, rng: &mut Xoshiro256PlusPlus) -> Self {
        let bound = 6. / (dimension as f32).sqrt();
        let init = Uniform::new(-bound, bound);
        let mut entities = Array2::from_shape_fn((nb_entities, dimension), |_| init.sample(rng));
        let mut relations = Array2::from_shape_fn((nb_relations, dimension), |_| init.sample(rng));
        for row in entities.rows_mut() {
            normalize(row);
        }
        for row in relations.rows_mut() {
            normalize(row);
        }
        KgeModel {
            entities,
            relations,
            _interaction: PhantomData,
        }
    }

    pub(crate) fn score(&self, triple: &Triple) -> f32 {
        I::score(
            self.entities.row(triple.head),
            self.relations.row(triple.relation),
            self.entities.row(triple.tail),
        )
    }

    /// mean margin ranking loss of positives against their corruptions
    fn margin_loss(&self, positives: &[Triple], negatives: &[Triple], margin: f32) -> f64 {
        if positives.is_empty() {
            return 0.;
        }
        let loss: f64 = positives
            .iter()
            .zip(negatives.iter())
            .map(|(p, n)| (margin - self.score(p) + self.score(n)).max(0.) as f64)
            .sum();
        loss / positives.len() as f64
    }

    // adds coef * gradient of score(triple) to row gradients
    fn accumulate(
        &self,
        triple: &Triple,
        coef: f32,
        ent_grads: &mut IndexMap<usize, Array1<f32>>,
        rel_grads: &mut IndexMap<usize, Array1<f32>>,
    ) {
        let dim = self.entities.ncols();
        let (gh, gr, gt) = I::gradient(
            self.entities.row(triple.head),
            self.relations.row(triple.relation),
            self.entities.row(triple.tail),
        );
        ent_grads
            .entry(triple.head)
            .or_insert_with(|| Array1::zeros(dim))
            .scaled_add(coef, &gh);
        ent_grads
            .entry(triple.tail)
            .or_insert_with(|| Array1::zeros(dim))
            .scaled_add(coef, &gt);
        rel_grads
            .entry(triple.relation)
            .or_insert_with(|| Array1::zeros(dim))
            .scaled_add(coef, &gr);
    } // end of accumulate

    /// one Adam step on a batch, returns the mean loss of the batch
    fn train_batch(
        &mut self,
        positives: &[Triple],
        negatives: &[Triple],
        margin: f32,
        ent_adam: &mut Adam,
        rel_adam: &mut Adam,
    ) -> f64 {
        let mut ent_grads = IndexMap::<usize, Array1<f32>>::new();
        let mut rel_grads = IndexMap::<usize, Array1<f32>>::new();
        let coef = 1. / positives.len() as f32;
        let mut loss = 0f64;
        for (pos, neg) in positives.iter().zip(negatives.iter()) {
            let l = margin - self.score(pos) + self.score(neg);
            if l > 0. {
                loss += l as f64;
                // minimizing -score(pos) + score(neg)
                self.accumulate(pos, -coef, &mut ent_grads, &mut rel_grads);
                self.accumulate(neg, coef, &mut ent_grads, &mut rel_grads);
            }
        }
        if !ent_grads.is_empty() {
            let rows: Vec<usize> = ent_grads.keys().copied().collect();
            let grads: Vec<ArrayView1<f32>> = ent_grads.values().map(|g| g.view()).collect();
            ent_adam.step_rows(&mut self.entities, &rows, &grads);
            for row in rows {
                normalize(self.entities.row_mut(row));
            }
        }
        if !rel_grads.is_empty() {
            let rows: Vec<usize> = rel_grads.keys().copied().collect();
            let grads: Vec<ArrayView1<f32>> = rel_grads.values().map(|g| g.view()).collect();
            rel_adam.step_rows(&mut self.relations, &rows, &grads);
        }
        loss / positives.len() as f64
    } // end of train_batch
} // end of impl KgeModel

fn normalize(mut row: ArrayViewMut1<f32>) {
    let norm = row.dot(&row).sqrt();
    if norm > 0. {
        row.mapv_inplace(|x| x / norm);
    }
}

/// replaces head or tail (with probability 1/2) by a uniform entity
fn corrupt(triple: &Triple, entity_law: &Uniform<usize>, rng: &mut Xoshiro256PlusPlus) -> Triple {
    let entity = entity_law.sample(rng);
    if rng.gen_bool(0.5) {
        Triple::new(entity, triple.relation, triple.tail)
    } else {
        Triple::new(triple.head, triple.relation, entity)
    }
}

/// what a training run produces
pub(crate) struct KgeFit<I: Interaction> {
    pub(crate) idmap: IdMap,
    pub(crate) model: KgeModel<I>,
    /// mean training loss by epoch
    pub(crate) train_losses: Vec<f64>,
    pub(crate) metrics: RankMetrics,
}

/// A factorization strategy parametrized by its interaction function.
/// See [TransE](transe::TransE) and [DistMult](distmult::DistMult).
pub struct KgeEmbedder<I: Interaction> {
    params: KgeParams,
    seed: u64,
    _interaction: PhantomData<I>,
}

impl<I: Interaction> KgeEmbedder<I> {
    pub fn new(params: KgeParams, seed: u64) -> Self {
        KgeEmbedder {
            params,
            seed,
            _interaction: PhantomData,
        }
    }

    pub fn get_params(&self) -> &KgeParams {
        &self.params
    }

    pub(crate) fn fit(&self, graph: &KGraph, epochs: usize) -> Result<KgeFit<I>> {
        let name = I::NAME;
        let dimension = self.params.get_dimension();
        if dimension == 0 || self.params.get_batch_size() == 0 {
            return Err(EmbedError::training(name, "dimension and batch size must be positive"));
        }
        let idmap = IdMap::from_graph(graph);
        let triples = extract_triples(graph, &idmap)?;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let split = coverage_split(&triples, triple_keys, &mut rng, name)?;
        let nb_entities = idmap.get_nb_nodes();
        let mut model = KgeModel::<I>::new(nb_entities, idmap.get_nb_relations(), dimension, &mut rng);
        let lr = self.params.get_learning_rate();
        let mut ent_adam = Adam::new(model.entities.dim(), lr);
        let mut rel_adam = Adam::new(model.relations.dim(), lr);
        let margin = self.params.get_margin();
        let entity_law = Uniform::new(0, nb_entities);
        // validation corruptions are drawn once
        let valid_negatives: Vec<Triple> = split
            .valid
            .iter()
            .map(|t| corrupt(t, &entity_law, &mut rng))
            .collect();
        //
        let mut train_losses = Vec::<f64>::with_capacity(epochs);
        let mut order: Vec<usize> = (0..split.train.len()).collect();
        for epoch in 0..epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0f64;
            for chunk in order.chunks(self.params.get_batch_size()) {
                let positives: Vec<Triple> = chunk.iter().map(|i| split.train[*i]).collect();
                let negatives: Vec<Triple> = positives
                    .iter()
                    .map(|t| corrupt(t, &entity_law, &mut rng))
                    .collect();
                let loss = model.train_batch(&positives, &negatives, margin, &mut ent_adam, &mut rel_adam);
                epoch_loss += loss * positives.len() as f64;
            }
            let train_loss = epoch_loss / split.train.len() as f64;
            let valid_loss = model.margin_loss(&split.valid, &valid_negatives, margin);
            log::info!(
                "{} epoch {}, train loss : {:.5e}, validation loss : {:.5e}",
                name,
                epoch,
                train_loss,
                valid_loss
            );
            if !train_loss.is_finite() {
                log::error!("{} diverged at epoch {}", name, epoch);
                return Err(EmbedError::training(name, format!("loss diverged at epoch {}", epoch)));
            }
            train_losses.push(train_loss);
        }
        //
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let known: AHashSet<Triple> = triples.iter().copied().collect();
        let metrics = RankMetrics::compute(&split.test, &known, nb_entities, |h, r, t| {
            model.score(&Triple::new(h, r, t))
        });
        log::info!(
            "{} test evaluation on {} triples, mrr : {:.3e}, hits@1 : {:.3e}, hits@3 : {:.3e}, hits@10 : {:.3e}",
            name,
            split.test.len(),
            metrics.mrr,
            metrics.hits_at_1,
            metrics.hits_at_3,
            metrics.hits_at_10
        );
        log::debug!(
            "evaluation sys time(ms) {:?} cpu time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        Ok(KgeFit {
            idmap,
            model,
            train_losses,
            metrics,
        })
    } // end of fit
} // end of impl KgeEmbedder

impl<I: Interaction> EmbedderT for KgeEmbedder<I> {
    fn name(&self) -> &'static str {
        I::NAME
    }

    fn embed(&mut self, graph: &KGraph, epochs: usize) -> Result<EmbeddingTable> {
        log::info!("{}::embed, epochs : {}, params : {:?}", I::NAME, epochs, self.params);
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let fit = self.fit(graph, epochs)?;
        log::info!(
            "{}::embed done, sys time(ms) {:?} cpu time(ms) {:?}",
            I::NAME,
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        EmbeddingTable::new(I::NAME, fit.idmap.into_node_indexation(), fit.model.entities)
    }
} // end of impl EmbedderT for KgeEmbedder

//=====================================================================================

// end of mod tests
