//! Adam optimizer on ndarray parameters.
//!
//! A dense step updates every coefficient, a row step updates only the rows touched by a
//! mini batch (lazy Adam, moments of untouched rows are left as they are). Both share one step counter.

use ndarray::{Array2, ArrayView1, Zip};

/// Adam state for one parameter matrix
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// first moment
    m: Array2<f32>,
    /// second moment
    v: Array2<f32>,
    /// number of steps done
    t: i32,
} // end of Adam

impl Adam {
    /// usual values beta1 = 0.9, beta2 = 0.999, epsilon = 1.e-8
    pub fn new(shape: (usize, usize), lr: f32) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1.0e-8,
            m: Array2::zeros(shape),
            v: Array2::zeros(shape),
            t: 0,
        }
    }

    pub fn get_lr(&self) -> f32 {
        self.lr
    }

    // learning rate corrected for moments bias at current step
    fn corrected_lr(&mut self) -> f32 {
        self.t += 1;
        let b1 = 1. - self.beta1.powi(self.t);
        let b2 = 1. - self.beta2.powi(self.t);
        self.lr * b2.sqrt() / b1
    }

    /// param -= adam(grad) on all coefficients
    pub fn step(&mut self, param: &mut Array2<f32>, grad: &Array2<f32>) {
        assert_eq!(param.dim(), grad.dim());
        let lr_t = self.corrected_lr();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        Zip::from(param)
            .and(grad)
            .and(&mut self.m)
            .and(&mut self.v)
            .for_each(|p, g, m, v| {
                *m = beta1 * *m + (1. - beta1) * g;
                *v = beta2 * *v + (1. - beta2) * g * g;
                *p -= lr_t * *m / (v.sqrt() + eps);
            });
    } // end of step

    /// updates rows of param, grads[i] being the gradient of row rows[i]. rows must be distinct.
    pub fn step_rows(&mut self, param: &mut Array2<f32>, rows: &[usize], grads: &[ArrayView1<f32>]) {
        assert_eq!(rows.len(), grads.len());
        let lr_t = self.corrected_lr();
        let (beta1, beta2, eps) = (self.beta1, self.beta2, self.epsilon);
        for (row, grad) in rows.iter().zip(grads.iter()) {
            Zip::from(param.row_mut(*row))
                .and(grad)
                .and(self.m.row_mut(*row))
                .and(self.v.row_mut(*row))
                .for_each(|p, g, m, v| {
                    *m = beta1 * *m + (1. - beta1) * g;
                    *v = beta2 * *v + (1. - beta2) * g * g;
                    *p -= lr_t * *m / (v.sqrt() + eps);
                });
        }
    } // end of step_rows
} // end of impl Adam

// end of mod tests
