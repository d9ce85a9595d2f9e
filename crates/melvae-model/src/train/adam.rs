//! Adam optimizer with bias correction.

use crate::params::ModelParameters;

/// Exponential decay rate of the first moment.
pub const BETA1: f64 = 0.9;
/// Exponential decay rate of the second moment.
pub const BETA2: f64 = 0.999;
/// Denominator stabilizer.
pub const EPSILON: f64 = 1e-8;

/// Adam state: one first- and second-moment estimate per parameter.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    steps: u64,
    first_moment: ModelParameters,
    second_moment: ModelParameters,
}

impl Adam {
    /// Creates zeroed moments shaped like `params`.
    pub fn new(learning_rate: f64, params: &ModelParameters) -> Self {
        Self {
            learning_rate,
            steps: 0,
            first_moment: params.zeros_like(),
            second_moment: params.zeros_like(),
        }
    }

    /// Step size.
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Applies one update of `params` against `grads`.
    pub fn step(&mut self, params: &mut ModelParameters, grads: &ModelParameters) {
        self.steps += 1;
        let t = self.steps as f64;
        let hyper = Hyper {
            learning_rate: self.learning_rate,
            correction1: 1.0 - BETA1.powf(t),
            correction2: 1.0 - BETA2.powf(t),
        };

        let layers = params
            .layers_mut()
            .into_iter()
            .zip(grads.layers())
            .zip(self.first_moment.layers_mut())
            .zip(self.second_moment.layers_mut());
        for (((p, g), m), v) in layers {
            hyper.update(
                p.weights.as_mut_slice(),
                g.weights.as_slice(),
                m.weights.as_mut_slice(),
                v.weights.as_mut_slice(),
            );
            hyper.update(
                p.bias.as_mut_slice(),
                g.bias.as_slice(),
                m.bias.as_mut_slice(),
                v.bias.as_mut_slice(),
            );
        }
    }
}

struct Hyper {
    learning_rate: f64,
    correction1: f64,
    correction2: f64,
}

impl Hyper {
    fn update(&self, params: &mut [f64], grads: &[f64], m: &mut [f64], v: &mut [f64]) {
        for (((p, &g), m), v) in params.iter_mut().zip(grads).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = BETA1 * *m + (1.0 - BETA1) * g;
            *v = BETA2 * *v + (1.0 - BETA2) * g * g;
            let m_hat = *m / self.correction1;
            let v_hat = *v / self.correction2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melvae_spec::{ModelConfig, SegmentShape};

    fn config() -> ModelConfig {
        ModelConfig {
            segment_shape: SegmentShape::new(2, 2),
            latent_dimension: 1,
            hidden_layers: vec![],
            ..Default::default()
        }
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let cfg = config();
        let mut params = ModelParameters::zeros(&cfg);
        let mut grads = ModelParameters::zeros(&cfg);
        grads.output.bias[0] = 3.0;
        grads.output.bias[1] = -0.01;

        let mut adam = Adam::new(0.1, &params);
        adam.step(&mut params, &grads);
        assert_eq!(adam.steps(), 1);
        // Bias-corrected first step is lr * sign(g) for |g| >> epsilon.
        assert!((params.output.bias[0] + 0.1).abs() < 1e-6);
        assert!((params.output.bias[1] - 0.1).abs() < 1e-4);
        assert_eq!(params.output.bias[2], 0.0);
    }

    #[test]
    fn test_minimizes_quadratic() {
        let cfg = config();
        let mut params = ModelParameters::zeros(&cfg);
        let mut adam = Adam::new(0.05, &params);
        // Loss (x - 2)^2 on a single weight.
        for _ in 0..500 {
            let mut grads = params.zeros_like();
            grads.mean_head.weights[(0, 0)] = 2.0 * (params.mean_head.weights[(0, 0)] - 2.0);
            adam.step(&mut params, &grads);
        }
        assert!((params.mean_head.weights[(0, 0)] - 2.0).abs() < 0.05);
    }
}
