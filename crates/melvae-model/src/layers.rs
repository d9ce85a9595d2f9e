//! Dense layers and ReLU stacks with forward traces for backpropagation.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// A fully connected layer computing `weights * x + bias`.
///
/// `weights` is `outputs x inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix (`outputs x inputs`).
    pub weights: DMatrix<f64>,
    /// Bias vector (`outputs`).
    pub bias: DVector<f64>,
}

impl DenseLayer {
    /// Creates a layer with all weights and biases zero.
    pub fn zeros(inputs: usize, outputs: usize) -> Self {
        Self {
            weights: DMatrix::zeros(outputs, inputs),
            bias: DVector::zeros(outputs),
        }
    }

    /// He-normal initialization: weights ~ N(0, 2 / inputs), zero biases.
    pub fn he_normal<R: Rng + ?Sized>(inputs: usize, outputs: usize, rng: &mut R) -> Self {
        let std = (2.0 / inputs.max(1) as f64).sqrt();
        let weights = DMatrix::from_fn(outputs, inputs, |_, _| {
            let v: f64 = StandardNormal.sample(rng);
            v * std
        });
        Self {
            weights,
            bias: DVector::zeros(outputs),
        }
    }

    /// A zero layer with the same shape.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.inputs(), self.outputs())
    }

    /// Input width.
    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    /// Output width.
    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    /// Number of weights plus biases.
    pub fn num_parameters(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Whether the bias length agrees with the weight rows.
    pub fn is_consistent(&self) -> bool {
        self.bias.len() == self.weights.nrows()
    }

    /// Pre-activation output for `x`.
    pub fn forward(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.weights * x + &self.bias
    }

    /// Adds the gradient for one example: `delta * input^T` to the weights
    /// and `delta` to the bias.
    pub fn accumulate(&mut self, delta: &DVector<f64>, input: &DVector<f64>) {
        self.weights.ger(1.0, delta, input, 1.0);
        self.bias += delta;
    }

    /// Multiplies every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.weights *= factor;
        self.bias *= factor;
    }

    /// Sum of squared values.
    pub fn squared_norm(&self) -> f64 {
        self.weights.norm_squared() + self.bias.norm_squared()
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.weights.iter().chain(self.bias.iter()).all(|v| v.is_finite())
    }
}

/// Logistic sigmoid.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Layer inputs and pre-activations recorded by [`relu_stack_forward`].
#[derive(Debug, Clone, Default)]
pub struct StackTrace {
    inputs: Vec<DVector<f64>>,
    pre_activations: Vec<DVector<f64>>,
}

/// Runs `input` through `layers`, applying ReLU after each.
pub fn relu_stack(layers: &[DenseLayer], input: DVector<f64>) -> DVector<f64> {
    layers
        .iter()
        .fold(input, |x, layer| layer.forward(&x).map(|v| v.max(0.0)))
}

/// Like [`relu_stack`], also returning the trace needed by
/// [`relu_stack_backward`].
pub fn relu_stack_forward(
    layers: &[DenseLayer],
    input: DVector<f64>,
) -> (DVector<f64>, StackTrace) {
    let mut trace = StackTrace {
        inputs: Vec::with_capacity(layers.len()),
        pre_activations: Vec::with_capacity(layers.len()),
    };
    let mut x = input;
    for layer in layers {
        let pre = layer.forward(&x);
        let out = pre.map(|v| v.max(0.0));
        trace.inputs.push(x);
        trace.pre_activations.push(pre);
        x = out;
    }
    (x, trace)
}

/// Backpropagates `grad_output` through a ReLU stack, accumulating layer
/// gradients into `grads` (same layout as `layers`). Returns the gradient
/// with respect to the stack input.
pub fn relu_stack_backward(
    layers: &[DenseLayer],
    trace: &StackTrace,
    grad_output: DVector<f64>,
    grads: &mut [DenseLayer],
) -> DVector<f64> {
    let mut grad = grad_output;
    for i in (0..layers.len()).rev() {
        let delta = grad.zip_map(&trace.pre_activations[i], |g, pre| {
            if pre > 0.0 {
                g
            } else {
                0.0
            }
        });
        grads[i].accumulate(&delta, &trace.inputs[i]);
        grad = layers[i].weights.tr_mul(&delta);
    }
    grad
}
