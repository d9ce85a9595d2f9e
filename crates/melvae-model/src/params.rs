//! Learned parameters of the VAE and the layer layout a config implies.

use std::fmt;

use melvae_spec::ModelConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{VaeError, VaeResult};
use crate::layers::DenseLayer;

/// Name and dimensions of one dense layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerShape {
    /// Layer name, e.g. `encoder.dense_0`.
    pub name: String,
    /// Input width.
    pub inputs: usize,
    /// Output width.
    pub outputs: usize,
}

impl LayerShape {
    fn new(name: impl Into<String>, inputs: usize, outputs: usize) -> Self {
        Self {
            name: name.into(),
            inputs,
            outputs,
        }
    }

    /// Number of weights plus biases.
    pub fn num_parameters(&self) -> usize {
        self.inputs * self.outputs + self.outputs
    }
}

impl fmt::Display for LayerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.name, self.inputs, self.outputs)
    }
}

/// The layer layout implied by `config`, in parameter order.
///
/// Encoder: flattened input, then each hidden width, then the mean and
/// log-variance heads. Decoder: latent (plus conditioning), hidden widths in
/// reverse, then the output layer back to the flattened segment.
pub fn architecture(config: &ModelConfig) -> Vec<LayerShape> {
    let mut shapes = Vec::with_capacity(2 * config.hidden_layers.len() + 3);

    let mut width = config.input_dimension();
    for (i, &hidden) in config.hidden_layers.iter().enumerate() {
        shapes.push(LayerShape::new(format!("encoder.dense_{}", i), width, hidden));
        width = hidden;
    }
    shapes.push(LayerShape::new("encoder.mean", width, config.latent_dimension));
    shapes.push(LayerShape::new("encoder.log_var", width, config.latent_dimension));

    let mut width = config.decoder_input_dimension();
    for (i, &hidden) in config.hidden_layers.iter().rev().enumerate() {
        shapes.push(LayerShape::new(format!("decoder.dense_{}", i), width, hidden));
        width = hidden;
    }
    shapes.push(LayerShape::new("decoder.output", width, config.input_dimension()));
    shapes
}

/// All learned weights of the encoder and decoder.
///
/// Inference borrows this immutably; only the trainer mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    /// Encoder hidden layers (ReLU).
    pub encoder_hidden: Vec<DenseLayer>,
    /// Posterior mean head.
    pub mean_head: DenseLayer,
    /// Posterior log-variance head.
    pub log_var_head: DenseLayer,
    /// Decoder hidden layers (ReLU).
    pub decoder_hidden: Vec<DenseLayer>,
    /// Decoder output layer (sigmoid).
    pub output: DenseLayer,
}

impl ModelParameters {
    /// He-normal weights and zero biases for the layout of `config`.
    pub fn initialize<R: Rng + ?Sized>(config: &ModelConfig, rng: &mut R) -> Self {
        Self::from_shapes(config, |shape| {
            DenseLayer::he_normal(shape.inputs, shape.outputs, rng)
        })
    }

    /// All-zero parameters for the layout of `config`.
    pub fn zeros(config: &ModelConfig) -> Self {
        Self::from_shapes(config, |shape| DenseLayer::zeros(shape.inputs, shape.outputs))
    }

    fn from_shapes(config: &ModelConfig, mut make: impl FnMut(&LayerShape) -> DenseLayer) -> Self {
        let hidden = config.hidden_layers.len();
        let mut layers: Vec<DenseLayer> = architecture(config).iter().map(&mut make).collect();

        let decoder_hidden: Vec<DenseLayer> = layers.drain(hidden + 2..hidden * 2 + 2).collect();
        let output = layers.pop().unwrap_or_else(|| DenseLayer::zeros(0, 0));
        let log_var_head = layers.pop().unwrap_or_else(|| DenseLayer::zeros(0, 0));
        let mean_head = layers.pop().unwrap_or_else(|| DenseLayer::zeros(0, 0));
        Self {
            encoder_hidden: layers,
            mean_head,
            log_var_head,
            decoder_hidden,
            output,
        }
    }

    /// Zero parameters with the same shapes, used for gradients and
    /// optimizer moments.
    pub fn zeros_like(&self) -> Self {
        Self {
            encoder_hidden: self.encoder_hidden.iter().map(DenseLayer::zeros_like).collect(),
            mean_head: self.mean_head.zeros_like(),
            log_var_head: self.log_var_head.zeros_like(),
            decoder_hidden: self.decoder_hidden.iter().map(DenseLayer::zeros_like).collect(),
            output: self.output.zeros_like(),
        }
    }

    /// Layers in parameter order.
    pub fn layers(&self) -> Vec<&DenseLayer> {
        self.encoder_hidden
            .iter()
            .chain([&self.mean_head, &self.log_var_head])
            .chain(self.decoder_hidden.iter())
            .chain([&self.output])
            .collect()
    }

    /// Mutable layers in parameter order.
    pub fn layers_mut(&mut self) -> Vec<&mut DenseLayer> {
        self.encoder_hidden
            .iter_mut()
            .chain([&mut self.mean_head, &mut self.log_var_head])
            .chain(self.decoder_hidden.iter_mut())
            .chain([&mut self.output])
            .collect()
    }

    /// Actual layer dimensions, named like [`architecture`].
    pub fn shapes(&self) -> Vec<LayerShape> {
        let hidden = self.encoder_hidden.len();
        let decoder_hidden = self.decoder_hidden.len();
        self.layers()
            .into_iter()
            .enumerate()
            .map(|(i, layer)| {
                let name = if i < hidden {
                    format!("encoder.dense_{}", i)
                } else if i == hidden {
                    "encoder.mean".to_string()
                } else if i == hidden + 1 {
                    "encoder.log_var".to_string()
                } else if i < hidden + 2 + decoder_hidden {
                    format!("decoder.dense_{}", i - hidden - 2)
                } else {
                    "decoder.output".to_string()
                };
                LayerShape::new(name, layer.inputs(), layer.outputs())
            })
            .collect()
    }

    /// Checks every layer against the layout of `config`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` naming the first layer that differs.
    pub fn check_shapes(&self, config: &ModelConfig) -> VaeResult<()> {
        let expected = architecture(config);
        let actual = self.shapes();
        if expected.len() != actual.len() {
            return Err(VaeError::shape_mismatch(
                "layer count",
                expected.len(),
                actual.len(),
            ));
        }
        for ((want, have), layer) in expected.iter().zip(actual.iter()).zip(self.layers()) {
            if want != have || !layer.is_consistent() {
                return Err(VaeError::shape_mismatch(
                    format!("layer {}", want.name),
                    format!("{} -> {}", want.inputs, want.outputs),
                    format!("{} -> {} (bias {})", have.inputs, have.outputs, layer.bias.len()),
                ));
            }
        }
        Ok(())
    }

    /// Total number of weights and biases.
    pub fn num_parameters(&self) -> usize {
        self.layers().iter().map(|l| l.num_parameters()).sum()
    }

    /// Sum of squared values across all layers.
    pub fn squared_norm(&self) -> f64 {
        self.layers().iter().map(|l| l.squared_norm()).sum()
    }

    /// Multiplies every value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for layer in self.layers_mut() {
            layer.scale(factor);
        }
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.layers().iter().all(|l| l.is_finite())
    }

    /// BLAKE3 digest over layer dimensions and the little-endian bytes of
    /// every value, in parameter order.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for layer in self.layers() {
            hasher.update(&(layer.inputs() as u64).to_le_bytes());
            hasher.update(&(layer.outputs() as u64).to_le_bytes());
            for v in layer.weights.iter().chain(layer.bias.iter()) {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}
