//! Latent vector (plus optional conditioning) -> spectrogram.

use melvae_backend_audio::MelSpectrogram;
use melvae_spec::{ModelConfig, SegmentShape};
use nalgebra::DVector;

use crate::error::{VaeError, VaeResult};
use crate::latent::LatentVector;
use crate::layers::{relu_stack, relu_stack_forward, sigmoid, StackTrace};
use crate::params::ModelParameters;

/// Maps latent vectors back to normalized segments.
///
/// Mirrors the encoder: hidden ReLU layers in reverse order, then a dense
/// output layer with a sigmoid, so every value lies in (0, 1).
#[derive(Debug, Clone)]
pub struct Decoder {
    config: ModelConfig,
}

/// Intermediate values of one decoder pass, kept for backpropagation.
#[derive(Debug, Clone)]
pub(crate) struct DecoderPass {
    pub trace: StackTrace,
    pub hidden: DVector<f64>,
    pub output: DVector<f64>,
}

impl Decoder {
    /// Creates a decoder for `config`.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Shape of every decoded segment.
    pub fn segment_shape(&self) -> SegmentShape {
        self.config.segment_shape
    }

    /// Latent input dimension (conditioning excluded).
    pub fn latent_dimension(&self) -> usize {
        self.config.latent_dimension
    }

    /// Conditioning input dimension, if the decoder has one.
    pub fn conditioning_dimension(&self) -> Option<usize> {
        self.config.conditioning_dimension
    }

    /// Decodes a latent vector. A conditioned decoder receives an all-zero
    /// conditioning vector.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the latent dimension or `params` do not
    /// match the configuration.
    pub fn decode(&self, latent: &LatentVector, params: &ModelParameters) -> VaeResult<MelSpectrogram> {
        let input = self.input_vector(latent, None)?;
        self.run(input, params)
    }

    /// Decodes a latent vector together with a conditioning vector.
    ///
    /// # Errors
    /// Returns `UnsupportedMode` if the decoder was built without a
    /// conditioning input, `ShapeMismatch` if either vector has the wrong
    /// length.
    pub fn decode_conditioned(
        &self,
        latent: &LatentVector,
        conditioning: &[f64],
        params: &ModelParameters,
    ) -> VaeResult<MelSpectrogram> {
        if !self.config.is_conditioned() {
            return Err(VaeError::UnsupportedMode {
                mode: "conditioned",
                reason: "the decoder was built without a conditioning input".to_string(),
            });
        }
        let input = self.input_vector(latent, Some(conditioning))?;
        self.run(input, params)
    }

    /// Concatenates latent and conditioning into the decoder input.
    ///
    /// `None` stands for the zero conditioning vector.
    pub(crate) fn input_vector(
        &self,
        latent: &LatentVector,
        conditioning: Option<&[f64]>,
    ) -> VaeResult<DVector<f64>> {
        if latent.dimension() != self.config.latent_dimension {
            return Err(VaeError::shape_mismatch(
                "latent vector",
                self.config.latent_dimension,
                latent.dimension(),
            ));
        }
        let expected = self.config.conditioning_dimension.unwrap_or(0);
        let mut values = latent.values().to_vec();
        match conditioning {
            Some(c) if c.len() != expected => {
                return Err(VaeError::shape_mismatch(
                    "conditioning vector",
                    expected,
                    c.len(),
                ));
            }
            Some(c) => values.extend_from_slice(c),
            None => values.resize(latent.dimension() + expected, 0.0),
        }
        Ok(DVector::from_vec(values))
    }

    pub(crate) fn decode_traced(
        &self,
        input: DVector<f64>,
        params: &ModelParameters,
    ) -> VaeResult<DecoderPass> {
        params.check_shapes(&self.config)?;
        let (hidden, trace) = relu_stack_forward(&params.decoder_hidden, input);
        let output = params.output.forward(&hidden).map(sigmoid);
        Ok(DecoderPass {
            trace,
            hidden,
            output,
        })
    }

    pub(crate) fn to_spectrogram(&self, output: &DVector<f64>) -> VaeResult<MelSpectrogram> {
        let shape = self.config.segment_shape;
        Ok(MelSpectrogram::new(
            shape.mel_bands,
            shape.frames,
            output.as_slice().to_vec(),
        )?)
    }

    fn run(&self, input: DVector<f64>, params: &ModelParameters) -> VaeResult<MelSpectrogram> {
        params.check_shapes(&self.config)?;
        let hidden = relu_stack(&params.decoder_hidden, input);
        let output = params.output.forward(&hidden).map(sigmoid);
        self.to_spectrogram(&output)
    }
}
