//! Spectrogram -> posterior parameters.

use melvae_backend_audio::MelSpectrogram;
use melvae_spec::{ModelConfig, SegmentShape};
use nalgebra::DVector;

use crate::error::{VaeError, VaeResult};
use crate::latent::PosteriorParams;
use crate::layers::{relu_stack, relu_stack_forward, StackTrace};
use crate::params::ModelParameters;

/// Maps a normalized segment to the mean and log-variance of its latent
/// posterior.
///
/// The segment is flattened band-major and passed through the hidden ReLU
/// layers; two linear heads then produce the mean and log-variance.
#[derive(Debug, Clone)]
pub struct Encoder {
    config: ModelConfig,
}

/// Intermediate values of one encoder pass, kept for backpropagation.
#[derive(Debug, Clone)]
pub(crate) struct EncoderPass {
    pub trace: StackTrace,
    pub hidden: DVector<f64>,
    pub posterior: PosteriorParams,
}

impl Encoder {
    /// Creates an encoder for `config`.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Expected input shape.
    pub fn segment_shape(&self) -> SegmentShape {
        self.config.segment_shape
    }

    /// Dimension of the posterior it produces.
    pub fn latent_dimension(&self) -> usize {
        self.config.latent_dimension
    }

    /// Encodes one segment.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if `mel` is not exactly the configured segment
    /// shape or `params` do not match the configured layout. Nothing is
    /// padded or chunked here.
    pub fn encode(&self, mel: &MelSpectrogram, params: &ModelParameters) -> VaeResult<PosteriorParams> {
        let input = self.prepare(mel, params)?;
        let hidden = relu_stack(&params.encoder_hidden, input);
        self.heads(&hidden, params)
    }

    pub(crate) fn encode_traced(
        &self,
        mel: &MelSpectrogram,
        params: &ModelParameters,
    ) -> VaeResult<EncoderPass> {
        let input = self.prepare(mel, params)?;
        let (hidden, trace) = relu_stack_forward(&params.encoder_hidden, input);
        let posterior = self.heads(&hidden, params)?;
        Ok(EncoderPass {
            trace,
            hidden,
            posterior,
        })
    }

    /// Checks the input shape and flattens it.
    pub(crate) fn check_input(&self, mel: &MelSpectrogram) -> VaeResult<DVector<f64>> {
        let shape = mel.segment_shape();
        if shape != self.config.segment_shape {
            return Err(VaeError::shape_mismatch(
                "encoder input",
                self.config.segment_shape,
                shape,
            ));
        }
        Ok(DVector::from_column_slice(mel.data()))
    }

    fn prepare(&self, mel: &MelSpectrogram, params: &ModelParameters) -> VaeResult<DVector<f64>> {
        let input = self.check_input(mel)?;
        params.check_shapes(&self.config)?;
        Ok(input)
    }

    fn heads(&self, hidden: &DVector<f64>, params: &ModelParameters) -> VaeResult<PosteriorParams> {
        let mean = params.mean_head.forward(hidden);
        let log_var = params.log_var_head.forward(hidden);
        PosteriorParams::new(mean.as_slice().to_vec(), log_var.as_slice().to_vec())
    }
}
