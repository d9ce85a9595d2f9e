//! The VAE core: construction checks, sampling, losses and forward passes.

use melvae_backend_audio::MelSpectrogram;
use melvae_spec::{ModelConfig, ReconstructionReduction};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{VaeError, VaeResult};
use crate::latent::{LatentVector, PosteriorParams};
use crate::params::{architecture, LayerShape, ModelParameters};
use crate::rng::standard_normal;

/// Loss terms of one example (or the mean over a batch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LossBreakdown {
    /// Squared reconstruction error.
    pub reconstruction: f64,
    /// KL divergence from the standard normal prior.
    pub kl: f64,
    /// `reconstruction + beta * kl`.
    pub total: f64,
}

impl LossBreakdown {
    /// Adds another breakdown term by term.
    pub fn accumulate(&mut self, other: &LossBreakdown) {
        self.reconstruction += other.reconstruction;
        self.kl += other.kl;
        self.total += other.total;
    }

    /// Multiplies every term by `factor`.
    pub fn scaled(self, factor: f64) -> LossBreakdown {
        LossBreakdown {
            reconstruction: self.reconstruction * factor,
            kl: self.kl * factor,
            total: self.total * factor,
        }
    }

    /// Divides every term by `count` (no-op for zero).
    pub fn mean_over(self, count: usize) -> LossBreakdown {
        if count == 0 {
            return self;
        }
        self.scaled(1.0 / count as f64)
    }
}

/// Everything one forward pass produces.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Decoded spectrogram.
    pub reconstruction: MelSpectrogram,
    /// Encoder output.
    pub posterior: PosteriorParams,
    /// Sampled latent vector.
    pub latent: LatentVector,
    /// Loss terms for this example.
    pub loss: LossBreakdown,
}

/// A validated VAE architecture.
///
/// Holds no parameters: every operation borrows a [`ModelParameters`], so
/// the same `Vae` serves inference and training.
#[derive(Debug, Clone)]
pub struct Vae {
    config: ModelConfig,
    encoder: Encoder,
    decoder: Decoder,
}

impl Vae {
    /// Validates `config` and builds the encoder and decoder.
    ///
    /// Both halves share `config`, so their latent dimension and segment
    /// shape agree by construction. Parameter sets are checked against the
    /// layout separately by [`Vae::check_parameters`].
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an invalid config.
    pub fn new(config: ModelConfig) -> VaeResult<Self> {
        config.validate()?;
        let encoder = Encoder::new(&config);
        let decoder = Decoder::new(&config);
        Ok(Self {
            config,
            encoder,
            decoder,
        })
    }

    /// The architecture configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The encoder.
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// The decoder.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Latent dimension.
    pub fn latent_dimension(&self) -> usize {
        self.config.latent_dimension
    }

    /// Expected layer layout.
    pub fn architecture(&self) -> Vec<LayerShape> {
        architecture(&self.config)
    }

    /// Fresh He-initialized parameters.
    pub fn initialize_parameters<R: Rng + ?Sized>(&self, rng: &mut R) -> ModelParameters {
        ModelParameters::initialize(&self.config, rng)
    }

    /// Verifies that `params` have exactly the shapes this architecture
    /// implies.
    pub fn check_parameters(&self, params: &ModelParameters) -> VaeResult<()> {
        params.check_shapes(&self.config)
    }

    /// Encodes a segment. See [`Encoder::encode`].
    pub fn encode(&self, mel: &MelSpectrogram, params: &ModelParameters) -> VaeResult<PosteriorParams> {
        self.encoder.encode(mel, params)
    }

    /// Decodes a latent vector. See [`Decoder::decode`].
    pub fn decode(&self, latent: &LatentVector, params: &ModelParameters) -> VaeResult<MelSpectrogram> {
        self.decoder.decode(latent, params)
    }

    /// Draws `z = mean + exp(0.5 * log_var) * eps` with fresh `eps ~ N(0, I)`.
    pub fn sample<R: Rng + ?Sized>(&self, posterior: &PosteriorParams, rng: &mut R) -> LatentVector {
        let epsilon = standard_normal(rng, posterior.dimension());
        posterior.reparameterize(&epsilon)
    }

    /// Draws a latent vector from the prior N(0, I).
    pub fn sample_prior<R: Rng + ?Sized>(&self, rng: &mut R) -> LatentVector {
        LatentVector::new(standard_normal(rng, self.config.latent_dimension))
    }

    /// KL divergence of `posterior` from the standard normal prior.
    pub fn kl_divergence(&self, posterior: &PosteriorParams) -> f64 {
        posterior.kl_divergence()
    }

    /// Squared error between two spectrograms, summed or averaged over bins
    /// according to the config.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the shapes differ.
    pub fn reconstruction_loss(
        &self,
        original: &MelSpectrogram,
        reconstructed: &MelSpectrogram,
    ) -> VaeResult<f64> {
        if original.shape() != reconstructed.shape() {
            return Err(VaeError::shape_mismatch(
                "reconstruction",
                original.segment_shape(),
                reconstructed.segment_shape(),
            ));
        }
        let sum: f64 = original
            .data()
            .iter()
            .zip(reconstructed.data())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(match self.config.reconstruction_reduction {
            ReconstructionReduction::Sum => sum,
            ReconstructionReduction::Mean => sum / original.data().len().max(1) as f64,
        })
    }

    /// Combined loss `reconstruction + beta * kl`.
    pub fn loss(
        &self,
        original: &MelSpectrogram,
        reconstructed: &MelSpectrogram,
        posterior: &PosteriorParams,
    ) -> VaeResult<LossBreakdown> {
        let reconstruction = self.reconstruction_loss(original, reconstructed)?;
        let kl = self.kl_divergence(posterior);
        Ok(LossBreakdown {
            reconstruction,
            kl,
            total: reconstruction + self.config.beta_weight * kl,
        })
    }

    /// Encode, sample, decode and score one segment.
    pub fn forward<R: Rng + ?Sized>(
        &self,
        mel: &MelSpectrogram,
        params: &ModelParameters,
        rng: &mut R,
    ) -> VaeResult<ForwardPass> {
        self.forward_with(mel, None, params, rng)
    }

    /// Like [`Vae::forward`], passing `conditioning` to a conditioned decoder.
    pub fn forward_with<R: Rng + ?Sized>(
        &self,
        mel: &MelSpectrogram,
        conditioning: Option<&[f64]>,
        params: &ModelParameters,
        rng: &mut R,
    ) -> VaeResult<ForwardPass> {
        let posterior = self.encode(mel, params)?;
        let latent = self.sample(&posterior, rng);
        let reconstruction = match conditioning {
            Some(c) => self.decoder.decode_conditioned(&latent, c, params)?,
            None => self.decode(&latent, params)?,
        };
        let loss = self.loss(mel, &reconstruction, &posterior)?;
        Ok(ForwardPass {
            reconstruction,
            posterior,
            latent,
            loss,
        })
    }
}
