//! Generation modes and the controller that dispatches them.
//!
//! Each [`GenerationRequest`] variant maps to one [`GenerationMode`]
//! implementation. A mode that cannot run on the given model fails; no mode
//! falls back to another.

use log::debug;
use melvae_backend_audio::MelSpectrogram;
use melvae_spec::ConfigError;
use rand::RngCore;

use crate::error::{VaeError, VaeResult};
use crate::latent::LatentVector;
use crate::params::ModelParameters;
use crate::rng::standard_normal;
use crate::vae::Vae;

/// What to generate.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    /// Decode a latent drawn from the prior.
    Autonomous,
    /// Decode a latent (sampled from the prior unless supplied) together with
    /// a conditioning vector.
    Conditioned {
        /// Conditioning vector of the decoder's conditioning dimension.
        conditioning: Vec<f64>,
        /// Latent to decode instead of a prior sample.
        latent: Option<LatentVector>,
    },
    /// Encode a seed segment, sample its posterior, take a random-walk step
    /// of size `perturbation` and decode.
    Continuation {
        /// Seed segment of the model's segment shape.
        seed: MelSpectrogram,
        /// Standard deviation of the random-walk step.
        perturbation: f64,
    },
}

impl GenerationRequest {
    /// The mode implementing this request.
    pub fn mode(&self) -> Box<dyn GenerationMode + '_> {
        match self {
            GenerationRequest::Autonomous => Box::new(Autonomous),
            GenerationRequest::Conditioned {
                conditioning,
                latent,
            } => Box::new(Conditioned {
                conditioning,
                latent: latent.as_ref(),
            }),
            GenerationRequest::Continuation { seed, perturbation } => Box::new(Continuation {
                seed,
                perturbation: *perturbation,
            }),
        }
    }
}

/// One way of producing a segment from a trained model.
pub trait GenerationMode {
    /// Mode name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Produces one segment of the model's segment shape.
    fn generate(
        &self,
        vae: &Vae,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram>;
}

/// Samples the prior and decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Autonomous;

impl GenerationMode for Autonomous {
    fn name(&self) -> &'static str {
        "autonomous"
    }

    fn generate(
        &self,
        vae: &Vae,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram> {
        let latent = vae.sample_prior(rng);
        vae.decode(&latent, params)
    }
}

/// Decodes with an explicit conditioning vector.
#[derive(Debug, Clone, Copy)]
pub struct Conditioned<'a> {
    /// Conditioning vector.
    pub conditioning: &'a [f64],
    /// Latent to decode; sampled from the prior when `None`.
    pub latent: Option<&'a LatentVector>,
}

impl GenerationMode for Conditioned<'_> {
    fn name(&self) -> &'static str {
        "conditioned"
    }

    fn generate(
        &self,
        vae: &Vae,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram> {
        if !vae.config().is_conditioned() {
            return Err(VaeError::UnsupportedMode {
                mode: self.name(),
                reason: "the model was built without a conditioning input".to_string(),
            });
        }
        let latent = match self.latent {
            Some(latent) => latent.clone(),
            None => vae.sample_prior(rng),
        };
        vae.decoder()
            .decode_conditioned(&latent, self.conditioning, params)
    }
}

/// Varies an existing segment by walking from its posterior sample.
#[derive(Debug, Clone, Copy)]
pub struct Continuation<'a> {
    /// Seed segment.
    pub seed: &'a MelSpectrogram,
    /// Random-walk step size.
    pub perturbation: f64,
}

impl GenerationMode for Continuation<'_> {
    fn name(&self) -> &'static str {
        "continuation"
    }

    fn generate(
        &self,
        vae: &Vae,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram> {
        if !self.perturbation.is_finite() || self.perturbation < 0.0 {
            return Err(ConfigError::invalid_param(
                "perturbation",
                format!("must be finite and non-negative, got {}", self.perturbation),
            )
            .into());
        }
        let posterior = vae.encode(self.seed, params)?;
        let sample = vae.sample(&posterior, rng);
        let step = standard_normal(rng, sample.dimension());
        let latent = LatentVector::new(
            sample
                .values()
                .iter()
                .zip(step.iter())
                .map(|(z, e)| z + self.perturbation * e)
                .collect(),
        );
        vae.decode(&latent, params)
    }
}

/// Runs generation requests against a model and its parameters.
///
/// Stateless between calls; all randomness comes from the caller's RNG.
#[derive(Debug, Clone, Copy)]
pub struct GenerationController<'a> {
    vae: &'a Vae,
}

impl<'a> GenerationController<'a> {
    /// Creates a controller for `vae`.
    pub fn new(vae: &'a Vae) -> Self {
        Self { vae }
    }

    /// Produces one segment.
    ///
    /// # Errors
    /// Returns `UnsupportedMode` if the model cannot serve the request and
    /// `ShapeMismatch` if a seed, latent or conditioning vector has the wrong
    /// shape.
    pub fn generate(
        &self,
        request: &GenerationRequest,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram> {
        let mode = request.mode();
        debug!("generating one segment ({})", mode.name());
        mode.generate(self.vae, params, rng)
    }

    /// Produces `count` segments joined along time.
    ///
    /// The first segment comes from `first`; each following one is a
    /// continuation of its predecessor with step size `perturbation`.
    pub fn generate_sequence(
        &self,
        first: &GenerationRequest,
        count: usize,
        perturbation: f64,
        params: &ModelParameters,
        rng: &mut dyn RngCore,
    ) -> VaeResult<MelSpectrogram> {
        if count == 0 {
            return Err(ConfigError::invalid_param("count", "must be at least 1").into());
        }
        let mut segments = Vec::with_capacity(count);
        let mut previous = self.generate(first, params, rng)?;
        for _ in 1..count {
            let next = Continuation {
                seed: &previous,
                perturbation,
            }
            .generate(self.vae, params, rng)?;
            segments.push(std::mem::replace(&mut previous, next));
        }
        segments.push(previous);
        Ok(MelSpectrogram::concat_frames(&segments)?)
    }
}
