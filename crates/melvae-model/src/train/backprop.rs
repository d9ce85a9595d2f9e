//! Per-example gradients of `reconstruction + beta * kl`.
//!
//! Gradients flow from the sigmoid output through the decoder, across the
//! reparameterization `z = mean + exp(0.5 * log_var) * eps` into both encoder
//! heads (where the KL gradient joins) and back through the encoder.

use melvae_spec::ReconstructionReduction;
use nalgebra::DVector;
use rand::Rng;

use crate::error::VaeResult;
use crate::layers::relu_stack_backward;
use crate::params::ModelParameters;
use crate::rng::standard_normal;
use crate::train::dataset::TrainingExample;
use crate::vae::{LossBreakdown, Vae};

/// Adds the gradients for `example` to `grads` and returns its loss.
///
/// Draws one `eps ~ N(0, I)` from `rng`, exactly as [`Vae::forward`] does.
pub(crate) fn accumulate_gradients<R: Rng + ?Sized>(
    vae: &Vae,
    params: &ModelParameters,
    example: &TrainingExample,
    grads: &mut ModelParameters,
    rng: &mut R,
) -> VaeResult<LossBreakdown> {
    let config = vae.config();
    let beta = config.beta_weight;

    let encoded = vae.encoder().encode_traced(&example.spectrogram, params)?;
    let posterior = &encoded.posterior;
    let epsilon = standard_normal(rng, posterior.dimension());
    let latent = posterior.reparameterize(&epsilon);
    let input = vae
        .decoder()
        .input_vector(&latent, example.conditioning.as_deref())?;
    let decoded = vae.decoder().decode_traced(input, params)?;

    let target = DVector::from_column_slice(example.spectrogram.data());
    let diff = &decoded.output - &target;
    let squared = diff.norm_squared();
    let (reconstruction, scale) = match config.reconstruction_reduction {
        ReconstructionReduction::Sum => (squared, 2.0),
        ReconstructionReduction::Mean => {
            let n = target.len().max(1) as f64;
            (squared / n, 2.0 / n)
        }
    };
    let kl = posterior.kl_divergence();

    // Output layer: d/dpre of sigmoid is y * (1 - y).
    let delta_out = diff.zip_map(&decoded.output, |d, y| scale * d * y * (1.0 - y));
    grads.output.accumulate(&delta_out, &decoded.hidden);
    let grad_hidden = params.output.weights.tr_mul(&delta_out);
    let grad_input = relu_stack_backward(
        &params.decoder_hidden,
        &decoded.trace,
        grad_hidden,
        &mut grads.decoder_hidden,
    );

    // Only the latent part of the decoder input reaches the encoder.
    let mean = posterior.mean();
    let log_var = posterior.log_var();
    let grad_mean = DVector::from_fn(mean.len(), |i, _| grad_input[i] + beta * mean[i]);
    let grad_log_var = DVector::from_fn(log_var.len(), |i, _| {
        grad_input[i] * epsilon[i] * 0.5 * (0.5 * log_var[i]).exp()
            + beta * 0.5 * (log_var[i].exp() - 1.0)
    });
    grads.mean_head.accumulate(&grad_mean, &encoded.hidden);
    grads.log_var_head.accumulate(&grad_log_var, &encoded.hidden);

    let grad_encoded = params.mean_head.weights.tr_mul(&grad_mean)
        + params.log_var_head.weights.tr_mul(&grad_log_var);
    relu_stack_backward(
        &params.encoder_hidden,
        &encoded.trace,
        grad_encoded,
        &mut grads.encoder_hidden,
    );

    Ok(LossBreakdown {
        reconstruction,
        kl,
        total: reconstruction + beta * kl,
    })
}
