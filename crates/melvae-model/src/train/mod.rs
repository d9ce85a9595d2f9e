//! Training loop: batching, backpropagation and Adam updates.
//!
//! The [`Trainer`] owns the only mutable [`ModelParameters`]. Gradients for a
//! batch are computed against an immutable borrow and applied afterwards.

mod adam;
mod backprop;
mod dataset;

pub use adam::{Adam, BETA1, BETA2, EPSILON};
pub use dataset::{InMemoryDataset, SegmentSource, TrainingExample};

use log::{debug, info, warn};
use melvae_spec::{ConfigError, TrainingConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{VaeError, VaeResult};
use crate::params::ModelParameters;
use crate::vae::{LossBreakdown, Vae};

/// Outcome of one optimizer step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    /// Mean loss over the batch, before the update.
    pub loss: LossBreakdown,
    /// Batch size.
    pub examples: usize,
    /// Gradient norm before clipping.
    pub gradient_norm: f64,
}

/// Summary of one pass over the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochReport {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Mean loss over the examples trained on.
    pub loss: LossBreakdown,
    /// Examples trained on.
    pub examples: usize,
    /// Items skipped because they failed to load or did not fit the model.
    pub skipped: usize,
}

/// Optimizes a parameter set for a [`Vae`].
#[derive(Debug, Clone)]
pub struct Trainer {
    vae: Vae,
    params: ModelParameters,
    optimizer: Adam,
    config: TrainingConfig,
}

impl Trainer {
    /// Creates a trainer starting from `params`.
    ///
    /// # Errors
    /// Returns `InvalidConfig` for an invalid training config and
    /// `ShapeMismatch` if `params` do not fit `vae`.
    pub fn new(vae: Vae, params: ModelParameters, config: TrainingConfig) -> VaeResult<Self> {
        config.validate()?;
        vae.check_parameters(&params)?;
        let optimizer = Adam::new(config.learning_rate, &params);
        Ok(Self {
            vae,
            params,
            optimizer,
            config,
        })
    }

    /// The model architecture.
    pub fn vae(&self) -> &Vae {
        &self.vae
    }

    /// Current parameters.
    pub fn parameters(&self) -> &ModelParameters {
        &self.params
    }

    /// Consumes the trainer and returns the trained parameters.
    pub fn into_parameters(self) -> ModelParameters {
        self.params
    }

    /// Training options.
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Optimizer steps taken so far.
    pub fn steps(&self) -> u64 {
        self.optimizer.steps()
    }

    /// Computes the mean gradient over `batch` and applies one Adam update.
    ///
    /// Non-finite gradients skip the update.
    ///
    /// # Errors
    /// Fails if the batch is empty or an example does not fit the model;
    /// parameters are unchanged in that case.
    pub fn train_step<R: Rng + ?Sized>(
        &mut self,
        batch: &[TrainingExample],
        rng: &mut R,
    ) -> VaeResult<StepReport> {
        if batch.is_empty() {
            return Err(ConfigError::invalid_param("batch", "must contain at least one example").into());
        }

        let mut grads = self.params.zeros_like();
        let mut sum = LossBreakdown::default();
        for example in batch {
            let loss = backprop::accumulate_gradients(&self.vae, &self.params, example, &mut grads, rng)?;
            sum.accumulate(&loss);
        }
        grads.scale(1.0 / batch.len() as f64);

        let gradient_norm = grads.squared_norm().sqrt();
        if !gradient_norm.is_finite() {
            warn!("non-finite gradient at step {}; update skipped", self.steps() + 1);
        } else {
            if let Some(max) = self.config.max_gradient_norm {
                if gradient_norm > max {
                    grads.scale(max / gradient_norm);
                }
            }
            self.optimizer.step(&mut self.params, &grads);
        }

        let loss = sum.mean_over(batch.len());
        debug!(
            "step {}: loss {:.6} (reconstruction {:.6}, kl {:.6}), grad norm {:.4}",
            self.steps(),
            loss.total,
            loss.reconstruction,
            loss.kl,
            gradient_norm
        );
        Ok(StepReport {
            loss,
            examples: batch.len(),
            gradient_norm,
        })
    }

    /// Trains for `epochs` passes over `source`, shuffling each epoch.
    ///
    /// Items that fail to load or do not fit the model are logged and
    /// skipped.
    pub fn fit<R: Rng + ?Sized>(
        &mut self,
        source: &dyn SegmentSource,
        epochs: usize,
        rng: &mut R,
    ) -> VaeResult<Vec<EpochReport>> {
        let mut order: Vec<usize> = (0..source.len()).collect();
        let mut reports = Vec::with_capacity(epochs);

        for epoch in 1..=epochs {
            order.shuffle(rng);
            let mut sum = LossBreakdown::default();
            let mut examples = 0;
            let mut skipped = 0;

            for chunk in order.chunks(self.config.batch_size) {
                let mut batch = Vec::with_capacity(chunk.len());
                for &index in chunk {
                    match source.get(index).map_err(VaeError::from).and_then(|example| {
                        self.check_example(&example)?;
                        Ok(example)
                    }) {
                        Ok(example) => batch.push(example),
                        Err(e) => {
                            warn!("skipping item {}: {}", index, e);
                            skipped += 1;
                        }
                    }
                }
                if batch.is_empty() {
                    continue;
                }
                let step = self.train_step(&batch, rng)?;
                sum.accumulate(&step.loss.scaled(step.examples as f64));
                examples += step.examples;
            }

            let report = EpochReport {
                epoch,
                loss: sum.mean_over(examples),
                examples,
                skipped,
            };
            if examples == 0 {
                warn!("epoch {}/{}: no usable examples", epoch, epochs);
            } else {
                info!(
                    "epoch {}/{}: loss {:.4} (reconstruction {:.4}, kl {:.4}), {} examples, {} skipped",
                    epoch,
                    epochs,
                    report.loss.total,
                    report.loss.reconstruction,
                    report.loss.kl,
                    examples,
                    skipped
                );
            }
            reports.push(report);
        }

        Ok(reports)
    }

    /// Checks that an example fits the model before it joins a batch.
    fn check_example(&self, example: &TrainingExample) -> VaeResult<()> {
        let expected = self.vae.config().segment_shape;
        let found = example.spectrogram.segment_shape();
        if found != expected {
            return Err(VaeError::shape_mismatch("training example", expected, found));
        }
        let conditioning = self.vae.config().conditioning_dimension.unwrap_or(0);
        if let Some(c) = &example.conditioning {
            if c.len() != conditioning {
                return Err(VaeError::shape_mismatch("conditioning vector", conditioning, c.len()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::create_rng;
    use melvae_backend_audio::MelSpectrogram;
    use melvae_spec::{ModelConfig, SegmentShape};

    fn vae() -> Vae {
        Vae::new(ModelConfig {
            segment_shape: SegmentShape::new(4, 3),
            latent_dimension: 2,
            hidden_layers: vec![16],
            ..Default::default()
        })
        .unwrap()
    }

    fn trainer() -> Trainer {
        let vae = vae();
        let params = vae.initialize_parameters(&mut create_rng(1));
        let config = TrainingConfig {
            learning_rate: 0.01,
            batch_size: 2,
            epochs: 5,
            ..Default::default()
        };
        Trainer::new(vae, params, config).unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_parameters() {
        let params = ModelParameters::zeros(&ModelConfig {
            latent_dimension: 5,
            ..vae().config().clone()
        });
        assert!(Trainer::new(vae(), params, TrainingConfig::default()).is_err());
    }

    #[test]
    fn test_train_step_updates_parameters() {
        let mut trainer = trainer();
        let before = trainer.parameters().clone();
        let batch = vec![TrainingExample::new(MelSpectrogram::filled(4, 3, 0.8))];
        let report = trainer.train_step(&batch, &mut create_rng(2)).unwrap();
        assert_eq!(report.examples, 1);
        assert!(report.gradient_norm > 0.0);
        assert_eq!(trainer.steps(), 1);
        assert_ne!(trainer.parameters(), &before);
    }

    #[test]
    fn test_train_step_rejects_empty_batch() {
        assert!(trainer().train_step(&[], &mut create_rng(2)).is_err());
    }

    #[test]
    fn test_fit_skips_malformed_items() {
        let mut trainer = trainer();
        let dataset = InMemoryDataset::new(vec![
            TrainingExample::new(MelSpectrogram::filled(4, 3, 0.2)),
            TrainingExample::new(MelSpectrogram::filled(4, 2, 0.2)),
            TrainingExample::new(MelSpectrogram::new(4, 3, vec![f64::NAN; 12]).unwrap()),
            TrainingExample::new(MelSpectrogram::filled(4, 3, 0.7)),
        ]);
        let reports = trainer.fit(&dataset, 2, &mut create_rng(3)).unwrap();
        assert_eq!(reports.len(), 2);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.epoch, i + 1);
            assert_eq!(report.examples, 2);
            assert_eq!(report.skipped, 2);
            assert!(report.loss.total.is_finite());
        }
    }

    #[test]
    fn test_gradient_clipping_reports_unclipped_norm() {
        let vae = vae();
        let params = vae.initialize_parameters(&mut create_rng(1));
        let config = TrainingConfig {
            max_gradient_norm: Some(1e-3),
            ..Default::default()
        };
        let mut trainer = Trainer::new(vae, params, config).unwrap();
        let batch = vec![TrainingExample::new(MelSpectrogram::filled(4, 3, 1.0))];
        let report = trainer.train_step(&batch, &mut create_rng(2)).unwrap();
        assert!(report.gradient_norm > 1e-3);
    }
}
