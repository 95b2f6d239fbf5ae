//! Training objective: adversarial + L1 reconstruction losses and the
//! scalars reported for progress and summaries.
//!
//! Each network's gradients are restricted to its own parameter subset by
//! extracting them with `GradientsParams::from_grads(grads, &network)` in
//! the trainer; the losses here are plain tensor expressions over one full
//! forward pass. With a zero adversarial weight the discriminator is absent
//! and the generator loss degenerates to the reconstruction term alone.

use crate::config::{ModelConfig, ReconReference};
use crate::constants::training;
use crate::data::Batch;
use crate::discriminator::Discriminator;
use crate::generator::Generator;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

/// Everything computed from one forward evaluation of the graph.
pub struct StepLosses<B: Backend> {
	/// Generator output, `[batch, 1, 64, 256]` in `[-1, 1]`.
	pub outputs: Tensor<B, 4>,
	/// Patch probabilities for the real pair, when adversarial training is on.
	pub predict_real: Option<Tensor<B, 3>>,
	/// Patch probabilities for the generated pair.
	pub predict_fake: Option<Tensor<B, 3>>,
	pub discrim_loss: Option<Tensor<B, 1>>,
	pub gen_loss_gan: Option<Tensor<B, 1>>,
	pub gen_loss_l1: Tensor<B, 1>,
	/// Weighted sum the generator optimiser minimises.
	pub gen_loss: Tensor<B, 1>,
}

impl<B: Backend> StepLosses<B> {
	pub fn scalars(&self) -> LossScalars {
		LossScalars {
			discrim_loss: self.discrim_loss.as_ref().map(|l| l.clone().into_scalar().elem()),
			gen_loss_gan: self.gen_loss_gan.as_ref().map(|l| l.clone().into_scalar().elem()),
			gen_loss_l1: self.gen_loss_l1.clone().into_scalar().elem(),
		}
	}
}

/// Host-side loss values for progress reporting and summaries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LossScalars {
	pub discrim_loss: Option<f64>,
	pub gen_loss_gan: Option<f64>,
	pub gen_loss_l1: f64,
}

/// Converts one stacked batch half into a device tensor.
pub fn batch_tensor<B: Backend>(raster: &ndarray::Array4<f32>, device: &B::Device) -> Tensor<B, 4> {
	let shape = raster.dim();
	let data = TensorData::new(raster.iter().cloned().collect::<Vec<f32>>(), [shape.0, shape.1, shape.2, shape.3]);
	Tensor::from_data(data, device)
}

/// One full forward evaluation: generator output, both discriminator passes
/// (real then fake, through the same parameter set), and all loss terms.
pub fn compute_losses<B: Backend>(
	generator: &Generator<B>,
	discriminator: Option<&Discriminator<B>>,
	config: &ModelConfig,
	batch: &Batch,
	device: &B::Device,
) -> StepLosses<B> {
	let sources = batch_tensor::<B>(&batch.sources, device);
	let targets = batch_tensor::<B>(&batch.targets, device);
	let outputs = generator.forward(sources.clone());

	let eps = training::LOSS_EPSILON;
	let (predict_real, predict_fake, discrim_loss, gen_loss_gan) = match discriminator {
		Some(discriminator) => {
			let predict_real = discriminator.forward(sources.clone(), targets.clone());
			let predict_fake = discriminator.forward(sources.clone(), outputs.clone());

			// Push real pairs towards 1 and generated pairs towards 0; the
			// epsilon keeps the logs finite at saturation.
			let real_term = predict_real.clone().add_scalar(eps).log();
			let fake_term = predict_fake.clone().neg().add_scalar(1.0 + eps).log();
			let discrim_loss = (real_term + fake_term).mean().neg();

			let gen_loss_gan = predict_fake.clone().add_scalar(eps).log().mean().neg();
			(Some(predict_real), Some(predict_fake), Some(discrim_loss), Some(gen_loss_gan))
		},
		None => (None, None, None, None),
	};

	let reference = match config.recon_reference {
		ReconReference::Target => targets,
		ReconReference::Source => sources,
	};
	let gen_loss_l1 = (reference - outputs.clone()).abs().mean();

	let gen_loss = match &gen_loss_gan {
		Some(gan) => gen_loss_l1.clone().mul_scalar(config.l1_weight) + gan.clone().mul_scalar(config.gan_weight),
		None => gen_loss_l1.clone().mul_scalar(config.l1_weight),
	};

	StepLosses {
		outputs,
		predict_real,
		predict_fake,
		discrim_loss,
		gen_loss_gan,
		gen_loss_l1,
		gen_loss,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{ModelConfig, ReconReference};
	use crate::data::Batch;
	use ndarray::Array4;
	use std::path::PathBuf;

	type TestBackend = burn::backend::NdArray<f32>;

	fn tiny_batch() -> Batch {
		let mut sources = Array4::zeros((1, 1, 64, 256));
		let mut targets = Array4::zeros((1, 1, 64, 256));
		sources.fill(0.25);
		targets.fill(-0.5);
		Batch {
			paths: vec![PathBuf::from("0.png")],
			sources,
			targets,
		}
	}

	fn tiny_config() -> ModelConfig {
		ModelConfig::builder().ngf(1).ndf(1).dropout(0.0).build()
	}

	#[test]
	fn test_zero_gan_weight_degenerates_to_reconstruction() {
		let device = Default::default();
		let config = ModelConfig::builder().ngf(1).gan_weight(0.0).dropout(0.0).build();
		let generator = Generator::<TestBackend>::new(&config, &device);

		// Reconstruction-only runs build no discriminator at all.
		let losses = compute_losses(&generator, None, &config, &tiny_batch(), &device);
		assert!(losses.discrim_loss.is_none());
		assert!(losses.gen_loss_gan.is_none());

		let l1: f32 = losses.gen_loss_l1.into_scalar();
		let total: f32 = losses.gen_loss.into_scalar();
		assert!((total - l1 * config.l1_weight as f32).abs() < 1e-6);
	}

	#[test]
	fn test_adversarial_losses_present_and_finite() {
		let device = Default::default();
		let config = tiny_config();
		let generator = Generator::<TestBackend>::new(&config, &device);
		let discriminator = Discriminator::<TestBackend>::new(&config, &device);

		let losses = compute_losses(&generator, Some(&discriminator), &config, &tiny_batch(), &device);
		let d: f32 = losses.discrim_loss.unwrap().into_scalar();
		let g: f32 = losses.gen_loss.into_scalar();
		assert!(d.is_finite() && d >= 0.0);
		assert!(g.is_finite());
		assert_eq!(losses.predict_real.unwrap().dims(), [1, 2, 8]);
		assert_eq!(losses.predict_fake.unwrap().dims(), [1, 2, 8]);
	}

	#[test]
	fn test_reconstruction_reference_is_configurable() {
		let device = Default::default();
		let batch = tiny_batch();

		let against_target = ModelConfig::builder()
			.ngf(1)
			.gan_weight(0.0)
			.dropout(0.0)
			.recon_reference(ReconReference::Target)
			.build();
		let against_source = ModelConfig::builder()
			.ngf(1)
			.gan_weight(0.0)
			.dropout(0.0)
			.recon_reference(ReconReference::Source)
			.build();
		let generator = Generator::<TestBackend>::new(&against_target, &device);

		let l1_target: f32 = compute_losses(&generator, None, &against_target, &batch, &device)
			.gen_loss_l1
			.into_scalar();
		let l1_source: f32 = compute_losses(&generator, None, &against_source, &batch, &device)
			.gen_loss_l1
			.into_scalar();
		// The batch halves differ, so the two references must disagree.
		assert!((l1_target - l1_source).abs() > 1e-4);
	}
}
