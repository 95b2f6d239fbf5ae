//! Training orchestrator: the two-phase adversarial step loop with
//! frequency-gated reporting and checkpointing.
//!
//! Every step the discriminator updates first, against the current
//! generator's output, and the generator then reads its adversarial gradient
//! through the just-updated discriminator. Each optimizer only ever sees its
//! own network's parameters.

use crate::config::{ModelConfig, RunConfig};
use crate::constants::{io as io_constants, training};
use crate::data::{self, PairStream};
use crate::discriminator::Discriminator;
use crate::error::Result;
use crate::generator::Generator;
use crate::logging;
use crate::model::{self, LossScalars};
use crate::report;
use crate::training::checkpoint::CheckpointManager;
use burn::grad_clipping::GradientClippingConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::AutodiffBackend;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// `true` on steps where an action with period `freq` fires: every `freq`
/// steps and unconditionally on the final step. A zero frequency disables
/// the action entirely.
pub fn should(freq: u64, step: u64, max_steps: u64) -> bool {
	freq > 0 && ((step + 1) % freq == 0 || step + 1 == max_steps)
}

#[derive(Serialize)]
struct SummaryRecord<'a> {
	step: u64,
	#[serde(flatten)]
	losses: &'a LossScalars,
}

/// Runs the training loop to its step budget or until interrupted, writing
/// checkpoints, summaries and display images into `output_dir`. Returns the
/// number of completed steps.
pub fn train<B: AutodiffBackend>(
	model_config: &ModelConfig,
	run_config: &RunConfig,
	input_dir: &Path,
	output_dir: &Path,
	resume_from: Option<&Path>,
	device: &B::Device,
) -> Result<u64> {
	model_config.validate()?;
	run_config.validate()?;

	let seed = run_config.seed.unwrap_or_else(rand::random);
	B::seed(seed);

	let paths = data::discover(input_dir, run_config.max_examples)?;
	let mut stream = PairStream::new(
		paths,
		model_config.direction,
		run_config.batch_size,
		true,
		seed,
	);
	let max_steps = run_config.max_steps(stream.steps_per_epoch);
	info!(
		"training on {} examples ({} steps/epoch, {} max steps)",
		stream.count, stream.steps_per_epoch, max_steps
	);

	let mut generator = Generator::<B>::new(model_config, device);
	let mut discriminator = if model_config.reconstruction_only() {
		None
	} else {
		Some(Discriminator::<B>::new(model_config, device))
	};

	let adam = AdamConfig::new()
		.with_beta_1(run_config.beta1)
		.with_grad_clipping(Some(GradientClippingConfig::Value(training::GRADIENT_CLIP)));
	let mut optim_gen = adam.init::<B, Generator<B>>();
	let mut optim_disc = adam.init::<B, Discriminator<B>>();

	let checkpoints = CheckpointManager::new(output_dir);
	let mut start_step = 0;
	if let Some(resume_dir) = resume_from {
		let resume = CheckpointManager::new(resume_dir);
		if let Some(step) = resume.latest_step()? {
			generator = resume.load_generator(step, generator, device)?;
			optim_gen = resume.load_optimizer("optimizer-gen", step, optim_gen, device)?;
			if let Some(net) = discriminator.take() {
				discriminator = Some(resume.load_discriminator(step, net, device)?);
				optim_disc = resume.load_optimizer("optimizer-disc", step, optim_disc, device)?;
			}
			start_step = step;
			info!("resumed from checkpoint at step {}", step);
		} else {
			warn!("no checkpoint found in {}, starting fresh", resume_dir.display());
		}
	}

	let stop = Arc::new(AtomicBool::new(false));
	{
		let stop = Arc::clone(&stop);
		if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
			warn!("could not install interrupt handler: {}", e);
		}
	}

	let bar = logging::progress_bar(max_steps);
	bar.set_position(start_step);
	let lr = run_config.learning_rate;
	let mut last_saved = start_step;
	let mut global_step = start_step;

	for step in start_step..max_steps {
		let started = Instant::now();
		let batch = stream.next_batch()?;

		// Phase one: the discriminator commits its update against the
		// current generator.
		if let Some(net) = discriminator.take() {
			let losses = model::compute_losses(&generator, Some(&net), model_config, &batch, device);
			let updated = match losses.discrim_loss {
				Some(loss) => {
					let grads = GradientsParams::from_grads(loss.backward(), &net);
					optim_disc.step(lr, net, grads)
				},
				None => net,
			};
			discriminator = Some(updated);
		}

		// Phase two: the generator reads through the just-updated
		// discriminator, on the same batch.
		let losses = model::compute_losses(&generator, discriminator.as_ref(), model_config, &batch, device);
		let grads = GradientsParams::from_grads(losses.gen_loss.clone().backward(), &generator);
		generator = optim_gen.step(lr, generator, grads);

		global_step = step + 1;
		bar.set_position(global_step);

		if should(run_config.progress_freq, step, max_steps) {
			let scalars = losses.scalars();
			let epoch = global_step / stream.steps_per_epoch.max(1);
			info!(
				"step {} (epoch {}): gen_l1 {:.5} gen_gan {:?} discrim {:?}",
				global_step, epoch, scalars.gen_loss_l1, scalars.gen_loss_gan, scalars.discrim_loss
			);
		}
		if should(run_config.summary_freq, step, max_steps) {
			append_summary(output_dir, global_step, &losses.scalars())?;
		}
		if should(run_config.trace_freq, step, max_steps) {
			debug!("step {} took {:?}", global_step, started.elapsed());
		}
		if should(run_config.display_freq, step, max_steps) {
			let sets = report::save_images(
				output_dir,
				&batch,
				losses.outputs.clone(),
				Some(global_step),
				run_config.output_format,
			)?;
			report::append_index(output_dir, &sets)?;
		}
		if should(run_config.save_freq, step, max_steps) {
			checkpoints.save(global_step, &generator, discriminator.as_ref(), &optim_gen, &optim_disc)?;
			last_saved = global_step;
		}

		if stop.load(Ordering::SeqCst) {
			info!("interrupted at step {}", global_step);
			break;
		}
	}

	if last_saved != global_step {
		checkpoints.save(global_step, &generator, discriminator.as_ref(), &optim_gen, &optim_disc)?;
	}
	bar.finish_and_clear();
	Ok(global_step)
}

fn append_summary(output_dir: &Path, step: u64, losses: &LossScalars) -> Result<()> {
	let mut file = OpenOptions::new()
		.create(true)
		.append(true)
		.open(output_dir.join(io_constants::SUMMARY_FILE))?;
	let record = SummaryRecord { step, losses };
	writeln!(file, "{}", serde_json::to_string(&record)?)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_should_fires_on_multiples_and_final_step() {
		// Steps are 0-based; an action with period 4 fires on steps 3 and 7,
		// plus the final step of a 10-step run.
		assert!(!should(4, 0, 10));
		assert!(should(4, 3, 10));
		assert!(should(4, 7, 10));
		assert!(!should(4, 8, 10));
		assert!(should(4, 9, 10));
	}

	#[test]
	fn test_zero_frequency_disables_action() {
		for step in 0..10 {
			assert!(!should(0, step, 10));
		}
	}

	#[test]
	fn test_gradient_clipping_bounds_every_component() {
		use burn::tensor::Tensor;
		type TestBackend = burn::backend::NdArray<f32>;

		let device = Default::default();
		let clip = GradientClippingConfig::Value(training::GRADIENT_CLIP).init();
		let grad = Tensor::<TestBackend, 1>::from_floats([-3.0, -0.2, 0.0, 0.4, 9.0], &device);
		let clipped: Vec<f32> = clip.clip_gradient(grad).into_data().to_vec().unwrap();
		assert_eq!(clipped.len(), 5);
		for v in &clipped {
			assert!((-0.5..=0.5).contains(v), "{} escaped the clip range", v);
		}
		// In-range components pass through unchanged.
		assert_eq!(clipped[1], -0.2);
		assert_eq!(clipped[3], 0.4);
	}
}
