//! Test mode: one deterministic ordered pass of the input set through a
//! restored generator, writing image triplets and an index page.

use crate::config::{ModelConfig, RunConfig};
use crate::data::{self, PairStream};
use crate::error::Result;
use crate::generator::Generator;
use crate::logging;
use crate::model;
use crate::report;
use crate::training::checkpoint;
use burn::tensor::backend::Backend;
use log::info;
use std::path::Path;

/// Evaluates every input example exactly once, in discovery order, and
/// returns the number of examples processed.
pub fn evaluate<B: Backend>(
	model_config: &ModelConfig,
	run_config: &RunConfig,
	input_dir: &Path,
	output_dir: &Path,
	checkpoint_dir: &Path,
	device: &B::Device,
) -> Result<usize> {
	model_config.validate()?;
	run_config.validate()?;

	let (manager, step) = checkpoint::require_checkpoint(checkpoint_dir, "test")?;
	let generator = Generator::<B>::new(model_config, device);
	let generator = manager.load_generator(step, generator, device)?;
	info!("evaluating with checkpoint from step {}", step);

	let paths = data::discover(input_dir, run_config.max_examples)?;
	let mut stream = PairStream::new(paths, model_config.direction, run_config.batch_size, false, 0);
	let count = stream.count;

	std::fs::create_dir_all(output_dir)?;
	let bar = logging::progress_bar(stream.steps_per_epoch);
	for _ in 0..stream.steps_per_epoch {
		let batch = stream.next_batch()?;
		let sources = model::batch_tensor::<B>(&batch.sources, device);
		let outputs = generator.forward(sources);
		let sets = report::save_images(output_dir, &batch, outputs, None, run_config.output_format)?;
		report::append_index(output_dir, &sets)?;
		bar.inc(1);
	}
	bar.finish_and_clear();

	info!("wrote {} image sets to {}", count, output_dir.display());
	Ok(count)
}
