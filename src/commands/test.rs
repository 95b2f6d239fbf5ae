use crate::error::Result;
use crate::options::{self, SessionOptions};
use crate::training::evaluator;
use crate::EvalBackend;
use burn::backend::ndarray::NdArrayDevice;
use clap::ArgMatches;
use std::fs;

pub fn test(app_m: &ArgMatches) -> Result<()> {
	let mut model_config = super::parse_model_config(app_m)?;
	let run_config = super::parse_run_config(app_m)?;

	let input_dir = super::dir_arg(app_m, "INPUT_DIR")?;
	let output_dir = super::dir_arg(app_m, "OUTPUT_DIR")?;
	let checkpoint_dir = super::dir_arg(app_m, "CHECKPOINT")?;

	// The recorded architecture wins over command-line flags; the saved
	// parameters only fit the network they were trained with.
	options::apply_recorded(&checkpoint_dir, &mut model_config)?;

	fs::create_dir_all(&output_dir)?;
	SessionOptions::new("test", 0, &model_config, &run_config).save(&output_dir)?;

	let device = NdArrayDevice::default();
	evaluator::evaluate::<EvalBackend>(
		&model_config,
		&run_config,
		&input_dir,
		&output_dir,
		&checkpoint_dir,
		&device,
	)?;
	Ok(())
}
