use crate::error::Result;
use crate::options::SessionOptions;
use crate::training::trainer;
use crate::TrainBackend;
use burn::backend::ndarray::NdArrayDevice;
use clap::ArgMatches;
use log::info;
use std::fs;
use std::path::PathBuf;

pub fn train(app_m: &ArgMatches) -> Result<()> {
	let model_config = super::parse_model_config(app_m)?;
	let mut run_config = super::parse_run_config(app_m)?;

	let input_dir = super::dir_arg(app_m, "INPUT_DIR")?;
	let output_dir = super::dir_arg(app_m, "OUTPUT_DIR")?;
	let resume_from = app_m.value_of("CHECKPOINT").map(PathBuf::from);

	// Resolve the seed up front so the recorded options reproduce the run.
	let seed = run_config.seed.unwrap_or_else(rand::random);
	run_config.seed = Some(seed);
	info!("seed: {}", seed);

	fs::create_dir_all(&output_dir)?;
	SessionOptions::new("train", seed, &model_config, &run_config).save(&output_dir)?;

	let device = NdArrayDevice::default();
	let steps = trainer::train::<TrainBackend>(
		&model_config,
		&run_config,
		&input_dir,
		&output_dir,
		resume_from.as_deref(),
		&device,
	)?;
	info!("training finished after {} steps", steps);
	Ok(())
}
