use crate::error::Result;
use crate::export::export_generator;
use crate::options;
use crate::EvalBackend;
use burn::backend::ndarray::NdArrayDevice;
use clap::ArgMatches;

pub fn export(app_m: &ArgMatches) -> Result<()> {
	let mut model_config = super::parse_model_config(app_m)?;
	let run_config = super::parse_run_config(app_m)?;

	let output_dir = super::dir_arg(app_m, "OUTPUT_DIR")?;
	let checkpoint_dir = super::dir_arg(app_m, "CHECKPOINT")?;

	options::apply_recorded(&checkpoint_dir, &mut model_config)?;

	let device = NdArrayDevice::default();
	export_generator::<EvalBackend>(
		&model_config,
		run_config.output_format,
		&checkpoint_dir,
		&output_dir,
		&device,
	)
}
