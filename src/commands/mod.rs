mod export;
mod test;
mod train;

pub use export::export;
pub use test::test;
pub use train::train;

use crate::config::{Architecture, Direction, ModelConfig, OutputFormat, ReconReference, RunConfig};
use crate::error::{PairganError, Result};
use clap::ArgMatches;
use std::path::PathBuf;
use std::str::FromStr;

fn parse_value<T: FromStr>(app_m: &ArgMatches, name: &str, what: &str) -> Result<Option<T>> {
	match app_m.value_of(name) {
		Some(raw) => raw
			.parse()
			.map(Some)
			.map_err(|_| PairganError::InvalidParameter(format!("{} must be {}", name, what))),
		None => Ok(None),
	}
}

fn dir_arg(app_m: &ArgMatches, name: &str) -> Result<PathBuf> {
	app_m
		.value_of(name)
		.map(PathBuf::from)
		.ok_or_else(|| PairganError::InvalidParameter(format!("No {} specified", name)))
}

fn parse_model_config(app_m: &ArgMatches) -> Result<ModelConfig> {
	let mut builder = ModelConfig::builder();

	if let Some(direction) = app_m.value_of("DIRECTION") {
		builder = builder.direction(Direction::from_str(direction)?);
	}
	if let Some(arch) = app_m.value_of("ARCH") {
		builder = builder.arch(Architecture::from_str(arch)?);
	}
	if let Some(ngf) = parse_value(app_m, "NGF", "a positive integer")? {
		builder = builder.ngf(ngf);
	}
	if let Some(ndf) = parse_value(app_m, "NDF", "a positive integer")? {
		builder = builder.ndf(ndf);
	}
	if let Some(dropout) = parse_value(app_m, "DROPOUT", "a number in [0, 1)")? {
		builder = builder.dropout(dropout);
	}
	if let Some(weight) = parse_value(app_m, "L1_WEIGHT", "a non-negative number")? {
		builder = builder.l1_weight(weight);
	}
	if let Some(weight) = parse_value(app_m, "GAN_WEIGHT", "a non-negative number")? {
		builder = builder.gan_weight(weight);
	}
	if let Some(reference) = app_m.value_of("RECON_REFERENCE") {
		builder = builder.recon_reference(ReconReference::from_str(reference)?);
	}

	let config = builder.build();
	config.validate()?;
	Ok(config)
}

fn parse_run_config(app_m: &ArgMatches) -> Result<RunConfig> {
	let mut config = RunConfig::default();

	if let Some(batch_size) = parse_value(app_m, "BATCH_SIZE", "a positive integer")? {
		config.batch_size = batch_size;
	}
	if let Some(rate) = parse_value(app_m, "LEARNING_RATE", "a positive number")? {
		config.learning_rate = rate;
	}
	if let Some(beta1) = parse_value(app_m, "BETA1", "a number in [0, 1)")? {
		config.beta1 = beta1;
	}
	config.seed = parse_value(app_m, "SEED", "an unsigned integer")?;
	config.max_steps = parse_value(app_m, "MAX_STEPS", "a positive integer")?;
	config.max_epochs = parse_value(app_m, "MAX_EPOCHS", "a positive integer")?;
	config.max_examples = parse_value(app_m, "MAX_EXAMPLES", "a positive integer")?;

	if let Some(freq) = parse_value(app_m, "SUMMARY_FREQ", "an unsigned integer")? {
		config.summary_freq = freq;
	}
	if let Some(freq) = parse_value(app_m, "PROGRESS_FREQ", "an unsigned integer")? {
		config.progress_freq = freq;
	}
	if let Some(freq) = parse_value(app_m, "TRACE_FREQ", "an unsigned integer")? {
		config.trace_freq = freq;
	}
	if let Some(freq) = parse_value(app_m, "DISPLAY_FREQ", "an unsigned integer")? {
		config.display_freq = freq;
	}
	if let Some(freq) = parse_value(app_m, "SAVE_FREQ", "an unsigned integer")? {
		config.save_freq = freq;
	}
	if let Some(format) = app_m.value_of("OUTPUT_FILETYPE") {
		config.output_format = OutputFormat::from_str(format)?;
	}

	config.validate()?;
	Ok(config)
}
