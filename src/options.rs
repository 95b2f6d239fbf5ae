//! Persisted run options.
//!
//! Every run writes an `options.json` into its output directory. When a later
//! test or export run points `--checkpoint` at that directory, the
//! architecture-defining subset (direction, architecture, ngf, ndf) recorded
//! there overrides whatever was passed on the command line, since the saved
//! parameters only fit the network they were trained with. Overrides are
//! logged and never fatal.

use crate::config::{Architecture, Direction, ModelConfig, OutputFormat, ReconReference, RunConfig};
use crate::constants::io as io_constants;
use crate::error::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
	pub mode: String,
	pub seed: u64,
	pub direction: Direction,
	pub arch: Architecture,
	pub ngf: usize,
	pub ndf: usize,
	pub dropout: f64,
	pub l1_weight: f64,
	pub gan_weight: f64,
	pub recon_reference: ReconReference,
	pub batch_size: usize,
	pub learning_rate: f64,
	pub beta1: f32,
	pub max_steps: Option<u64>,
	pub max_epochs: Option<u64>,
	pub max_examples: Option<usize>,
	pub summary_freq: u64,
	pub progress_freq: u64,
	pub trace_freq: u64,
	pub display_freq: u64,
	pub save_freq: u64,
	pub output_filetype: OutputFormat,
}

impl SessionOptions {
	pub fn new(mode: &str, seed: u64, model: &ModelConfig, run: &RunConfig) -> SessionOptions {
		SessionOptions {
			mode: mode.to_string(),
			seed,
			direction: model.direction,
			arch: model.arch,
			ngf: model.ngf,
			ndf: model.ndf,
			dropout: model.dropout,
			l1_weight: model.l1_weight,
			gan_weight: model.gan_weight,
			recon_reference: model.recon_reference,
			batch_size: run.batch_size,
			learning_rate: run.learning_rate,
			beta1: run.beta1,
			max_steps: run.max_steps,
			max_epochs: run.max_epochs,
			max_examples: run.max_examples,
			summary_freq: run.summary_freq,
			progress_freq: run.progress_freq,
			trace_freq: run.trace_freq,
			display_freq: run.display_freq,
			save_freq: run.save_freq,
			output_filetype: run.output_format,
		}
	}

	/// Writes the options next to the checkpoints of this run.
	pub fn save(&self, output_dir: &Path) -> Result<()> {
		fs::create_dir_all(output_dir)?;
		fs::write(
			output_dir.join(io_constants::OPTIONS_FILE),
			serde_json::to_string_pretty(self)?,
		)?;
		Ok(())
	}
}

/// Loads the options recorded in a checkpoint directory, if any.
pub fn load_recorded(checkpoint_dir: &Path) -> Result<Option<SessionOptions>> {
	let path = checkpoint_dir.join(io_constants::OPTIONS_FILE);
	if !path.exists() {
		return Ok(None);
	}
	let contents = fs::read_to_string(path)?;
	Ok(Some(serde_json::from_str(&contents)?))
}

/// Overrides the architecture-defining fields of `config` with the values
/// recorded at training time. Call before constructing any network for a
/// test or export run.
pub fn apply_recorded(checkpoint_dir: &Path, config: &mut ModelConfig) -> Result<()> {
	let recorded = match load_recorded(checkpoint_dir)? {
		Some(recorded) => recorded,
		None => return Ok(()),
	};

	if recorded.direction != config.direction {
		info!("checkpoint overrides direction: {}", recorded.direction);
		config.direction = recorded.direction;
	}
	if recorded.arch != config.arch {
		info!("checkpoint overrides architecture: {}", recorded.arch);
		config.arch = recorded.arch;
	}
	if recorded.ngf != config.ngf {
		info!("checkpoint overrides ngf: {}", recorded.ngf);
		config.ngf = recorded.ngf;
	}
	if recorded.ndf != config.ndf {
		info!("checkpoint overrides ndf: {}", recorded.ndf);
		config.ndf = recorded.ndf;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn test_options_round_trip() {
		let dir = TempDir::new().unwrap();
		let model = ModelConfig::builder().ngf(8).direction(Direction::BtoA).build();
		let run = RunConfig::default();
		let options = SessionOptions::new("train", 7, &model, &run);
		options.save(dir.path()).unwrap();

		let loaded = load_recorded(dir.path()).unwrap().unwrap();
		assert_eq!(loaded.mode, "train");
		assert_eq!(loaded.seed, 7);
		assert_eq!(loaded.ngf, 8);
		assert_eq!(loaded.direction, Direction::BtoA);
	}

	#[test]
	fn test_recorded_options_override_architecture_fields() {
		let dir = TempDir::new().unwrap();
		let trained = ModelConfig::builder()
			.ngf(8)
			.ndf(4)
			.direction(Direction::BtoA)
			.arch(Architecture::Recurrent)
			.build();
		SessionOptions::new("train", 0, &trained, &RunConfig::default())
			.save(dir.path())
			.unwrap();

		let mut requested = ModelConfig::default();
		apply_recorded(dir.path(), &mut requested).unwrap();
		assert_eq!(requested.ngf, 8);
		assert_eq!(requested.ndf, 4);
		assert_eq!(requested.direction, Direction::BtoA);
		assert_eq!(requested.arch, Architecture::Recurrent);
		// Non-architectural fields keep their requested values.
		assert_eq!(requested.l1_weight, ModelConfig::default().l1_weight);
	}

	#[test]
	fn test_missing_options_file_is_not_fatal() {
		let dir = TempDir::new().unwrap();
		let mut config = ModelConfig::default();
		apply_recorded(dir.path(), &mut config).unwrap();
		assert_eq!(config.ngf, ModelConfig::default().ngf);
	}
}
