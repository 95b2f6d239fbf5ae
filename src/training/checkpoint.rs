//! Checkpoint lifecycle: step-suffixed parameter snapshots plus the global
//! step counter, pruned so only the most recent snapshot survives.
//!
//! A checkpoint directory holds `generator-<step>.mpk`,
//! `discriminator-<step>.mpk`, the two optimizer moment records, a
//! `state.json` with the step counter, and the `options.json` written at run
//! start. The orchestrator is the sole writer.

use crate::constants::io as io_constants;
use crate::discriminator::Discriminator;
use crate::error::{PairganError, Result};
use crate::generator::Generator;
use burn::module::Module;
use burn::optim::Optimizer;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::backend::Backend;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide training progress persisted alongside the parameter records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingState {
	pub step: u64,
}

pub struct CheckpointManager {
	dir: PathBuf,
}

impl CheckpointManager {
	pub fn new(dir: impl AsRef<Path>) -> Self {
		Self {
			dir: dir.as_ref().to_path_buf(),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Step counter of the snapshot in this directory, if one exists.
	pub fn latest_step(&self) -> Result<Option<u64>> {
		let state_path = self.dir.join(io_constants::STATE_FILE);
		if !state_path.exists() {
			return Ok(None);
		}
		let contents = fs::read_to_string(state_path)?;
		let state: TrainingState = serde_json::from_str(&contents)?;
		Ok(Some(state.step))
	}

	/// Writes a full snapshot for `step` and prunes superseded ones.
	pub fn save<B, OG, OD>(
		&self,
		step: u64,
		generator: &Generator<B>,
		discriminator: Option<&Discriminator<B>>,
		optim_gen: &OG,
		optim_disc: &OD,
	) -> Result<()>
	where
		B: AutodiffBackend,
		OG: Optimizer<Generator<B>, B>,
		OD: Optimizer<Discriminator<B>, B>,
	{
		fs::create_dir_all(&self.dir)?;
		let recorder = CompactRecorder::new();

		generator
			.clone()
			.save_file(self.record_path("generator", step), &recorder)
			.map_err(record_error)?;
		recorder
			.record(optim_gen.to_record(), self.record_path("optimizer-gen", step))
			.map_err(record_error)?;

		if let Some(discriminator) = discriminator {
			discriminator
				.clone()
				.save_file(self.record_path("discriminator", step), &recorder)
				.map_err(record_error)?;
			recorder
				.record(optim_disc.to_record(), self.record_path("optimizer-disc", step))
				.map_err(record_error)?;
		}

		let state = TrainingState { step };
		fs::write(
			self.dir.join(io_constants::STATE_FILE),
			serde_json::to_string_pretty(&state)?,
		)?;

		self.prune(step)?;
		info!("saved checkpoint at step {}", step);
		Ok(())
	}

	/// Restores the generator parameters recorded at `step`.
	pub fn load_generator<B: Backend>(&self, step: u64, generator: Generator<B>, device: &B::Device) -> Result<Generator<B>> {
		let record = CompactRecorder::new()
			.load(self.record_path("generator", step), device)
			.map_err(record_error)?;
		Ok(generator.load_record(record))
	}

	pub fn load_discriminator<B: Backend>(
		&self,
		step: u64,
		discriminator: Discriminator<B>,
		device: &B::Device,
	) -> Result<Discriminator<B>> {
		let record = CompactRecorder::new()
			.load(self.record_path("discriminator", step), device)
			.map_err(record_error)?;
		Ok(discriminator.load_record(record))
	}

	/// Restores an optimizer's moment accumulators when a record exists;
	/// a missing record leaves the optimizer fresh (old checkpoints).
	pub fn load_optimizer<B, M, O>(&self, name: &str, step: u64, optim: O, device: &B::Device) -> Result<O>
	where
		B: AutodiffBackend,
		M: burn::module::AutodiffModule<B>,
		O: Optimizer<M, B>,
	{
		let path = self.record_path(name, step);
		if !path.with_extension("mpk").exists() {
			warn!("no {} record at step {}, starting with fresh moments", name, step);
			return Ok(optim);
		}
		let record = CompactRecorder::new().load(path, device).map_err(record_error)?;
		Ok(optim.load_record(record))
	}

	fn record_path(&self, name: &str, step: u64) -> PathBuf {
		self.dir.join(format!("{}-{}", name, step))
	}

	/// Deletes every record whose step suffix is older than `keep`.
	fn prune(&self, keep: u64) -> Result<()> {
		let suffix = format!("-{}.mpk", keep);
		for entry in fs::read_dir(&self.dir)? {
			let path = entry?.path();
			let name = match path.file_name().and_then(|n| n.to_str()) {
				Some(name) => name,
				None => continue,
			};
			if name.ends_with(".mpk") && !name.ends_with(&suffix) {
				fs::remove_file(&path)?;
			}
		}
		Ok(())
	}
}

fn record_error(err: burn::record::RecorderError) -> PairganError {
	PairganError::Record(err.to_string())
}

/// Resolves the checkpoint a test/export run must start from; absence is
/// fatal for those modes.
pub fn require_checkpoint(dir: &Path, mode: &str) -> Result<(CheckpointManager, u64)> {
	let manager = CheckpointManager::new(dir);
	match manager.latest_step()? {
		Some(step) => Ok((manager, step)),
		None => {
			if dir.exists() {
				Err(PairganError::CheckpointMissing(dir.to_path_buf()))
			} else {
				Err(PairganError::CheckpointRequired(mode.to_string()))
			}
		},
	}
}
