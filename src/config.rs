use crate::constants::{network, training};
use crate::error::{PairganError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of each paired image is the source domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
	AtoB,
	BtoA,
}

impl Direction {
	pub fn from_str(s: &str) -> Result<Self> {
		match s {
			"AtoB" => Ok(Direction::AtoB),
			"BtoA" => Ok(Direction::BtoA),
			_ => Err(PairganError::InvalidParameter(format!("Unknown direction: {}", s))),
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Direction::AtoB => write!(f, "AtoB"),
			Direction::BtoA => write!(f, "BtoA"),
		}
	}
}

/// Network architecture, selected once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Architecture {
	Convolutional,
	Recurrent,
}

impl Architecture {
	pub fn from_str(s: &str) -> Result<Self> {
		match s {
			"convolution" => Ok(Architecture::Convolutional),
			"lstm" => Ok(Architecture::Recurrent),
			_ => Err(PairganError::InvalidParameter(format!("Unknown architecture: {}", s))),
		}
	}
}

impl fmt::Display for Architecture {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Architecture::Convolutional => write!(f, "convolution"),
			Architecture::Recurrent => write!(f, "lstm"),
		}
	}
}

/// Which image the generator's L1 reconstruction term is measured against.
///
/// The reference implementation measured against the source image; the
/// intended target is the more defensible default, so both are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconReference {
	Target,
	Source,
}

impl ReconReference {
	pub fn from_str(s: &str) -> Result<Self> {
		match s {
			"target" => Ok(ReconReference::Target),
			"source" => Ok(ReconReference::Source),
			_ => Err(PairganError::InvalidParameter(format!(
				"Unknown reconstruction reference: {}",
				s
			))),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
	Png,
	Jpeg,
}

impl OutputFormat {
	pub fn from_str(s: &str) -> Result<Self> {
		match s {
			"png" => Ok(OutputFormat::Png),
			"jpeg" => Ok(OutputFormat::Jpeg),
			_ => Err(PairganError::InvalidParameter(format!("Unknown output filetype: {}", s))),
		}
	}

	pub fn extension(&self) -> &'static str {
		match self {
			OutputFormat::Png => "png",
			OutputFormat::Jpeg => "jpg",
		}
	}
}

/// Immutable model construction parameters.
#[derive(Debug, Clone)]
pub struct ModelConfig {
	pub direction: Direction,
	pub arch: Architecture,
	pub ngf: usize,
	pub ndf: usize,
	pub dropout: f64,
	pub l1_weight: f64,
	pub gan_weight: f64,
	pub recon_reference: ReconReference,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			direction: Direction::AtoB,
			arch: Architecture::Convolutional,
			ngf: network::DEFAULT_NGF,
			ndf: network::DEFAULT_NDF,
			dropout: network::DEFAULT_DROPOUT,
			l1_weight: training::DEFAULT_L1_WEIGHT,
			gan_weight: training::DEFAULT_GAN_WEIGHT,
			recon_reference: ReconReference::Target,
		}
	}
}

impl ModelConfig {
	pub fn builder() -> ModelConfigBuilder {
		ModelConfigBuilder::default()
	}

	/// True when the adversarial term is disabled and the discriminator is skipped entirely.
	pub fn reconstruction_only(&self) -> bool {
		self.gan_weight == 0.0
	}

	pub fn validate(&self) -> Result<()> {
		if self.ngf == 0 {
			return Err(PairganError::InvalidParameter("ngf must be greater than 0".into()));
		}
		if self.ndf == 0 {
			return Err(PairganError::InvalidParameter("ndf must be greater than 0".into()));
		}
		if !(0.0..1.0).contains(&self.dropout) {
			return Err(PairganError::InvalidParameter(format!(
				"Dropout rate ({}) must be in [0, 1)",
				self.dropout
			)));
		}
		if self.l1_weight < 0.0 || self.gan_weight < 0.0 {
			return Err(PairganError::InvalidParameter("Loss weights must not be negative".into()));
		}
		Ok(())
	}
}

#[derive(Default)]
pub struct ModelConfigBuilder {
	direction: Option<Direction>,
	arch: Option<Architecture>,
	ngf: Option<usize>,
	ndf: Option<usize>,
	dropout: Option<f64>,
	l1_weight: Option<f64>,
	gan_weight: Option<f64>,
	recon_reference: Option<ReconReference>,
}

impl ModelConfigBuilder {
	pub fn direction(mut self, direction: Direction) -> Self {
		self.direction = Some(direction);
		self
	}

	pub fn arch(mut self, arch: Architecture) -> Self {
		self.arch = Some(arch);
		self
	}

	pub fn ngf(mut self, ngf: usize) -> Self {
		self.ngf = Some(ngf);
		self
	}

	pub fn ndf(mut self, ndf: usize) -> Self {
		self.ndf = Some(ndf);
		self
	}

	pub fn dropout(mut self, dropout: f64) -> Self {
		self.dropout = Some(dropout);
		self
	}

	pub fn l1_weight(mut self, weight: f64) -> Self {
		self.l1_weight = Some(weight);
		self
	}

	pub fn gan_weight(mut self, weight: f64) -> Self {
		self.gan_weight = Some(weight);
		self
	}

	pub fn recon_reference(mut self, reference: ReconReference) -> Self {
		self.recon_reference = Some(reference);
		self
	}

	pub fn build(self) -> ModelConfig {
		let defaults = ModelConfig::default();
		ModelConfig {
			direction: self.direction.unwrap_or(defaults.direction),
			arch: self.arch.unwrap_or(defaults.arch),
			ngf: self.ngf.unwrap_or(defaults.ngf),
			ndf: self.ndf.unwrap_or(defaults.ndf),
			dropout: self.dropout.unwrap_or(defaults.dropout),
			l1_weight: self.l1_weight.unwrap_or(defaults.l1_weight),
			gan_weight: self.gan_weight.unwrap_or(defaults.gan_weight),
			recon_reference: self.recon_reference.unwrap_or(defaults.recon_reference),
		}
	}
}

/// Loop and optimiser parameters for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub batch_size: usize,
	pub learning_rate: f64,
	pub beta1: f32,
	pub seed: Option<u64>,
	pub max_steps: Option<u64>,
	pub max_epochs: Option<u64>,
	pub max_examples: Option<usize>,
	pub summary_freq: u64,
	pub progress_freq: u64,
	pub trace_freq: u64,
	pub display_freq: u64,
	pub save_freq: u64,
	pub output_format: OutputFormat,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			batch_size: training::DEFAULT_BATCH_SIZE,
			learning_rate: training::DEFAULT_LEARNING_RATE,
			beta1: training::DEFAULT_ADAM_BETA1,
			seed: None,
			max_steps: None,
			max_epochs: None,
			max_examples: None,
			summary_freq: training::DEFAULT_SUMMARY_FREQ,
			progress_freq: training::DEFAULT_PROGRESS_FREQ,
			trace_freq: 0,
			display_freq: 0,
			save_freq: training::DEFAULT_SAVE_FREQ,
			output_format: OutputFormat::Png,
		}
	}
}

impl RunConfig {
	pub fn validate(&self) -> Result<()> {
		if self.batch_size == 0 {
			return Err(PairganError::InvalidParameter("Batch size must be greater than 0".into()));
		}
		if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
			return Err(PairganError::InvalidParameter(format!(
				"Learning rate ({}) must be a positive finite number",
				self.learning_rate
			)));
		}
		if !(0.0..1.0).contains(&self.beta1) {
			return Err(PairganError::InvalidParameter(format!(
				"Adam beta1 ({}) must be in [0, 1)",
				self.beta1
			)));
		}
		Ok(())
	}

	/// Total step budget given the epoch length of the discovered dataset.
	pub fn max_steps(&self, steps_per_epoch: u64) -> u64 {
		if let Some(steps) = self.max_steps {
			steps
		} else if let Some(epochs) = self.max_epochs {
			epochs * steps_per_epoch
		} else {
			training::DEFAULT_MAX_STEPS
		}
	}
}
