pub mod image {
	pub const RASTER_HEIGHT: u32 = 64;
	pub const RASTER_WIDTH: u32 = 512;
	pub const DOMAIN_WIDTH: u32 = 256;
}

pub mod network {
	pub const DEFAULT_NGF: usize = 96;
	pub const DEFAULT_NDF: usize = 96;
	pub const DEFAULT_DROPOUT: f64 = 0.5;
	pub const HIGHWAY_STAGES: usize = 4;
	pub const HIGHWAY_CARRY_BIAS: f64 = -0.8;
	pub const FC_HIGHWAY_CARRY_BIAS: f64 = -1.0;
	pub const WEIGHT_INIT_STDDEV: f64 = 0.2;
	pub const BIAS_INIT: f64 = 0.1;
	pub const BATCHNORM_SCALE_STDDEV: f64 = 0.02;
	pub const BATCHNORM_EPSILON: f64 = 1e-5;
	pub const LRELU_SLOPE: f64 = 0.2;
	/// Hidden width of the recurrent discriminator encoders.
	pub const LSTM_DISCRIM_HIDDEN: usize = 256;
	/// The recurrent decoder keeps every n-th feature to land back on the domain width.
	pub const LSTM_SUBSAMPLE: usize = 8;
}

pub mod training {
	pub const DEFAULT_BATCH_SIZE: usize = 100;
	pub const DEFAULT_LEARNING_RATE: f64 = 2e-3;
	pub const DEFAULT_ADAM_BETA1: f32 = 0.9;
	pub const DEFAULT_L1_WEIGHT: f64 = 1.0;
	pub const DEFAULT_GAN_WEIGHT: f64 = 1.0;
	pub const GRADIENT_CLIP: f32 = 0.5;
	pub const LOSS_EPSILON: f64 = 1e-12;
	/// Step cap applied when neither --max-steps nor --max-epochs is given.
	pub const DEFAULT_MAX_STEPS: u64 = 1 << 32;
	pub const DEFAULT_SUMMARY_FREQ: u64 = 400;
	pub const DEFAULT_PROGRESS_FREQ: u64 = 200;
	pub const DEFAULT_SAVE_FREQ: u64 = 200;
}

pub mod io {
	pub const PREFETCH_THREADS: usize = 2;
	pub const PREFETCH_QUEUE_DEPTH: usize = 64;
	pub const OPTIONS_FILE: &str = "options.json";
	pub const STATE_FILE: &str = "state.json";
	pub const INDEX_FILE: &str = "index.html";
	pub const IMAGE_SUBDIR: &str = "images";
	pub const SUMMARY_FILE: &str = "summaries.jsonl";
	pub const EXPORT_MANIFEST: &str = "export.json";
	pub const EXPORT_GENERATOR: &str = "generator";
}
