use env_logger::{Builder, Env};
use indicatif::{ProgressBar, ProgressStyle};

/// Initialises the global logger, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_simple_logger() {
	Builder::from_env(Env::default().default_filter_or("info"))
		.format_timestamp_secs()
		.init();
}

pub fn progress_bar(len: u64) -> ProgressBar {
	let bar = ProgressBar::new(len);
	bar.set_style(
		ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} steps {msg}")
			.unwrap_or_else(|_| ProgressStyle::default_bar()),
	);
	bar
}
