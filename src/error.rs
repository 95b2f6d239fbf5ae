use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

#[derive(Debug)]
pub enum PairganError {
	Io(io::Error),
	Image(image::ImageError),
	InvalidParameter(String),
	NoInputImages(PathBuf),
	DimensionMismatch { path: PathBuf, height: u32, width: u32 },
	CheckpointRequired(String),
	CheckpointMissing(PathBuf),
	Record(String),
	Training(String),
	Serialization(String),
	Export(String),
}

impl fmt::Display for PairganError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			PairganError::Io(err) => write!(f, "IO error: {}", err),
			PairganError::Image(err) => write!(f, "Image processing error: {}", err),
			PairganError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
			PairganError::NoInputImages(dir) => {
				write!(f, "Input directory {} contains no image files", dir.display())
			},
			PairganError::DimensionMismatch { path, height, width } => write!(
				f,
				"Image {} is {}x{}, paired images must be exactly 512x64",
				path.display(),
				width,
				height
			),
			PairganError::CheckpointRequired(mode) => {
				write!(f, "A checkpoint directory is required for {} mode", mode)
			},
			PairganError::CheckpointMissing(dir) => {
				write!(f, "No checkpoint found in {}", dir.display())
			},
			PairganError::Record(msg) => write!(f, "Record error: {}", msg),
			PairganError::Training(msg) => write!(f, "Training error: {}", msg),
			PairganError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
			PairganError::Export(msg) => write!(f, "Export error: {}", msg),
		}
	}
}

impl StdError for PairganError {}

impl From<io::Error> for PairganError {
	fn from(err: io::Error) -> Self {
		PairganError::Io(err)
	}
}

impl From<image::ImageError> for PairganError {
	fn from(err: image::ImageError) -> Self {
		PairganError::Image(err)
	}
}

impl From<serde_json::Error> for PairganError {
	fn from(err: serde_json::Error) -> Self {
		PairganError::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, PairganError>;
