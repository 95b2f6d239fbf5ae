//! Paired-image data pipeline: file discovery, decode/split/normalise, and
//! batched prefetch with a bounded queue.
//!
//! Every input image is a 64x512 single-channel raster holding two 64x256
//! domain images side by side. The pipeline splits each file into a
//! (source, target) pair according to the configured direction and produces
//! stacked batches for the training loop.

use crate::config::Direction;
use crate::constants::image as image_constants;
use crate::constants::io as io_constants;
use crate::error::{PairganError, Result};
use log::debug;
use ndarray::{Array2, Array4, s};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;

/// Maps a pixel value from [0, 1] into the signed unit range [-1, 1].
pub fn preprocess(v: f32) -> f32 {
	v * 2.0 - 1.0
}

/// Inverse of [`preprocess`].
pub fn deprocess(v: f32) -> f32 {
	(v + 1.0) / 2.0
}

/// One decoded input file split into its two domain halves, values in [-1, 1].
#[derive(Debug, Clone)]
pub struct DomainPair {
	pub path: PathBuf,
	pub source: Array2<f32>,
	pub target: Array2<f32>,
}

/// A fixed-size group of pairs stacked along a leading batch axis,
/// shape [batch, 1, 64, 256]. Created once per step and consumed once.
#[derive(Debug)]
pub struct Batch {
	pub paths: Vec<PathBuf>,
	pub sources: Array4<f32>,
	pub targets: Array4<f32>,
}

impl Batch {
	pub fn len(&self) -> usize {
		self.paths.len()
	}

	pub fn is_empty(&self) -> bool {
		self.paths.is_empty()
	}

	fn stack(pairs: Vec<DomainPair>) -> Batch {
		let height = image_constants::RASTER_HEIGHT as usize;
		let width = image_constants::DOMAIN_WIDTH as usize;
		let mut sources = Array4::zeros((pairs.len(), 1, height, width));
		let mut targets = Array4::zeros((pairs.len(), 1, height, width));
		let mut paths = Vec::with_capacity(pairs.len());
		for (i, pair) in pairs.into_iter().enumerate() {
			sources.slice_mut(s![i, 0, .., ..]).assign(&pair.source);
			targets.slice_mut(s![i, 0, .., ..]).assign(&pair.target);
			paths.push(pair.path);
		}
		Batch { paths, sources, targets }
	}
}

/// Lists image files in `dir`, preferring jpg and falling back to png.
///
/// An absent directory or one with no matching files is a fatal error:
/// there is nothing sensible to train or evaluate on.
pub fn discover(dir: &Path, max_examples: Option<usize>) -> Result<Vec<PathBuf>> {
	let mut jpgs = Vec::new();
	let mut pngs = Vec::new();
	let entries = std::fs::read_dir(dir).map_err(|_| PairganError::NoInputImages(dir.to_path_buf()))?;
	for entry in entries {
		let path = entry?.path();
		match path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase()) {
			Some(ref ext) if ext == "jpg" || ext == "jpeg" => jpgs.push(path),
			Some(ref ext) if ext == "png" => pngs.push(path),
			_ => {},
		}
	}

	let mut paths = if !jpgs.is_empty() { jpgs } else { pngs };
	if paths.is_empty() {
		return Err(PairganError::NoInputImages(dir.to_path_buf()));
	}

	paths = order(paths);
	if let Some(max) = max_examples {
		paths.truncate(max);
	}
	Ok(paths)
}

/// Sorts paths by integer filename stem when every stem is numeric, and
/// lexicographically otherwise, so test-mode output order is reproducible.
pub fn order(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
	fn stem(path: &Path) -> &str {
		path.file_stem().and_then(|s| s.to_str()).unwrap_or("")
	}

	let all_numeric = paths
		.iter()
		.all(|p| !stem(p).is_empty() && stem(p).chars().all(|c| c.is_ascii_digit()));
	if all_numeric {
		paths.sort_by_key(|p| stem(p).parse::<u64>().unwrap_or(u64::MAX));
	} else {
		paths.sort();
	}
	paths
}

/// Decodes `path` to a single-channel raster, checks the fixed 64x512 shape,
/// normalises into [-1, 1] and splits into the two domain halves.
pub fn load_and_split(path: &Path, direction: Direction) -> Result<DomainPair> {
	let raster = image::open(path)?.to_luma8();
	if raster.height() != image_constants::RASTER_HEIGHT || raster.width() != image_constants::RASTER_WIDTH {
		return Err(PairganError::DimensionMismatch {
			path: path.to_path_buf(),
			height: raster.height(),
			width: raster.width(),
		});
	}

	let height = image_constants::RASTER_HEIGHT as usize;
	let width = image_constants::RASTER_WIDTH as usize;
	let half = image_constants::DOMAIN_WIDTH as usize;
	let full = Array2::from_shape_fn((height, width), |(y, x)| {
		preprocess(f32::from(raster.get_pixel(x as u32, y as u32)[0]) / 255.0)
	});

	let first = full.slice(s![.., ..half]).to_owned();
	let second = full.slice(s![.., half..]).to_owned();
	let (source, target) = match direction {
		Direction::AtoB => (first, second),
		Direction::BtoA => (second, first),
	};

	Ok(DomainPair {
		path: path.to_path_buf(),
		source,
		target,
	})
}

/// Number of steps making up one pass over `count` samples.
pub fn steps_per_epoch(count: usize, batch_size: usize) -> u64 {
	((count + batch_size - 1) / batch_size) as u64
}

/// A producer of [`Batch`] values backed by prefetch worker threads.
///
/// Workers decode files into a bounded queue; producers block when it is
/// full and the per-step fetch blocks when it is empty. Train mode
/// reshuffles the file order continuously; test mode performs exactly one
/// ordered pass with a single worker so output order is deterministic.
pub struct PairStream {
	rx: Receiver<Result<DomainPair>>,
	batch_size: usize,
	pub count: usize,
	pub steps_per_epoch: u64,
}

impl PairStream {
	pub fn new(paths: Vec<PathBuf>, direction: Direction, batch_size: usize, shuffle: bool, seed: u64) -> PairStream {
		let count = paths.len();
		let steps = steps_per_epoch(count, batch_size);
		let workers = if shuffle { io_constants::PREFETCH_THREADS } else { 1 };

		let (work_tx, work_rx) = sync_channel::<PathBuf>(io_constants::PREFETCH_QUEUE_DEPTH);
		let (pair_tx, pair_rx) = sync_channel::<Result<DomainPair>>(io_constants::PREFETCH_QUEUE_DEPTH);

		spawn_feeder(paths, shuffle, seed, work_tx);
		let work_rx = Arc::new(Mutex::new(work_rx));
		for worker in 0..workers {
			spawn_decoder(worker, direction, Arc::clone(&work_rx), pair_tx.clone());
		}

		PairStream {
			rx: pair_rx,
			batch_size,
			count,
			steps_per_epoch: steps,
		}
	}

	/// Blocks until a full batch is queued, or until the stream ends in an
	/// ordered pass, in which case the final batch may be short.
	pub fn next_batch(&mut self) -> Result<Batch> {
		let mut pairs = Vec::with_capacity(self.batch_size);
		while pairs.len() < self.batch_size {
			match self.rx.recv() {
				Ok(pair) => pairs.push(pair?),
				Err(_) if !pairs.is_empty() => break,
				Err(_) => return Err(PairganError::Training("input stream exhausted".into())),
			}
		}
		Ok(Batch::stack(pairs))
	}
}

/// Pushes file paths into the work queue: endless reshuffled passes for
/// training, a single ordered pass otherwise.
fn spawn_feeder(paths: Vec<PathBuf>, shuffle: bool, seed: u64, tx: SyncSender<PathBuf>) {
	thread::spawn(move || {
		if shuffle {
			let mut rng = StdRng::seed_from_u64(seed);
			let mut queue = paths;
			loop {
				queue.shuffle(&mut rng);
				for path in &queue {
					if tx.send(path.clone()).is_err() {
						return;
					}
				}
			}
		} else {
			for path in paths {
				if tx.send(path).is_err() {
					return;
				}
			}
		}
	});
}

fn spawn_decoder(
	worker: usize,
	direction: Direction,
	work_rx: Arc<Mutex<Receiver<PathBuf>>>,
	tx: SyncSender<Result<DomainPair>>,
) {
	thread::spawn(move || loop {
		let path = {
			let guard = match work_rx.lock() {
				Ok(guard) => guard,
				Err(_) => return,
			};
			match guard.recv() {
				Ok(path) => path,
				Err(_) => {
					debug!("decode worker {} finished", worker);
					return;
				},
			}
		};
		if tx.send(load_and_split(&path, direction)).is_err() {
			return;
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::GrayImage;
	use tempfile::TempDir;

	fn write_pair_image(dir: &Path, name: &str, left: u8, right: u8) -> PathBuf {
		let mut img = GrayImage::new(image_constants::RASTER_WIDTH, image_constants::RASTER_HEIGHT);
		for (x, _y, pixel) in img.enumerate_pixels_mut() {
			pixel[0] = if x < image_constants::DOMAIN_WIDTH { left } else { right };
		}
		let path = dir.join(name);
		img.save(&path).unwrap();
		path
	}

	#[test]
	fn test_preprocess_deprocess_round_trip() {
		for i in 0..=255 {
			let v = i as f32 / 255.0;
			assert!((deprocess(preprocess(v)) - v).abs() < 1e-6);
		}
	}

	#[test]
	fn test_numeric_ordering() {
		let paths = vec![PathBuf::from("2.png"), PathBuf::from("10.png"), PathBuf::from("1.png")];
		let ordered = order(paths);
		assert_eq!(
			ordered,
			vec![PathBuf::from("1.png"), PathBuf::from("2.png"), PathBuf::from("10.png")]
		);
	}

	#[test]
	fn test_lexicographic_ordering() {
		let paths = vec![PathBuf::from("b.png"), PathBuf::from("a.png")];
		assert_eq!(order(paths), vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
	}

	#[test]
	fn test_steps_per_epoch_ceiling() {
		assert_eq!(steps_per_epoch(10, 3), 4);
		assert_eq!(steps_per_epoch(9, 3), 3);
		assert_eq!(steps_per_epoch(1, 100), 1);
	}

	#[test]
	fn test_discover_empty_directory_fails() {
		let dir = TempDir::new().unwrap();
		assert!(matches!(
			discover(dir.path(), None),
			Err(PairganError::NoInputImages(_))
		));
	}

	#[test]
	fn test_discover_missing_directory_fails() {
		assert!(discover(Path::new("/nonexistent/input"), None).is_err());
	}

	#[test]
	fn test_discover_truncates_to_max_examples() {
		let dir = TempDir::new().unwrap();
		for name in &["1.png", "2.png", "3.png"] {
			write_pair_image(dir.path(), name, 0, 255);
		}
		let paths = discover(dir.path(), Some(2)).unwrap();
		assert_eq!(paths.len(), 2);
	}

	#[test]
	fn test_load_and_split_directions() {
		let dir = TempDir::new().unwrap();
		let path = write_pair_image(dir.path(), "0.png", 0, 255);

		let pair = load_and_split(&path, Direction::AtoB).unwrap();
		assert_eq!(pair.source.dim(), (64, 256));
		assert!((pair.source[(0, 0)] - -1.0).abs() < 1e-6);
		assert!((pair.target[(0, 0)] - 1.0).abs() < 1e-6);

		let pair = load_and_split(&path, Direction::BtoA).unwrap();
		assert!((pair.source[(0, 0)] - 1.0).abs() < 1e-6);
		assert!((pair.target[(0, 0)] - -1.0).abs() < 1e-6);
	}

	#[test]
	fn test_load_rejects_wrong_dimensions() {
		let dir = TempDir::new().unwrap();
		let img = GrayImage::new(512, 63);
		let path = dir.path().join("bad.png");
		img.save(&path).unwrap();
		assert!(matches!(
			load_and_split(&path, Direction::AtoB),
			Err(PairganError::DimensionMismatch { .. })
		));
	}

	#[test]
	fn test_ordered_stream_is_deterministic() {
		let dir = TempDir::new().unwrap();
		for name in &["2.png", "10.png", "1.png"] {
			write_pair_image(dir.path(), name, 0, 255);
		}
		let expected = ["1", "2", "10"];

		for _ in 0..2 {
			let paths = discover(dir.path(), None).unwrap();
			let mut stream = PairStream::new(paths, Direction::AtoB, 2, false, 0);
			assert_eq!(stream.count, 3);
			assert_eq!(stream.steps_per_epoch, 2);

			let mut seen = Vec::new();
			for _ in 0..stream.steps_per_epoch {
				let batch = stream.next_batch().unwrap();
				for path in &batch.paths {
					seen.push(path.file_stem().unwrap().to_str().unwrap().to_string());
				}
			}
			assert_eq!(seen, expected);
		}
	}

	#[test]
	fn test_shuffled_stream_produces_full_batches() {
		let dir = TempDir::new().unwrap();
		for name in &["1.png", "2.png", "3.png"] {
			write_pair_image(dir.path(), name, 10, 20);
		}
		let paths = discover(dir.path(), None).unwrap();
		let mut stream = PairStream::new(paths, Direction::AtoB, 2, true, 42);
		// Shuffled streams cycle endlessly, so every batch is full.
		for _ in 0..4 {
			let batch = stream.next_batch().unwrap();
			assert_eq!(batch.len(), 2);
			assert_eq!(batch.sources.dim(), (2, 1, 64, 256));
		}
	}
}
