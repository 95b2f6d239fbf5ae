//! Image reports: writes source/output/target triplets under `images/` and
//! maintains an `index.html` table linking them.

use crate::config::OutputFormat;
use crate::constants::io as io_constants;
use crate::data::{deprocess, Batch};
use crate::error::{PairganError, Result};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use image::codecs::jpeg::JpegEncoder;
use image::GrayImage;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One example's written image files, keyed by the input file's stem.
#[derive(Debug, Clone)]
pub struct FileSet {
	pub name: String,
	pub step: Option<u64>,
	pub source: String,
	pub output: String,
	pub target: String,
}

/// Converts a `[batch, 1, h, w]` tensor in [-1, 1] back into 8-bit
/// grayscale images.
pub fn tensor_to_images<B: Backend>(tensor: Tensor<B, 4>) -> Result<Vec<GrayImage>> {
	let [batch, _channels, height, width] = tensor.dims();
	let data: Vec<f32> = tensor
		.into_data()
		.to_vec()
		.map_err(|e| PairganError::Training(format!("tensor readback failed: {:?}", e)))?;

	let mut images = Vec::with_capacity(batch);
	for i in 0..batch {
		let pixels = data[i * height * width..(i + 1) * height * width]
			.iter()
			.map(|&v| (deprocess(v) * 255.0).round().clamp(0.0, 255.0) as u8)
			.collect::<Vec<u8>>();
		let img = GrayImage::from_raw(width as u32, height as u32, pixels)
			.ok_or_else(|| PairganError::Training("image buffer size mismatch".into()))?;
		images.push(img);
	}
	Ok(images)
}

/// Writes the batch's source/output/target triplets into `<output_dir>/images`.
///
/// File names follow `<stem>-<kind>.<ext>`; training-time displays prefix the
/// zero-padded global step so successive snapshots of the same example sort
/// together.
pub fn save_images<B: Backend>(
	output_dir: &Path,
	batch: &Batch,
	outputs: Tensor<B, 4>,
	step: Option<u64>,
	format: OutputFormat,
) -> Result<Vec<FileSet>> {
	let image_dir = output_dir.join(io_constants::IMAGE_SUBDIR);
	fs::create_dir_all(&image_dir)?;

	let sources = tensor_to_images(crate::model::batch_tensor::<B>(&batch.sources, &outputs.device()))?;
	let targets = tensor_to_images(crate::model::batch_tensor::<B>(&batch.targets, &outputs.device()))?;
	let outputs = tensor_to_images(outputs)?;

	let mut sets = Vec::with_capacity(batch.len());
	for (i, path) in batch.paths.iter().enumerate() {
		let stem = path
			.file_stem()
			.and_then(|s| s.to_str())
			.unwrap_or("example")
			.to_string();
		let name = match step {
			Some(step) => format!("{:08}-{}", step, stem),
			None => stem.clone(),
		};

		let mut set = FileSet {
			name: stem,
			step,
			source: String::new(),
			output: String::new(),
			target: String::new(),
		};
		for (kind, img) in [
			("inputs", &sources[i]),
			("outputs", &outputs[i]),
			("targets", &targets[i]),
		] {
			let filename = format!("{}-{}.{}", name, kind, format.extension());
			write_image(img, &image_dir.join(&filename), format)?;
			match kind {
				"inputs" => set.source = filename,
				"outputs" => set.output = filename,
				_ => set.target = filename,
			}
		}
		sets.push(set);
	}
	Ok(sets)
}

fn write_image(img: &GrayImage, path: &Path, format: OutputFormat) -> Result<()> {
	match format {
		OutputFormat::Png => img.save(path)?,
		OutputFormat::Jpeg => {
			let file = fs::File::create(path)?;
			let mut encoder = JpegEncoder::new_with_quality(file, 100);
			encoder.encode(img.as_raw(), img.width(), img.height(), image::ColorType::L8)?;
		},
	}
	Ok(())
}

/// Appends rows for `sets` to the run's `index.html`, creating it with a
/// header on first use. The step column only appears when the sets carry one.
pub fn append_index(output_dir: &Path, sets: &[FileSet]) -> Result<PathBuf> {
	let index_path = output_dir.join(io_constants::INDEX_FILE);
	let with_step = sets.iter().any(|s| s.step.is_some());

	let mut index = OpenOptions::new().create(true).append(true).open(&index_path)?;
	if index.metadata()?.len() == 0 {
		write!(index, "<html><body><table><tr>")?;
		if with_step {
			write!(index, "<th>step</th>")?;
		}
		writeln!(index, "<th>name</th><th>input</th><th>output</th><th>target</th></tr>")?;
	}

	for set in sets {
		write!(index, "<tr>")?;
		if let Some(step) = set.step {
			write!(index, "<td>{}</td>", step)?;
		}
		write!(index, "<td>{}</td>", set.name)?;
		for file in [&set.source, &set.output, &set.target] {
			write!(index, "<td><img src=\"{}/{}\"></td>", io_constants::IMAGE_SUBDIR, file)?;
		}
		writeln!(index, "</tr>")?;
	}
	Ok(index_path)
}

#[cfg(test)]
mod tests {
	use super::*;
	use burn::tensor::TensorData;
	use ndarray::Array4;
	use std::path::PathBuf;
	use tempfile::TempDir;

	type TestBackend = burn::backend::NdArray<f32>;

	fn tiny_batch() -> Batch {
		Batch {
			paths: vec![PathBuf::from("7.png")],
			sources: Array4::from_elem((1, 1, 2, 3), -1.0),
			targets: Array4::from_elem((1, 1, 2, 3), 1.0),
		}
	}

	fn constant_tensor(value: f32) -> Tensor<TestBackend, 4> {
		let device = Default::default();
		Tensor::from_data(TensorData::new(vec![value; 6], [1, 1, 2, 3]), &device)
	}

	#[test]
	fn test_tensor_to_images_deprocesses() {
		let images = tensor_to_images(constant_tensor(1.0)).unwrap();
		assert_eq!(images.len(), 1);
		assert_eq!(images[0].dimensions(), (3, 2));
		assert_eq!(images[0].get_pixel(0, 0)[0], 255);

		let images = tensor_to_images(constant_tensor(-1.0)).unwrap();
		assert_eq!(images[0].get_pixel(0, 0)[0], 0);
	}

	#[test]
	fn test_save_images_without_step() {
		let dir = TempDir::new().unwrap();
		let sets = save_images(dir.path(), &tiny_batch(), constant_tensor(0.0), None, OutputFormat::Png).unwrap();
		assert_eq!(sets.len(), 1);
		assert_eq!(sets[0].output, "7-outputs.png");
		assert!(dir.path().join("images").join("7-inputs.png").exists());
		assert!(dir.path().join("images").join("7-targets.png").exists());
	}

	#[test]
	fn test_save_images_with_step_prefix() {
		let dir = TempDir::new().unwrap();
		let sets = save_images(dir.path(), &tiny_batch(), constant_tensor(0.0), Some(42), OutputFormat::Png).unwrap();
		assert_eq!(sets[0].output, "00000042-7-outputs.png");
	}

	#[test]
	fn test_index_accumulates_rows() {
		let dir = TempDir::new().unwrap();
		let sets = save_images(dir.path(), &tiny_batch(), constant_tensor(0.0), None, OutputFormat::Png).unwrap();
		append_index(dir.path(), &sets).unwrap();
		let index = append_index(dir.path(), &sets).unwrap();

		let contents = std::fs::read_to_string(index).unwrap();
		assert_eq!(contents.matches("<tr>").count(), 3);
		assert!(contents.contains("7-outputs.png"));
	}
}
