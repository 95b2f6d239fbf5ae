//! Export mode: freezes a trained generator into a standalone artifact
//! directory and serves single-image inference over a base64 contract.
//!
//! The artifact holds the generator record plus an `export.json` manifest
//! describing the network needed to read it back. Inference accepts one
//! base64-encoded source-domain image and answers with the base64-encoded
//! translation, both keyed so callers can correlate requests.

use crate::config::{Architecture, Direction, ModelConfig, OutputFormat};
use crate::constants::image as image_constants;
use crate::constants::io as io_constants;
use crate::error::{PairganError, Result};
use crate::generator::Generator;
use crate::report;
use crate::training::checkpoint;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use image::codecs::jpeg::JpegEncoder;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Everything a consumer needs to rebuild the exported generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
	pub version: String,
	pub arch: Architecture,
	pub direction: Direction,
	pub ngf: usize,
	pub output_filetype: OutputFormat,
	/// Expected (height, width) of inference inputs.
	pub input_shape: (u32, u32),
}

/// One inference request: a correlation key and a base64-encoded image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
	pub key: String,
	pub input: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResponse {
	pub key: String,
	pub output: String,
}

/// Writes the generator record and manifest for `checkpoint_dir` into
/// `output_dir`.
pub fn export_generator<B: Backend>(
	model_config: &ModelConfig,
	output_format: OutputFormat,
	checkpoint_dir: &Path,
	output_dir: &Path,
	device: &B::Device,
) -> Result<()> {
	model_config.validate()?;
	let (manager, step) = checkpoint::require_checkpoint(checkpoint_dir, "export")?;
	let generator = Generator::<B>::new(model_config, device);
	let generator = manager.load_generator(step, generator, device)?;

	fs::create_dir_all(output_dir)?;
	generator
		.save_file(output_dir.join(io_constants::EXPORT_GENERATOR), &CompactRecorder::new())
		.map_err(|e| PairganError::Export(e.to_string()))?;

	let manifest = ExportManifest {
		version: env!("CARGO_PKG_VERSION").to_string(),
		arch: model_config.arch,
		direction: model_config.direction,
		ngf: model_config.ngf,
		output_filetype: output_format,
		input_shape: (image_constants::RASTER_HEIGHT, image_constants::DOMAIN_WIDTH),
	};
	fs::write(
		output_dir.join(io_constants::EXPORT_MANIFEST),
		serde_json::to_string_pretty(&manifest)?,
	)?;
	info!("exported generator from step {} to {}", step, output_dir.display());
	Ok(())
}

/// A loaded export artifact ready to answer inference requests.
pub struct InferenceArtifact<B: Backend> {
	generator: Generator<B>,
	manifest: ExportManifest,
	device: B::Device,
}

impl<B: Backend> InferenceArtifact<B> {
	pub fn load(dir: &Path, device: &B::Device) -> Result<InferenceArtifact<B>> {
		let contents = fs::read_to_string(dir.join(io_constants::EXPORT_MANIFEST))?;
		let manifest: ExportManifest = serde_json::from_str(&contents)?;

		let config = ModelConfig::builder()
			.arch(manifest.arch)
			.direction(manifest.direction)
			.ngf(manifest.ngf)
			.dropout(0.0)
			.build();
		let generator = Generator::<B>::new(&config, device);
		let record = burn::record::Recorder::load(
			&CompactRecorder::new(),
			dir.join(io_constants::EXPORT_GENERATOR).into(),
			device,
		)
		.map_err(|e| PairganError::Export(e.to_string()))?;

		Ok(InferenceArtifact {
			generator: generator.load_record(record),
			manifest,
			device: device.clone(),
		})
	}

	pub fn manifest(&self) -> &ExportManifest {
		&self.manifest
	}

	/// Translates one base64-encoded source image, echoing the request key.
	pub fn run(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
		let bytes = STANDARD
			.decode(&request.input)
			.map_err(|e| PairganError::Export(format!("invalid base64 input: {}", e)))?;
		let raster = image::load_from_memory(&bytes)?.to_luma8();

		let (height, width) = self.manifest.input_shape;
		if raster.height() != height || raster.width() != width {
			return Err(PairganError::Export(format!(
				"input must be {}x{}, got {}x{}",
				width,
				height,
				raster.width(),
				raster.height()
			)));
		}

		let pixels = raster
			.as_raw()
			.iter()
			.map(|&p| crate::data::preprocess(f32::from(p) / 255.0))
			.collect::<Vec<f32>>();
		let input = Tensor::<B, 4>::from_data(
			TensorData::new(pixels, [1, 1, height as usize, width as usize]),
			&self.device,
		);

		let output = self.generator.forward(input);
		let images = report::tensor_to_images(output)?;
		let image = images
			.first()
			.ok_or_else(|| PairganError::Export("empty inference output".into()))?;

		let mut encoded = Vec::new();
		match self.manifest.output_filetype {
			OutputFormat::Png => {
				image.write_to(&mut Cursor::new(&mut encoded), image::ImageOutputFormat::Png)?;
			},
			OutputFormat::Jpeg => {
				let mut encoder = JpegEncoder::new_with_quality(&mut encoded, 100);
				encoder.encode(image.as_raw(), image.width(), image.height(), image::ColorType::L8)?;
			},
		}

		Ok(InferenceResponse {
			key: request.key.clone(),
			output: STANDARD.encode(encoded),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::GrayImage;

	#[test]
	fn test_manifest_round_trip() {
		let manifest = ExportManifest {
			version: "0.1.0".into(),
			arch: Architecture::Convolutional,
			direction: Direction::BtoA,
			ngf: 4,
			output_filetype: OutputFormat::Png,
			input_shape: (64, 256),
		};
		let json = serde_json::to_string(&manifest).unwrap();
		let back: ExportManifest = serde_json::from_str(&json).unwrap();
		assert_eq!(back.ngf, 4);
		assert_eq!(back.direction, Direction::BtoA);
		assert_eq!(back.input_shape, (64, 256));
	}

	#[test]
	fn test_request_contract_field_names() {
		let request: InferenceRequest = serde_json::from_str(r#"{"key":"a","input":"aGk="}"#).unwrap();
		assert_eq!(request.key, "a");

		let response = InferenceResponse {
			key: "a".into(),
			output: "aGk=".into(),
		};
		let json = serde_json::to_string(&response).unwrap();
		assert!(json.contains("\"output\""));
	}

	#[test]
	fn test_base64_image_round_trip() {
		let img = GrayImage::from_pixel(256, 64, image::Luma([127]));
		let mut buffer = Vec::new();
		img.write_to(&mut Cursor::new(&mut buffer), image::ImageOutputFormat::Png)
			.unwrap();
		let encoded = STANDARD.encode(&buffer);

		let decoded = STANDARD.decode(encoded).unwrap();
		let back = image::load_from_memory(&decoded).unwrap().to_luma8();
		assert_eq!(back.dimensions(), (256, 64));
		assert_eq!(back.get_pixel(0, 0)[0], 127);
	}
}
