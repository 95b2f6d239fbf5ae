//! End-to-end runs over tiny networks and datasets: train to a checkpoint,
//! resume, evaluate deterministically, and serve an exported generator.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::GrayImage;
use pairgan::config::{ModelConfig, OutputFormat, RunConfig};
use pairgan::export::{export_generator, InferenceArtifact, InferenceRequest};
use pairgan::training::{checkpoint::CheckpointManager, evaluator, trainer};
use pairgan::{EvalBackend, TrainBackend};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_pair_image(dir: &Path, name: &str, left: u8, right: u8) {
	let mut img = GrayImage::new(512, 64);
	for (x, _y, pixel) in img.enumerate_pixels_mut() {
		pixel[0] = if x < 256 { left } else { right };
	}
	img.save(dir.join(name)).unwrap();
}

fn input_dir() -> TempDir {
	let dir = TempDir::new().unwrap();
	write_pair_image(dir.path(), "1.png", 20, 200);
	write_pair_image(dir.path(), "2.png", 60, 160);
	write_pair_image(dir.path(), "3.png", 100, 120);
	dir
}

fn tiny_model() -> ModelConfig {
	ModelConfig::builder().ngf(1).ndf(1).build()
}

fn tiny_run(max_steps: u64) -> RunConfig {
	let mut run = RunConfig::default();
	run.batch_size = 2;
	run.seed = Some(11);
	run.max_steps = Some(max_steps);
	run.summary_freq = 1;
	run.progress_freq = 0;
	run.display_freq = 1;
	run.save_freq = 1;
	run
}

#[test]
fn test_train_checkpoint_evaluate_export_cycle() {
	let input = input_dir();
	let train_out = TempDir::new().unwrap();
	let device = Default::default();

	// One training step must leave a complete checkpoint behind.
	let steps = trainer::train::<TrainBackend>(
		&tiny_model(),
		&tiny_run(1),
		input.path(),
		train_out.path(),
		None,
		&device,
	)
	.unwrap();
	assert_eq!(steps, 1);

	let manager = CheckpointManager::new(train_out.path());
	assert_eq!(manager.latest_step().unwrap(), Some(1));
	assert!(train_out.path().join("generator-1.mpk").exists());
	assert!(train_out.path().join("discriminator-1.mpk").exists());
	assert!(train_out.path().join("optimizer-gen-1.mpk").exists());
	assert!(train_out.path().join("state.json").exists());

	let summaries = fs::read_to_string(train_out.path().join("summaries.jsonl")).unwrap();
	assert_eq!(summaries.lines().count(), 1);
	assert!(summaries.contains("\"gen_loss_l1\""));
	assert!(train_out.path().join("index.html").exists());

	// Resuming continues the step count and prunes the older snapshot.
	let steps = trainer::train::<TrainBackend>(
		&tiny_model(),
		&tiny_run(2),
		input.path(),
		train_out.path(),
		Some(train_out.path()),
		&device,
	)
	.unwrap();
	assert_eq!(steps, 2);
	assert_eq!(manager.latest_step().unwrap(), Some(2));
	assert!(!train_out.path().join("generator-1.mpk").exists());
	assert!(train_out.path().join("generator-2.mpk").exists());

	// Evaluation is a single ordered pass; two runs must agree byte for byte.
	let mut eval_run = RunConfig::default();
	eval_run.batch_size = 2;
	let mut outputs = Vec::new();
	for _ in 0..2 {
		let eval_out = TempDir::new().unwrap();
		let count = evaluator::evaluate::<EvalBackend>(
			&tiny_model(),
			&eval_run,
			input.path(),
			eval_out.path(),
			train_out.path(),
			&device,
		)
		.unwrap();
		assert_eq!(count, 3);
		for stem in ["1", "2", "3"] {
			for kind in ["inputs", "outputs", "targets"] {
				let path = eval_out.path().join("images").join(format!("{}-{}.png", stem, kind));
				assert!(path.exists(), "missing {}", path.display());
			}
		}
		outputs.push(fs::read(eval_out.path().join("images").join("2-outputs.png")).unwrap());
	}
	assert_eq!(outputs[0], outputs[1]);

	// The exported artifact answers the base64 contract with the key echoed.
	let export_out = TempDir::new().unwrap();
	export_generator::<EvalBackend>(
		&tiny_model(),
		OutputFormat::Png,
		train_out.path(),
		export_out.path(),
		&device,
	)
	.unwrap();
	assert!(export_out.path().join("generator.mpk").exists());
	assert!(export_out.path().join("export.json").exists());

	let artifact = InferenceArtifact::<EvalBackend>::load(export_out.path(), &device).unwrap();
	assert_eq!(artifact.manifest().ngf, 1);

	let source = GrayImage::from_pixel(256, 64, image::Luma([40]));
	let mut encoded = Vec::new();
	source
		.write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageOutputFormat::Png)
		.unwrap();
	let response = artifact
		.run(&InferenceRequest {
			key: "example".into(),
			input: STANDARD.encode(&encoded),
		})
		.unwrap();
	assert_eq!(response.key, "example");

	let bytes = STANDARD.decode(response.output).unwrap();
	let translated = image::load_from_memory(&bytes).unwrap().to_luma8();
	assert_eq!(translated.dimensions(), (256, 64));

	// A wrongly sized inference input is rejected.
	let bad = GrayImage::from_pixel(64, 64, image::Luma([0]));
	let mut encoded = Vec::new();
	bad.write_to(&mut std::io::Cursor::new(&mut encoded), image::ImageOutputFormat::Png)
		.unwrap();
	assert!(artifact
		.run(&InferenceRequest {
			key: "bad".into(),
			input: STANDARD.encode(&encoded),
		})
		.is_err());
}

#[test]
fn test_evaluate_without_checkpoint_is_fatal() {
	let input = input_dir();
	let out = TempDir::new().unwrap();
	let missing = out.path().join("no-such-checkpoint");
	let device = Default::default();

	let result = evaluator::evaluate::<EvalBackend>(
		&tiny_model(),
		&RunConfig::default(),
		input.path(),
		out.path(),
		&missing,
		&device,
	);
	assert!(result.is_err());
}

#[test]
fn test_reconstruction_only_training_skips_discriminator() {
	let input = input_dir();
	let out = TempDir::new().unwrap();
	let device = Default::default();

	let model = ModelConfig::builder().ngf(1).ndf(1).gan_weight(0.0).build();
	let steps = trainer::train::<TrainBackend>(&model, &tiny_run(1), input.path(), out.path(), None, &device).unwrap();
	assert_eq!(steps, 1);

	assert!(out.path().join("generator-1.mpk").exists());
	assert!(!out.path().join("discriminator-1.mpk").exists());

	let summaries = fs::read_to_string(out.path().join("summaries.jsonl")).unwrap();
	assert!(summaries.contains("\"discrim_loss\":null"));
}
