//! Conditional discriminator over (source, candidate) image pairs.
//!
//! One instance is constructed per process and its `forward` is invoked
//! twice per training step, once on the real pair and once on the generated
//! pair. Both invocations therefore read the exact same parameter tensors;
//! sharing is identity by construction, never a copy.

use crate::blocks::{conv, lrelu, BatchNorm2d, HighwayConv2d};
use crate::config::{Architecture, ModelConfig};
use crate::constants::network;
use burn::module::Module;
use burn::nn::conv::Conv2d;
use burn::nn::{Dropout, DropoutConfig, Lstm, LstmConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

#[derive(Module, Debug)]
pub enum Discriminator<B: Backend> {
	Convolutional(ConvDiscriminator<B>),
	Recurrent(RecurrentDiscriminator<B>),
}

impl<B: Backend> Discriminator<B> {
	pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
		match config.arch {
			Architecture::Convolutional => {
				Discriminator::Convolutional(ConvDiscriminator::new(config.ndf, config.dropout, device))
			},
			Architecture::Recurrent => Discriminator::Recurrent(RecurrentDiscriminator::new(device)),
		}
	}

	/// Probability map that the candidate is the real counterpart of the
	/// source. Patch-level: each cell judges one receptive field.
	pub fn forward(&self, source: Tensor<B, 4>, candidate: Tensor<B, 4>) -> Tensor<B, 3> {
		match self {
			Discriminator::Convolutional(net) => net.forward(source, candidate),
			Discriminator::Recurrent(net) => net.forward(source, candidate),
		}
	}
}

/// Stride-1 stage: highway conv -> batchnorm -> lrelu -> dropout.
#[derive(Module, Debug)]
struct DiscStage<B: Backend> {
	highway: HighwayConv2d<B>,
	norm: BatchNorm2d<B>,
	dropout: Dropout,
}

impl<B: Backend> DiscStage<B> {
	fn new(channels: usize, dropout: f64, device: &B::Device) -> Self {
		Self {
			highway: HighwayConv2d::new(channels, channels, 3, 1, device),
			norm: BatchNorm2d::new(channels, device),
			dropout: DropoutConfig::new(dropout).init(),
		}
	}

	fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.dropout
			.forward(lrelu(self.norm.forward(self.highway.forward(input)), network::LRELU_SLOPE))
	}
}

/// Strided stage: conv -> batchnorm -> lrelu.
#[derive(Module, Debug)]
struct DiscEncoderBlock<B: Backend> {
	conv: Conv2d<B>,
	norm: BatchNorm2d<B>,
}

impl<B: Backend> DiscEncoderBlock<B> {
	fn new(channels: usize, device: &B::Device) -> Self {
		Self {
			conv: conv(channels, channels, 4, 2, device),
			norm: BatchNorm2d::new(channels, device),
		}
	}

	fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		lrelu(self.norm.forward(self.conv.forward(input)), network::LRELU_SLOPE)
	}
}

/// Patch classifier: concatenates the pair on the channel axis, downsamples
/// with the same pattern as the generator's encoder, applies the highway
/// stage stack, and squashes a final single-channel conv through a sigmoid.
/// For `[b, 1, 64, 256]` inputs the output map is `[b, 2, 8]`.
#[derive(Module, Debug)]
pub struct ConvDiscriminator<B: Backend> {
	encoder_in: Conv2d<B>,
	encoders: Vec<DiscEncoderBlock<B>>,
	stages: Vec<DiscStage<B>>,
	head: Conv2d<B>,
}

impl<B: Backend> ConvDiscriminator<B> {
	pub fn new(ndf: usize, dropout: f64, device: &B::Device) -> Self {
		let width = ndf * 4;
		Self {
			encoder_in: conv(2, width, 8, 8, device),
			encoders: (0..2).map(|_| DiscEncoderBlock::new(width, device)).collect(),
			stages: (0..network::HIGHWAY_STAGES)
				.map(|_| DiscStage::new(width, dropout, device))
				.collect(),
			head: conv(width, 1, 3, 1, device),
		}
	}

	pub fn forward(&self, source: Tensor<B, 4>, candidate: Tensor<B, 4>) -> Tensor<B, 3> {
		let pair = Tensor::cat(vec![source, candidate], 1);
		let mut output = lrelu(self.encoder_in.forward(pair), network::LRELU_SLOPE);
		for block in &self.encoders {
			output = block.forward(output);
		}
		for stage in &self.stages {
			output = stage.forward(output);
		}
		let map = activation::sigmoid(self.head.forward(output));
		let [batch, _channels, height, width] = map.dims();
		map.reshape([batch, height, width])
	}
}

/// Recurrent pair classifier: encodes each stream with its own cell of the
/// same architecture and scores the pair by the sigmoid of the absolute
/// difference between the two encodings.
#[derive(Module, Debug)]
pub struct RecurrentDiscriminator<B: Backend> {
	encode_source: Lstm<B>,
	encode_candidate: Lstm<B>,
}

impl<B: Backend> RecurrentDiscriminator<B> {
	pub fn new(device: &B::Device) -> Self {
		let features = crate::constants::image::DOMAIN_WIDTH as usize;
		let hidden = network::LSTM_DISCRIM_HIDDEN;
		Self {
			encode_source: LstmConfig::new(features, hidden, true).init(device),
			encode_candidate: LstmConfig::new(features, hidden, true).init(device),
		}
	}

	pub fn forward(&self, source: Tensor<B, 4>, candidate: Tensor<B, 4>) -> Tensor<B, 3> {
		let [batch, _channels, height, width] = source.dims();
		let (encoded_source, _) = self.encode_source.forward(source.reshape([batch, height, width]), None);
		let (encoded_candidate, _) = self
			.encode_candidate
			.forward(candidate.reshape([batch, height, width]), None);
		activation::sigmoid((encoded_source - encoded_candidate).abs())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ModelConfig;

	type TestBackend = burn::backend::NdArray<f32>;

	#[test]
	fn test_conv_discriminator_patch_map() {
		let device = Default::default();
		let config = ModelConfig::builder().ndf(2).build();
		let discriminator = Discriminator::<TestBackend>::new(&config, &device);
		let source = Tensor::<TestBackend, 4>::zeros([2, 1, 64, 256], &device);
		let candidate = Tensor::<TestBackend, 4>::zeros([2, 1, 64, 256], &device);
		let map = discriminator.forward(source, candidate);
		assert_eq!(map.dims(), [2, 2, 8]);

		let max: f32 = map.clone().max().into_scalar();
		let min: f32 = map.min().into_scalar();
		assert!(max <= 1.0 && min >= 0.0);
	}

	#[test]
	fn test_identical_pair_scores_identically_across_calls() {
		// Both invocations go through the same module instance, so the same
		// inputs must produce bit-identical probability maps.
		let device = Default::default();
		let config = ModelConfig::builder().ndf(1).dropout(0.0).build();
		let discriminator = Discriminator::<TestBackend>::new(&config, &device);
		let source = Tensor::<TestBackend, 4>::random(
			[1, 1, 64, 256],
			burn::tensor::Distribution::Uniform(-1.0, 1.0),
			&device,
		);
		let candidate = Tensor::<TestBackend, 4>::random(
			[1, 1, 64, 256],
			burn::tensor::Distribution::Uniform(-1.0, 1.0),
			&device,
		);

		let first: Vec<f32> = discriminator
			.forward(source.clone(), candidate.clone())
			.into_data()
			.to_vec()
			.unwrap();
		let second: Vec<f32> = discriminator.forward(source, candidate).into_data().to_vec().unwrap();
		assert_eq!(first, second);
	}
}
