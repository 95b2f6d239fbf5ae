//! Generator network: maps a source-domain image batch `[b, 1, 64, 256]` in
//! `[-1, 1]` to a predicted target-domain batch of the same shape and range.
//!
//! Two mutually exclusive architectures are available, selected once at
//! construction and never mixed.

use crate::blocks::{conv, deconv, lrelu, BatchNorm2d, HighwayConv2d};
use crate::config::{Architecture, ModelConfig};
use crate::constants::network;
use burn::module::Module;
use burn::nn::conv::{Conv2d, ConvTranspose2d};
use burn::nn::{Dropout, DropoutConfig, Lstm, LstmConfig};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

#[derive(Module, Debug)]
pub enum Generator<B: Backend> {
	Convolutional(ConvGenerator<B>),
	Recurrent(RecurrentGenerator<B>),
}

impl<B: Backend> Generator<B> {
	pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
		match config.arch {
			Architecture::Convolutional => Generator::Convolutional(ConvGenerator::new(config.ngf, config.dropout, device)),
			Architecture::Recurrent => Generator::Recurrent(RecurrentGenerator::new(device)),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		match self {
			Generator::Convolutional(net) => net.forward(input),
			Generator::Recurrent(net) => net.forward(input),
		}
	}
}

/// Encoder step: lrelu -> strided conv -> batchnorm.
#[derive(Module, Debug)]
struct EncoderBlock<B: Backend> {
	conv: Conv2d<B>,
	norm: BatchNorm2d<B>,
}

impl<B: Backend> EncoderBlock<B> {
	fn new(channels: usize, device: &B::Device) -> Self {
		Self {
			conv: conv(channels, channels, 4, 2, device),
			norm: BatchNorm2d::new(channels, device),
		}
	}

	fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.norm.forward(self.conv.forward(lrelu(input, network::LRELU_SLOPE)))
	}
}

/// Bottleneck step: lrelu -> highway conv -> batchnorm -> dropout.
/// Width-preserving; adds depth without changing spatial size.
#[derive(Module, Debug)]
struct BottleneckBlock<B: Backend> {
	highway: HighwayConv2d<B>,
	norm: BatchNorm2d<B>,
	dropout: Dropout,
}

impl<B: Backend> BottleneckBlock<B> {
	fn new(channels: usize, dropout: f64, device: &B::Device) -> Self {
		Self {
			highway: HighwayConv2d::new(channels, channels, 3, 1, device),
			norm: BatchNorm2d::new(channels, device),
			dropout: DropoutConfig::new(dropout).init(),
		}
	}

	fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.dropout
			.forward(self.norm.forward(self.highway.forward(lrelu(input, network::LRELU_SLOPE))))
	}
}

/// Decoder step: relu -> transposed conv -> batchnorm.
#[derive(Module, Debug)]
struct DecoderBlock<B: Backend> {
	deconv: ConvTranspose2d<B>,
	norm: BatchNorm2d<B>,
}

impl<B: Backend> DecoderBlock<B> {
	fn new(channels: usize, device: &B::Device) -> Self {
		Self {
			deconv: deconv(channels, channels, 4, 2, device),
			norm: BatchNorm2d::new(channels, device),
		}
	}

	fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		self.norm.forward(self.deconv.forward(activation::relu(input)))
	}
}

/// Convolutional encoder/highway/decoder stack.
///
/// Spatial plan for `[b, 1, 64, 256]` input with width `ngf`:
/// conv(k8, s8) to `[8, 32]`, two stride-2 encoders down to `[2, 8]`,
/// four highway bottleneck stages at `[2, 8]`, two stride-2 decoders back
/// to `[8, 32]`, and a final deconv(k8, s8) to a single-channel `[64, 256]`
/// output squashed through tanh.
#[derive(Module, Debug)]
pub struct ConvGenerator<B: Backend> {
	encoder_in: Conv2d<B>,
	encoders: Vec<EncoderBlock<B>>,
	bottleneck: Vec<BottleneckBlock<B>>,
	decoders: Vec<DecoderBlock<B>>,
	head: ConvTranspose2d<B>,
}

impl<B: Backend> ConvGenerator<B> {
	pub fn new(ngf: usize, dropout: f64, device: &B::Device) -> Self {
		let width = ngf * 4;
		Self {
			encoder_in: conv(1, width, 8, 8, device),
			encoders: (0..2).map(|_| EncoderBlock::new(width, device)).collect(),
			bottleneck: (0..network::HIGHWAY_STAGES)
				.map(|_| BottleneckBlock::new(width, dropout, device))
				.collect(),
			decoders: (0..2).map(|_| DecoderBlock::new(width, device)).collect(),
			head: deconv(width, 1, 8, 8, device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let mut output = self.encoder_in.forward(input);
		for block in &self.encoders {
			output = block.forward(output);
		}
		for block in &self.bottleneck {
			output = block.forward(output);
		}
		for block in &self.decoders {
			output = block.forward(output);
		}
		activation::tanh(self.head.forward(activation::relu(output)))
	}
}

/// Recurrent sequence encoder-decoder.
///
/// Treats each image row as one timestep of a width-256 feature sequence.
/// The encoding cell consumes the rows to a final state, the decoding cell
/// regenerates a sequence from that state, and the decoded features are
/// subsampled back down to the domain width. The LSTM output nonlinearity
/// already bounds values in (-1, 1).
#[derive(Module, Debug)]
pub struct RecurrentGenerator<B: Backend> {
	encoder: Lstm<B>,
	decoder: Lstm<B>,
}

impl<B: Backend> RecurrentGenerator<B> {
	pub fn new(device: &B::Device) -> Self {
		let features = crate::constants::image::DOMAIN_WIDTH as usize;
		let hidden = features * network::LSTM_SUBSAMPLE;
		Self {
			encoder: LstmConfig::new(features, hidden, true).init(device),
			decoder: LstmConfig::new(hidden, hidden, true).init(device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let [batch, _channels, height, width] = input.dims();
		let rows = input.reshape([batch, height, width]);
		let (encoded, state) = self.encoder.forward(rows, None);
		let (decoded, _) = self.decoder.forward(encoded, Some(state));

		let hidden = decoded.dims()[2];
		let keep = Tensor::<B, 1, Int>::arange_step(0..hidden as i64, network::LSTM_SUBSAMPLE, &decoded.device());
		decoded.select(2, keep).reshape([batch, 1, height, width])
	}
}
