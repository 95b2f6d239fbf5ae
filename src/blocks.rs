//! Reusable stateful tensor blocks shared by the generator and discriminator.
//!
//! Each block owns its parameters, created at construction with a fixed
//! initialisation policy: normal(0, 0.2) for filter weights, constants for
//! biases and gains. Spatial arithmetic follows same-padding semantics, so a
//! strided block divides (conv) or multiplies (deconv) the spatial size by
//! its stride. Channel counts are explicit arguments; a mismatch against the
//! incoming tensor is a construction/programming error, not a runtime
//! condition to recover from.

use crate::constants::network;
use burn::module::{Module, Param};
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{Initializer, PaddingConfig2d};
use burn::tensor::activation;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

fn weight_init() -> Initializer {
	Initializer::Normal {
		mean: 0.0,
		std: network::WEIGHT_INIT_STDDEV,
	}
}

/// Strided convolution without bias, same-padding.
pub fn conv<B: Backend>(
	in_channels: usize,
	out_channels: usize,
	filter: usize,
	stride: usize,
	device: &B::Device,
) -> Conv2d<B> {
	Conv2dConfig::new([in_channels, out_channels], [filter, filter])
		.with_stride([stride, stride])
		.with_padding(PaddingConfig2d::Explicit(same_padding(filter, stride), same_padding(filter, stride)))
		.with_bias(false)
		.with_initializer(weight_init())
		.init(device)
}

/// Transposed (upsampling) convolution without bias; output spatial size is
/// input size times stride.
pub fn deconv<B: Backend>(
	in_channels: usize,
	out_channels: usize,
	filter: usize,
	stride: usize,
	device: &B::Device,
) -> ConvTranspose2d<B> {
	let padding = same_padding(filter, stride);
	ConvTranspose2dConfig::new([in_channels, out_channels], [filter, filter])
		.with_stride([stride, stride])
		.with_padding([padding, padding])
		.with_initializer(weight_init())
		.with_bias(false)
		.init(device)
}

/// Symmetric padding that realises exact same-padding arithmetic for the
/// filter/stride combinations used here (k == s, or k = s + 2p).
fn same_padding(filter: usize, stride: usize) -> usize {
	debug_assert!(filter >= stride && (filter - stride) % 2 == 0);
	(filter - stride) / 2
}

/// Leaky rectifier as a branch-free algebraic blend,
/// `0.5(1+a)x + 0.5(1-a)|x|`, with leak slope `a`.
pub fn lrelu<B: Backend, const D: usize>(x: Tensor<B, D>, a: f64) -> Tensor<B, D> {
	x.clone().mul_scalar(0.5 * (1.0 + a)) + x.abs().mul_scalar(0.5 * (1.0 - a))
}

/// Gated highway convolution.
///
/// Computes a transform path `H = relu(W*x + b)` and a carry path
/// `C = W_T*x`, blending them with the learned gate `T = sigmoid(C + b_T)`
/// as `H*T + C*(1-T)`. The carry bias starts negative so the gate initially
/// favours passing the carry activation through, which keeps early training
/// close to an identity map.
#[derive(Module, Debug)]
pub struct HighwayConv2d<B: Backend> {
	transform: Conv2d<B>,
	carry: Conv2d<B>,
	bias: Param<Tensor<B, 1>>,
	carry_bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> HighwayConv2d<B> {
	pub fn new(in_channels: usize, out_channels: usize, filter: usize, stride: usize, device: &B::Device) -> Self {
		Self {
			transform: conv(in_channels, out_channels, filter, stride, device),
			carry: conv(in_channels, out_channels, filter, stride, device),
			bias: Initializer::Constant { value: network::BIAS_INIT }.init([out_channels], device),
			carry_bias: Initializer::Constant {
				value: network::HIGHWAY_CARRY_BIAS,
			}
			.init([out_channels], device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let carry_lin = self.carry.forward(input.clone());
		let transform_lin = self.transform.forward(input);
		gated_blend(transform_lin, carry_lin, &self.bias, &self.carry_bias)
	}
}

/// Gated highway transposed convolution; same blend as [`HighwayConv2d`]
/// over upsampling paths.
#[derive(Module, Debug)]
pub struct HighwayDeconv2d<B: Backend> {
	transform: ConvTranspose2d<B>,
	carry: ConvTranspose2d<B>,
	bias: Param<Tensor<B, 1>>,
	carry_bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> HighwayDeconv2d<B> {
	pub fn new(in_channels: usize, out_channels: usize, filter: usize, stride: usize, device: &B::Device) -> Self {
		Self {
			transform: deconv(in_channels, out_channels, filter, stride, device),
			carry: deconv(in_channels, out_channels, filter, stride, device),
			bias: Initializer::Constant { value: network::BIAS_INIT }.init([out_channels], device),
			carry_bias: Initializer::Constant {
				value: network::HIGHWAY_CARRY_BIAS,
			}
			.init([out_channels], device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let carry_lin = self.carry.forward(input.clone());
		let transform_lin = self.transform.forward(input);
		gated_blend(transform_lin, carry_lin, &self.bias, &self.carry_bias)
	}
}

fn gated_blend<B: Backend>(
	transform_lin: Tensor<B, 4>,
	carry_lin: Tensor<B, 4>,
	bias: &Param<Tensor<B, 1>>,
	carry_bias: &Param<Tensor<B, 1>>,
) -> Tensor<B, 4> {
	let channels = bias.val().dims()[0];
	let h = activation::relu(transform_lin + bias.val().reshape([1, channels, 1, 1]));
	let t = activation::sigmoid(carry_lin.clone() + carry_bias.val().reshape([1, channels, 1, 1]));
	let carry_gate = t.clone().neg().add_scalar(1.0);
	h * t + carry_lin * carry_gate
}

/// Per-channel batch normalisation from fresh batch statistics.
///
/// Mean and variance are computed over the batch and spatial axes on every
/// call; nothing is tracked across steps. Scale is learned with init
/// normal(1, 0.02), offset starts at zero.
#[derive(Module, Debug)]
pub struct BatchNorm2d<B: Backend> {
	scale: Param<Tensor<B, 1>>,
	offset: Param<Tensor<B, 1>>,
}

impl<B: Backend> BatchNorm2d<B> {
	pub fn new(channels: usize, device: &B::Device) -> Self {
		Self {
			scale: Initializer::Normal {
				mean: 1.0,
				std: network::BATCHNORM_SCALE_STDDEV,
			}
			.init([channels], device),
			offset: Initializer::Zeros.init([channels], device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
		let channels = self.scale.val().dims()[0];
		let mean = input.clone().mean_dim(0).mean_dim(2).mean_dim(3);
		let centred = input - mean;
		let variance = centred.clone().powf_scalar(2.0).mean_dim(0).mean_dim(2).mean_dim(3);
		let normalised = centred / (variance.add_scalar(network::BATCHNORM_EPSILON)).sqrt();
		normalised * self.scale.val().reshape([1, channels, 1, 1]) + self.offset.val().reshape([1, channels, 1, 1])
	}
}

/// Fully-connected highway block over feature vectors, `y = H*T + x*(1-T)`.
/// Width-preserving; the carry bias starts at -1.0.
#[derive(Module, Debug)]
pub struct Highway<B: Backend> {
	transform: Param<Tensor<B, 2>>,
	carry: Param<Tensor<B, 2>>,
	bias: Param<Tensor<B, 1>>,
	carry_bias: Param<Tensor<B, 1>>,
}

impl<B: Backend> Highway<B> {
	pub fn new(width: usize, device: &B::Device) -> Self {
		Self {
			transform: weight_init().init([width, width], device),
			carry: weight_init().init([width, width], device),
			bias: Initializer::Constant { value: 0.01 }.init([width], device),
			carry_bias: Initializer::Constant {
				value: network::FC_HIGHWAY_CARRY_BIAS,
			}
			.init([width], device),
		}
	}

	pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
		let h = activation::relu(input.clone().matmul(self.transform.val()) + self.bias.val().unsqueeze::<2>());
		let t = activation::sigmoid(input.clone().matmul(self.carry.val()) + self.carry_bias.val().unsqueeze::<2>());
		let carry_gate = t.clone().neg().add_scalar(1.0);
		h * t + input * carry_gate
	}
}
