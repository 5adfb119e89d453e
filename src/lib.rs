//! A convolutional neural network compute engine in pure Rust.
//!
//! The crate provides batched 2D convolution kernels (valid, same and full boundary
//! modes, direct and shared-memory tiled), an adaptive tiling scheduler that shrinks thread
//! blocks until a tile fits the shared-memory budget, batched average-pooling kernels, and
//! two network layers built on them: [`ConvolutionalLayer`](neural_network::ConvolutionalLayer)
//! and [`SubSamplingLayer`](neural_network::SubSamplingLayer).
//!
//! Kernels run on an emulated accelerator ([`Device`](neural_network::Device)) that follows
//! the grid / block / shared-memory execution model and executes blocks in parallel with
//! rayon.

/// Error types shared by the whole crate
pub mod error;

pub use error::ModelError;

/// Components of the convolution engine: device, kernels, feature maps and layers.
///
/// # Core Components
///
/// ## Execution
/// - **Device**: Emulated accelerator running grid launches with per-block shared memory
/// - **DeviceConfig**: Shared-memory budget, thread limits and default block shape
/// - **plan_tiles**: Shrinks a thread block until its convolution tile fits shared memory
///
/// ## Kernels
/// - **convolve**: Single 2D convolution under any `ConvType`
/// - **TiledConvolution**: Batched shared-memory correlation with optional data/kernel rotation
/// - **downsample** / **upsample**: Batched average pooling and its replicate inverse
///
/// ## Layers
/// - **ConvolutionalLayer**: Learned kernels and biases; forward, backward and gradient updates
/// - **SubSamplingLayer**: Average pooling with a fixed integer scale
///
/// # Examples
/// ```rust
/// use rustycnn::neural_network::*;
/// use std::sync::Arc;
///
/// let device = Arc::new(Device::default());
/// let conv = ConvolutionalLayer::new(device.clone(), 1, 6, Size::new(5, 5), Size::new(28, 28)).unwrap();
/// let pool = SubSamplingLayer::new(device, 6, 6, 2, Size::new(24, 24)).unwrap();
///
/// let x = FeatureMaps::zeros(1, Size::new(28, 28), 4);
/// let mut hidden = FeatureMaps::zeros(0, Size::default(), 0);
/// let mut pooled = FeatureMaps::zeros(0, Size::default(), 0);
///
/// conv.feed_forward(&mut hidden, &x).unwrap();
/// pool.feed_forward(&mut pooled, &hidden).unwrap();
///
/// assert_eq!(pooled.image_size(), Size::new(12, 12));
/// assert_eq!(pooled.maps(), 6);
/// ```
pub mod neural_network;

/// A convenience module that re-exports the most commonly used types and traits from this crate.
///
/// # Examples
/// ```rust
/// use rustycnn::prelude::*;
///
/// let device = Device::default();
/// assert_eq!(Size::new(3, 3).area(), 9);
/// ```
pub mod prelude;
