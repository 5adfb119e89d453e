/// Module that contains the emulated device, launch configuration and tiling scheduler
pub mod device;
/// Module that contains the batched feature-map matrix exchanged between layers
pub mod feature_maps;
/// Module that contains the convolution and pooling kernels
pub mod kernel;
/// Module that contains the convolutional and sub-sampling layer implementations
pub mod layer;
/// Module that contains the common layer interface
pub mod neural_network_trait;
/// Module that contains the 2D size algebra
pub mod size;

pub use device::*;
pub use feature_maps::*;
pub use kernel::*;
pub use layer::*;
pub use size::*;

pub use crate::neural_network::neural_network_trait::Layer;

use crate::error::ModelError;
use ahash::AHashMap;
use ndarray::Array2;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};
