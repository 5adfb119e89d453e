use super::*;
use std::sync::Arc;

/// Convolutional layer: learned kernels per (input map, output map) and a bias per output map
pub mod convolutional_layer;
/// Input validation functions for layers
mod input_validation_function;
/// Sub-sampling (average pooling) layer
pub mod sub_sampling_layer;

pub use convolutional_layer::*;
pub use sub_sampling_layer::*;

use input_validation_function::*;

/// Number of parameters a layer can train.
///
/// # Variants
///
/// - `Trainable` - The layer owns this many trainable parameters
/// - `NoTrainable` - The layer has no learned state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingParameters {
    Trainable(usize),
    NoTrainable,
}
