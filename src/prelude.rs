pub use crate::error::ModelError;
pub use crate::neural_network::device::{Device, DeviceConfig, Dim3, LaunchConfig};
pub use crate::neural_network::feature_maps::FeatureMaps;
pub use crate::neural_network::kernel::{ConvType, Orientation, TiledConvolution, convolve};
pub use crate::neural_network::layer::{ConvolutionalLayer, SubSamplingLayer, TrainingParameters};
pub use crate::neural_network::neural_network_trait::Layer;
pub use crate::neural_network::size::Size;
