use crate::error::ModelError;
use crate::neural_network::feature_maps::FeatureMaps;
use crate::neural_network::layer::TrainingParameters;
use crate::neural_network::size::Size;

/// Defines the interface shared by the convolutional and sub-sampling layers.
///
/// A surrounding network driver sequences layers through this trait: every call reads a
/// batched feature-map matrix and writes the next one, resizing the destination as needed.
/// Parameter updates are layer specific and live on the concrete types.
pub trait Layer: Send + Sync {
    /// Performs forward propagation through the layer.
    ///
    /// # Parameters
    ///
    /// - `output` - Destination matrix, resized to this layer's output shape
    /// - `input` - Input matrix with this layer's input shape
    ///
    /// # Returns
    ///
    /// - `Ok(())` - `output` holds the layer output
    /// - `Err(ModelError)` - If the input shape is wrong or a launch failed
    fn feed_forward(&self, output: &mut FeatureMaps, input: &FeatureMaps) -> Result<(), ModelError>;

    /// Propagates the error of this layer's output back to its input.
    ///
    /// # Parameters
    ///
    /// - `upstream_error` - Destination matrix, resized to this layer's input shape
    /// - `error` - Error with respect to this layer's output
    ///
    /// # Returns
    ///
    /// - `Ok(())` - `upstream_error` holds the error with respect to the input
    /// - `Err(ModelError)` - If the error shape is wrong or a launch failed
    fn feed_backward(
        &self,
        upstream_error: &mut FeatureMaps,
        error: &FeatureMaps,
    ) -> Result<(), ModelError>;

    /// Returns the type name of the layer (e.g. "ConvolutionalLayer").
    fn layer_type(&self) -> &str {
        "Unknown"
    }

    /// Number of input feature maps.
    fn input_maps(&self) -> usize;

    /// Number of output feature maps.
    fn output_maps(&self) -> usize;

    /// Size of every input feature map.
    fn input_image_size(&self) -> Size;

    /// Size of every output feature map.
    fn output_image_size(&self) -> Size;

    /// Returns a description of the output shape of the layer.
    ///
    /// # Returns
    ///
    /// - `String` - `(maps, rows x cols)`
    fn output_shape(&self) -> String {
        format!("({}, {})", self.output_maps(), self.output_image_size())
    }

    /// Returns the total number of trainable parameters in the layer.
    fn param_count(&self) -> TrainingParameters;
}
