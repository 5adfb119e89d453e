use super::*;

/// Average-pooling layer with a fixed integer scale.
///
/// Each output pixel is the mean of a non-overlapping `scale x scale` block of the input,
/// so the output image is `input / scale` (integer division). The layer has no learned
/// state; going backward it spreads every error value evenly over the block it came from.
///
/// Both directions are a single launch batched over every map of every sample.
///
/// # Example
/// ```rust
/// use rustycnn::prelude::*;
/// use std::sync::Arc;
///
/// let device = Arc::new(Device::default());
/// let layer = SubSamplingLayer::new(device, 1, 1, 2, Size::new(4, 4)).unwrap();
///
/// let input = FeatureMaps::from_shape_fn(1, Size::new(4, 4), 1, |_, _, r, c| (r + c) as f32);
/// let mut output = FeatureMaps::zeros(0, Size::default(), 0);
/// layer.feed_forward(&mut output, &input).unwrap();
///
/// // (0 + 1 + 1 + 2) / 4
/// assert_eq!(output.image(0, 0)[[0, 0]], 1.0);
/// ```
pub struct SubSamplingLayer {
    device: Arc<Device>,
    maps: usize,
    scale: usize,
    input_image_size: Size,
}

impl SubSamplingLayer {
    /// Creates a new sub-sampling layer.
    ///
    /// # Parameters
    ///
    /// - `device` - Device shared with the rest of the network
    /// - `input_maps` - Number of input feature maps
    /// - `output_maps` - Number of output feature maps, equal to `input_maps`
    /// - `scale` - Pooling factor
    /// - `input_image_size` - Size of every input feature map
    ///
    /// # Returns
    ///
    /// - `Ok(SubSamplingLayer)` - A new layer
    /// - `Err(ModelError::ConfigurationError)` - If the map counts differ or are 0, or the scale is 0 or larger than the image
    pub fn new(
        device: Arc<Device>,
        input_maps: usize,
        output_maps: usize,
        scale: usize,
        input_image_size: Size,
    ) -> Result<Self, ModelError> {
        validate_map_count("input", input_maps)?;
        if input_maps != output_maps {
            return Err(ModelError::ConfigurationError(format!(
                "Sub-sampling keeps the map count, got {} input and {} output maps",
                input_maps, output_maps
            )));
        }
        validate_pooling_scale(scale, input_image_size)?;

        Ok(SubSamplingLayer {
            device,
            maps: input_maps,
            scale,
            input_image_size,
        })
    }

    /// Pooling factor.
    pub fn scale(&self) -> usize {
        self.scale
    }

    /// Changes the input image size; the output size follows from it.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigurationError` if the scale is larger than the new size.
    pub fn set_input_image_size(&mut self, input_image_size: Size) -> Result<(), ModelError> {
        validate_pooling_scale(self.scale, input_image_size)?;
        self.input_image_size = input_image_size;
        Ok(())
    }
}

impl Layer for SubSamplingLayer {
    fn feed_forward(&self, output: &mut FeatureMaps, input: &FeatureMaps) -> Result<(), ModelError> {
        validate_feature_maps("input", input, self.maps, self.input_image_size)?;

        let batch_size = input.batch_size();
        output.resize(self.maps, self.output_image_size(), batch_size);

        downsample(
            &self.device,
            input.as_slice(),
            output.as_mut_slice(),
            self.input_image_size,
            self.scale,
            self.maps * batch_size,
        )?;

        self.device.synchronize()
    }

    fn feed_backward(
        &self,
        upstream_error: &mut FeatureMaps,
        error: &FeatureMaps,
    ) -> Result<(), ModelError> {
        validate_feature_maps("error", error, self.maps, self.output_image_size())?;

        let batch_size = error.batch_size();
        upstream_error.resize(self.maps, self.input_image_size, batch_size);

        upsample(
            &self.device,
            error.as_slice(),
            upstream_error.as_mut_slice(),
            self.input_image_size,
            self.scale,
            self.maps * batch_size,
        )?;
        upstream_error.scale(1.0 / (self.scale * self.scale) as f32);

        self.device.synchronize()
    }

    fn layer_type(&self) -> &str {
        "SubSamplingLayer"
    }

    fn input_maps(&self) -> usize {
        self.maps
    }

    fn output_maps(&self) -> usize {
        self.maps
    }

    fn input_image_size(&self) -> Size {
        self.input_image_size
    }

    fn output_image_size(&self) -> Size {
        self.input_image_size / self.scale
    }

    fn param_count(&self) -> TrainingParameters {
        TrainingParameters::NoTrainable
    }
}
