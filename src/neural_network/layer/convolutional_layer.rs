use super::*;
use rand::Rng;

/// A convolutional layer with one kernel per (input map, output map) pair and one bias per
/// output map.
///
/// Forward inference computes, for every output map `j`,
///
/// `output_j = bias_j + sum_i valid_corr(input_i, kernel_ij)`
///
/// so the output image is `input - kernel + 1` in each dimension. Every term is one batched
/// shared-memory tiled correlation over all samples of the batch.
///
/// # Fields
///
/// - `device` - Device the kernels are launched on
/// - `input_maps` - Number of input feature maps
/// - `output_maps` - Number of output feature maps
/// - `kernel_size` - Size shared by all kernels
/// - `input_image_size` - Size of every input feature map
/// - `kernels` - Kernels stored contiguously, kernel `[i][j]` at `(i * output_maps + j) * kernel_area`, each row-major
/// - `biases` - One bias per output map
///
/// # Example
/// ```rust
/// use rustycnn::prelude::*;
/// use ndarray::Array2;
/// use std::sync::Arc;
///
/// let device = Arc::new(Device::default());
/// let mut layer = ConvolutionalLayer::new(device, 1, 1, Size::new(2, 2), Size::new(4, 4)).unwrap();
/// layer.set_weights(&[vec![Array2::ones((2, 2))]], &[0.0]).unwrap();
///
/// // One sample, one 4x4 map of ones
/// let input = FeatureMaps::from_shape_fn(1, Size::new(4, 4), 1, |_, _, _, _| 1.0);
/// let mut output = FeatureMaps::zeros(0, Size::default(), 0);
/// layer.feed_forward(&mut output, &input).unwrap();
///
/// assert_eq!(output.image_size(), Size::new(3, 3));
/// assert_eq!(output.image(0, 0), Array2::from_elem((3, 3), 4.0));
/// ```
pub struct ConvolutionalLayer {
    device: Arc<Device>,
    input_maps: usize,
    output_maps: usize,
    kernel_size: Size,
    input_image_size: Size,
    kernels: Vec<f32>,
    biases: Vec<f32>,
}

impl ConvolutionalLayer {
    /// Creates a new convolutional layer with randomly initialized kernels.
    ///
    /// # Parameters
    ///
    /// - `device` - Device shared with the rest of the network
    /// - `input_maps` - Number of input feature maps
    /// - `output_maps` - Number of output feature maps
    /// - `kernel_size` - Size of every kernel
    /// - `input_image_size` - Size of every input feature map
    ///
    /// # Returns
    ///
    /// - `Ok(ConvolutionalLayer)` - A new layer
    /// - `Err(ModelError::ConfigurationError)` - If a map count is 0 or the kernel does not fit the input image
    ///
    /// # Notes
    ///
    /// Kernels are initialized using Xavier (Glorot) uniform initialization.
    /// Biases are initialized to zeros.
    pub fn new(
        device: Arc<Device>,
        input_maps: usize,
        output_maps: usize,
        kernel_size: Size,
        input_image_size: Size,
    ) -> Result<Self, ModelError> {
        Self::with_rng(
            device,
            input_maps,
            output_maps,
            kernel_size,
            input_image_size,
            &mut rand::rng(),
        )
    }

    /// Same as [`ConvolutionalLayer::new`], drawing the initial kernels from `rng`.
    pub fn with_rng<R: Rng>(
        device: Arc<Device>,
        input_maps: usize,
        output_maps: usize,
        kernel_size: Size,
        input_image_size: Size,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        validate_map_count("input", input_maps)?;
        validate_map_count("output", output_maps)?;
        validate_kernel_fits(kernel_size, input_image_size)?;

        // Formula: sqrt(6 / (input_maps * kernel_area + output_maps * kernel_area))
        let fan_in = input_maps * kernel_size.area();
        let fan_out = output_maps * kernel_size.area();
        let weight_bound = (6.0 / (fan_in + fan_out) as f32).sqrt();

        let kernels = (0..input_maps * output_maps * kernel_size.area())
            .map(|_| rng.random_range(-weight_bound..weight_bound))
            .collect();

        Ok(ConvolutionalLayer {
            device,
            input_maps,
            output_maps,
            kernel_size,
            input_image_size,
            kernels,
            biases: vec![0.0; output_maps],
        })
    }

    /// Sets the kernels and biases of this layer.
    ///
    /// # Parameters
    ///
    /// - `kernels` - Kernels indexed `[input_map][output_map]`, each of `kernel_size`
    /// - `biases` - One bias per output map
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Parameters replaced
    /// - `Err(ModelError::InputValidationError)` - If a count or a kernel size does not match the layer
    pub fn set_weights(&mut self, kernels: &[Vec<Array2<f32>>], biases: &[f32]) -> Result<(), ModelError> {
        if kernels.len() != self.input_maps
            || kernels.iter().any(|row| row.len() != self.output_maps)
        {
            return Err(ModelError::InputValidationError(format!(
                "expected {}x{} kernels indexed [input map][output map]",
                self.input_maps, self.output_maps
            )));
        }
        if let Some(kernel) = kernels
            .iter()
            .flatten()
            .find(|k| Size::from(k.dim()) != self.kernel_size)
        {
            return Err(ModelError::InputValidationError(format!(
                "kernel of size {} does not match layer kernel size {}",
                Size::from(kernel.dim()),
                self.kernel_size
            )));
        }
        if biases.len() != self.output_maps {
            return Err(ModelError::InputValidationError(format!(
                "{} biases given for {} output maps",
                biases.len(),
                self.output_maps
            )));
        }

        self.kernels = kernels
            .iter()
            .flatten()
            .flat_map(|k| k.iter().copied())
            .collect();
        self.biases = biases.to_vec();

        Ok(())
    }

    /// Changes the input image size; the output size follows from it.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::ConfigurationError` if the kernel does not fit the new size.
    pub fn set_input_image_size(&mut self, input_image_size: Size) -> Result<(), ModelError> {
        validate_kernel_fits(self.kernel_size, input_image_size)?;
        self.input_image_size = input_image_size;
        Ok(())
    }

    /// Size shared by all kernels.
    pub fn kernel_size(&self) -> Size {
        self.kernel_size
    }

    /// Copy of kernel `[input_map][output_map]`.
    pub fn kernel(&self, input_map: usize, output_map: usize) -> Array2<f32> {
        let kernel = self.kernel_slice(input_map, output_map);
        let cols = self.kernel_size.cols;
        Array2::from_shape_fn((self.kernel_size.rows, cols), |(r, c)| kernel[r * cols + c])
    }

    /// Copies of all kernels, indexed `[input_map][output_map]`.
    pub fn kernels(&self) -> Vec<Vec<Array2<f32>>> {
        (0..self.input_maps)
            .map(|i| (0..self.output_maps).map(|j| self.kernel(i, j)).collect())
            .collect()
    }

    /// One bias per output map.
    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Accumulates the gradient of the loss with respect to every kernel.
    ///
    /// Gradient `[i][j]` is the valid correlation of input map `i` with error map `j`,
    /// summed over all samples. Each pair takes one launch per error-map chunk; error maps
    /// too large for shared memory are split into several chunks.
    ///
    /// # Parameters
    ///
    /// - `input` - The input this layer was fed forward with
    /// - `error` - Error with respect to this layer's output
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Vec<Array2<f32>>>)` - Kernel-shaped gradients indexed `[input_map][output_map]`
    /// - `Err(ModelError)` - If a shape does not match the layer or a launch failed
    pub fn kernel_gradient(
        &self,
        input: &FeatureMaps,
        error: &FeatureMaps,
    ) -> Result<Vec<Vec<Array2<f32>>>, ModelError> {
        let gradient = self.accumulate_kernel_gradient(input, error)?;
        let kernel_area = self.kernel_size.area();
        let cols = self.kernel_size.cols;

        Ok((0..self.input_maps)
            .map(|i| {
                (0..self.output_maps)
                    .map(|j| {
                        let start = (i * self.output_maps + j) * kernel_area;
                        let grad = &gradient[start..start + kernel_area];
                        Array2::from_shape_fn((self.kernel_size.rows, cols), |(r, c)| {
                            grad[r * cols + c]
                        })
                    })
                    .collect()
            })
            .collect())
    }

    /// Gradient of the loss with respect to every bias: the sum of all pixels of the matching
    /// error map over all samples.
    pub fn bias_gradient(&self, error: &FeatureMaps) -> Result<Vec<f32>, ModelError> {
        validate_feature_maps("error", error, self.output_maps, self.output_image_size())?;
        Ok((0..self.output_maps).map(|j| error.map_sum(j)).collect())
    }

    /// Takes one gradient-descent step on the kernels:
    /// `kernel[i][j] -= learning_rate * kernel_gradient[i][j]`.
    ///
    /// # Parameters
    ///
    /// - `input` - The input this layer was fed forward with
    /// - `error` - Error with respect to this layer's output
    /// - `learning_rate` - Step size; 1.0 subtracts the raw gradient
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Kernels updated
    /// - `Err(ModelError)` - If the learning rate is invalid, a shape does not match or a launch failed
    pub fn update_kernel(
        &mut self,
        input: &FeatureMaps,
        error: &FeatureMaps,
        learning_rate: f32,
    ) -> Result<(), ModelError> {
        validate_learning_rate(learning_rate)?;
        let gradient = self.accumulate_kernel_gradient(input, error)?;

        self.kernels
            .par_iter_mut()
            .zip(gradient.par_iter())
            .for_each(|(k, g)| {
                *k -= *g * learning_rate;
            });

        Ok(())
    }

    /// Takes one gradient-descent step on the biases:
    /// `bias[j] -= learning_rate * sum(error_j)`.
    ///
    /// # Parameters
    ///
    /// - `error` - Error with respect to this layer's output
    /// - `learning_rate` - Step size; 1.0 subtracts the raw gradient
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Biases updated
    /// - `Err(ModelError)` - If the learning rate is invalid or the error shape does not match
    pub fn update_bias(&mut self, error: &FeatureMaps, learning_rate: f32) -> Result<(), ModelError> {
        validate_learning_rate(learning_rate)?;
        let gradient = self.bias_gradient(error)?;

        for (b, g) in self.biases.iter_mut().zip(gradient) {
            *b -= g * learning_rate;
        }

        Ok(())
    }

    fn kernel_slice(&self, input_map: usize, output_map: usize) -> &[f32] {
        let kernel_area = self.kernel_size.area();
        let start = (input_map * self.output_maps + output_map) * kernel_area;
        &self.kernels[start..start + kernel_area]
    }

    /// Flat gradient buffer laid out like `kernels`.
    ///
    /// The error map plays the kernel of the correlation, so it is split into chunks that fit
    /// shared memory. Chunk `E[r0.., c0..]` is correlated with the input window starting at
    /// `(r0, c0)` and every chunk accumulates into the same kernel-shaped gradient.
    fn accumulate_kernel_gradient(
        &self,
        input: &FeatureMaps,
        error: &FeatureMaps,
    ) -> Result<Vec<f32>, ModelError> {
        validate_feature_maps("input", input, self.input_maps, self.input_image_size)?;
        validate_feature_maps("error", error, self.output_maps, self.output_image_size())?;
        validate_same_batch(input, error)?;

        let output_size = self.output_image_size();
        let kernel_area = self.kernel_size.area();
        let batch_size = input.batch_size();
        let mut gradient = vec![0.0f32; self.kernels.len()];
        if batch_size == 0 {
            return Ok(gradient);
        }

        let chunk = self.gradient_chunk(batch_size)?;
        let halo = self.kernel_size - Size::new(1, 1);

        for r0 in (0..output_size.rows).step_by(chunk.rows) {
            for c0 in (0..output_size.cols).step_by(chunk.cols) {
                let piece = chunk.min(output_size - Size::new(r0, c0));
                let window = piece + halo;

                let windows: Vec<Vec<f32>> = (0..self.input_maps)
                    .map(|i| input.window(i, (r0, c0), window))
                    .collect();
                let pieces: Vec<Vec<f32>> = (0..self.output_maps)
                    .map(|j| error.window(j, (r0, c0), piece))
                    .collect();

                for (i, data) in windows.iter().enumerate() {
                    for (j, kernel) in pieces.iter().enumerate() {
                        let start = (i * self.output_maps + j) * kernel_area;
                        TiledConvolution {
                            data: data.as_slice(),
                            data_size: window,
                            data_step: window.area(),
                            kernel: kernel.as_slice(),
                            kernel_size: piece,
                            kernel_step: piece.area(),
                            output_step: 0,
                            instances: batch_size,
                            conv_type: ConvType::ValidShm,
                            orientation: Orientation::CORRELATION,
                        }
                        .run(&self.device, &mut gradient[start..start + kernel_area])?;
                    }
                }
            }
        }
        self.device.synchronize()?;

        Ok(gradient)
    }

    /// Largest error chunk whose tiled correlation fits shared memory, found by halving the
    /// larger axis of the error map.
    fn gradient_chunk(&self, batch_size: usize) -> Result<Size, ModelError> {
        let mut chunk = self.output_image_size();
        loop {
            match self.device.plan_tiles(self.kernel_size, batch_size, chunk) {
                Ok(_) => break,
                Err(ModelError::ResourceError(_)) if chunk.area() > 1 => {
                    if chunk.rows >= chunk.cols {
                        chunk.rows = chunk.rows.div_ceil(2);
                    } else {
                        chunk.cols = chunk.cols.div_ceil(2);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        if chunk != self.output_image_size() {
            debug!(
                error_map = %self.output_image_size(),
                chunk = %chunk,
                "split error map for the kernel gradient"
            );
        }
        Ok(chunk)
    }
}

impl Layer for ConvolutionalLayer {
    fn feed_forward(&self, output: &mut FeatureMaps, input: &FeatureMaps) -> Result<(), ModelError> {
        validate_feature_maps("input", input, self.input_maps, self.input_image_size)?;

        let output_size = self.output_image_size();
        output.resize(self.output_maps, output_size, input.batch_size());
        output.broadcast_per_map(&self.biases);
        if input.batch_size() == 0 {
            return Ok(());
        }

        let input_area = self.input_image_size.area();
        let output_area = output_size.area();
        let output_rows = output.rows();

        for i in 0..self.input_maps {
            let data = &input.as_slice()[i * input_area..];
            for j in 0..self.output_maps {
                TiledConvolution {
                    data,
                    data_size: self.input_image_size,
                    data_step: input.rows(),
                    kernel: self.kernel_slice(i, j),
                    kernel_size: self.kernel_size,
                    kernel_step: 0,
                    output_step: output_rows,
                    instances: input.batch_size(),
                    conv_type: ConvType::ValidShm,
                    orientation: Orientation::CORRELATION,
                }
                .run(&self.device, &mut output.as_mut_slice()[j * output_area..])?;
            }
        }

        self.device.synchronize()
    }

    fn feed_backward(
        &self,
        upstream_error: &mut FeatureMaps,
        error: &FeatureMaps,
    ) -> Result<(), ModelError> {
        let output_size = self.output_image_size();
        validate_feature_maps("error", error, self.output_maps, output_size)?;

        upstream_error.resize(self.input_maps, self.input_image_size, error.batch_size());
        if error.batch_size() == 0 {
            return Ok(());
        }

        let input_area = self.input_image_size.area();
        let output_area = output_size.area();
        let upstream_rows = upstream_error.rows();

        for i in 0..self.input_maps {
            for j in 0..self.output_maps {
                TiledConvolution {
                    data: &error.as_slice()[j * output_area..],
                    data_size: output_size,
                    data_step: error.rows(),
                    kernel: self.kernel_slice(i, j),
                    kernel_size: self.kernel_size,
                    kernel_step: 0,
                    output_step: upstream_rows,
                    instances: error.batch_size(),
                    conv_type: ConvType::FullShm,
                    orientation: Orientation::ROTATED_KERNEL,
                }
                .run(
                    &self.device,
                    &mut upstream_error.as_mut_slice()[i * input_area..],
                )?;
            }
        }

        self.device.synchronize()
    }

    fn layer_type(&self) -> &str {
        "ConvolutionalLayer"
    }

    fn input_maps(&self) -> usize {
        self.input_maps
    }

    fn output_maps(&self) -> usize {
        self.output_maps
    }

    fn input_image_size(&self) -> Size {
        self.input_image_size
    }

    fn output_image_size(&self) -> Size {
        ConvType::Valid.output_size(self.input_image_size, self.kernel_size)
    }

    fn param_count(&self) -> TrainingParameters {
        TrainingParameters::Trainable(self.kernels.len() + self.biases.len())
    }
}
