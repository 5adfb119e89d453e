use super::*;

/// Direct (one thread per output pixel) convolution kernels
pub mod direct_convolution;
/// Batched average-downsample and replicate-upsample kernels
pub mod pooling;
/// Shared-memory tiled convolution kernel with independent data/kernel rotation
pub mod tiled_convolution;

pub use direct_convolution::*;
pub use pooling::*;
pub use tiled_convolution::*;

/// Boundary handling of a 2D convolution, optionally served by the shared-memory tiled kernel.
///
/// - `Same`: output has the size of the data, kernel centered, out-of-range terms dropped
/// - `Valid`: output is `data - kernel + 1` (0 when the kernel is larger), no padding
/// - `Full`: output is `data + kernel - 1`, out-of-range reads are zero
///
/// The `*Shm` variants have the same semantics and run through [`TiledConvolution`].
///
/// Modes parse from their lowercase names, so configuration strings can select them:
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{ConvType, Size};
///
/// let mode: ConvType = "valid_shm".parse().unwrap();
/// assert_eq!(mode, ConvType::ValidShm);
/// assert_eq!(mode.output_size(Size::new(8, 8), Size::new(3, 3)), Size::new(6, 6));
/// assert!("circular".parse::<ConvType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvType {
    Same,
    Valid,
    Full,
    SameShm,
    ValidShm,
    FullShm,
}

impl ConvType {
    /// Output size of this mode for the given data and kernel sizes.
    pub fn output_size(&self, data: Size, kernel: Size) -> Size {
        match self {
            ConvType::Same | ConvType::SameShm => data,
            ConvType::Valid | ConvType::ValidShm => {
                if data.rows < kernel.rows || data.cols < kernel.cols {
                    Size::default()
                } else {
                    data - kernel + Size::new(1, 1)
                }
            }
            ConvType::Full | ConvType::FullShm => {
                if data.is_empty() || kernel.is_empty() {
                    Size::default()
                } else {
                    data + kernel - Size::new(1, 1)
                }
            }
        }
    }

    /// Whether this mode runs on the shared-memory tiled kernel.
    pub fn is_shared_memory(&self) -> bool {
        matches!(
            self,
            ConvType::SameShm | ConvType::ValidShm | ConvType::FullShm
        )
    }

    /// Lowercase name, also accepted by `FromStr`.
    pub fn name(&self) -> &'static str {
        match self {
            ConvType::Same => "same",
            ConvType::Valid => "valid",
            ConvType::Full => "full",
            ConvType::SameShm => "same_shm",
            ConvType::ValidShm => "valid_shm",
            ConvType::FullShm => "full_shm",
        }
    }

    /// Offset added to an output coordinate before subtracting the kernel index, in the
    /// flipped-kernel formulation `out[r] = sum K[i] * D[r + offset - i]`.
    pub(crate) fn direct_offset(&self, kernel: Size) -> Size {
        match self {
            ConvType::Same | ConvType::SameShm => kernel / 2,
            ConvType::Valid | ConvType::ValidShm => kernel - Size::new(1, 1),
            ConvType::Full | ConvType::FullShm => Size::default(),
        }
    }

    /// Zero padding in front of the data in the correlation formulation
    /// `out[r] = sum K'[i] * D[r - padding + i]`.
    ///
    /// With a rotated kernel this reproduces `direct_offset` exactly.
    pub(crate) fn tiled_padding(&self, kernel: Size) -> Size {
        kernel - Size::new(1, 1) - self.direct_offset(kernel)
    }
}

impl fmt::Display for ConvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConvType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "same" => Ok(ConvType::Same),
            "valid" => Ok(ConvType::Valid),
            "full" => Ok(ConvType::Full),
            "same_shm" => Ok(ConvType::SameShm),
            "valid_shm" => Ok(ConvType::ValidShm),
            "full_shm" => Ok(ConvType::FullShm),
            other => Err(ModelError::ConfigurationError(format!(
                "Unknown convolution type `{}`",
                other
            ))),
        }
    }
}

/// Convolves `data` with `kernel` (kernel flipped) under the boundary rule of `conv_type`.
///
/// Plain modes run the direct kernel; `*Shm` modes run the tiled kernel with the kernel
/// rotated on load, which yields the same values.
///
/// # Parameters
///
/// - `device` - Device to launch on
/// - `data` - Input image
/// - `kernel` - Convolution kernel, both dimensions greater than 0
/// - `conv_type` - Boundary mode
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - The convolution, sized by [`ConvType::output_size`]
/// - `Err(ModelError)` - Configuration, resource or device failure
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{convolve, ConvType, Device};
/// use ndarray::Array2;
///
/// let device = Device::default();
/// let data = Array2::<f32>::ones((4, 4));
/// let kernel = Array2::<f32>::ones((2, 2));
///
/// let valid = convolve(&device, &data, &kernel, ConvType::Valid).unwrap();
/// assert_eq!(valid, Array2::from_elem((3, 3), 4.0));
///
/// let full = convolve(&device, &data, &kernel, ConvType::FullShm).unwrap();
/// assert_eq!(full.dim(), (5, 5));
/// assert_eq!(full[[0, 0]], 1.0);
/// ```
pub fn convolve(
    device: &Device,
    data: &Array2<f32>,
    kernel: &Array2<f32>,
    conv_type: ConvType,
) -> Result<Array2<f32>, ModelError> {
    let data_size = Size::from(data.dim());
    let kernel_size = Size::from(kernel.dim());
    validate_kernel_size(kernel_size)?;

    let output_size = conv_type.output_size(data_size, kernel_size);
    let mut output = vec![0.0f32; output_size.area()];
    if output_size.is_empty() {
        return Ok(Array2::zeros((output_size.rows, output_size.cols)));
    }

    let data: Vec<f32> = data.iter().copied().collect();
    let kernel: Vec<f32> = kernel.iter().copied().collect();

    if conv_type.is_shared_memory() {
        TiledConvolution {
            data: &data,
            data_size,
            data_step: 0,
            kernel: &kernel,
            kernel_size,
            kernel_step: 0,
            output_step: 0,
            instances: 1,
            conv_type,
            orientation: Orientation::ROTATED_KERNEL,
        }
        .run(device, &mut output)?;
    } else {
        direct_convolution(
            device,
            &data,
            data_size,
            &kernel,
            kernel_size,
            conv_type,
            &mut output,
        )?;
    }
    device.synchronize()?;

    let cols = output_size.cols;
    Ok(Array2::from_shape_fn((output_size.rows, cols), |(r, c)| {
        output[r * cols + c]
    }))
}

/// Validates that a kernel has no zero dimension.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if any dimension is 0.
pub(crate) fn validate_kernel_size(kernel_size: Size) -> Result<(), ModelError> {
    if kernel_size.is_empty() {
        return Err(ModelError::ConfigurationError(format!(
            "Kernel dimensions must be greater than 0, got {}",
            kernel_size
        )));
    }
    Ok(())
}
