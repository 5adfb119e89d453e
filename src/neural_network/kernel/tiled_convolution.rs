use super::*;

/// Which operands of a tiled convolution are rotated by 180 degrees while they are loaded
/// into shared memory.
///
/// One tiled routine covers forward correlation (no rotation), true convolution (rotated
/// kernel) and the backpropagation formulas that need a flipped operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Orientation {
    pub rotate_data: bool,
    pub rotate_kernel: bool,
}

impl Orientation {
    /// Plain cross-correlation.
    pub const CORRELATION: Orientation = Orientation {
        rotate_data: false,
        rotate_kernel: false,
    };

    /// Kernel flipped: true convolution.
    pub const ROTATED_KERNEL: Orientation = Orientation {
        rotate_data: false,
        rotate_kernel: true,
    };

    /// Data flipped, kernel as stored.
    pub const ROTATED_DATA: Orientation = Orientation {
        rotate_data: true,
        rotate_kernel: false,
    };
}

/// A batched, shared-memory tiled 2D correlation.
///
/// For every instance `z` in `0..instances` it accumulates
///
/// `out[z][r][c] += sum K'[i][j] * D'[r - p_r + i][c - p_c + j]`
///
/// into the output, where `K'` and `D'` are the kernel and data of instance `z`, rotated
/// according to `orientation`, reads outside the data are zero, and the padding `p` is 0
/// for `Valid`, `kernel - 1` for `Full` and `(kernel - 1) - kernel / 2` for `Same`.
///
/// Instance `z` reads its data at `z * data_step`, its kernel at `z * kernel_step` and writes
/// at `z * output_step`. A step of 0 shares that operand between all instances; with
/// `output_step == 0` all instances sum into the same output image. Because the output is
/// accumulated, callers zero or pre-seed it before the first launch.
///
/// Each block first loads the kernel and a halo tile of `(block.y + kh - 1) x (block.x + kw - 1)`
/// data values into shared memory with a strided cooperative loop, then every thread
/// computes its pixel from shared memory only. The block shape comes from
/// [`Device::plan_tiles`], which shrinks it until the tile fits.
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{ConvType, Device, Orientation, Size, TiledConvolution};
///
/// let device = Device::default();
/// let data = vec![1.0f32; 16];
/// let kernel = vec![1.0f32; 4];
/// let mut output = vec![0.0f32; 9];
///
/// TiledConvolution {
///     data: &data,
///     data_size: Size::new(4, 4),
///     data_step: 0,
///     kernel: &kernel,
///     kernel_size: Size::new(2, 2),
///     kernel_step: 0,
///     output_step: 0,
///     instances: 1,
///     conv_type: ConvType::Valid,
///     orientation: Orientation::CORRELATION,
/// }
/// .run(&device, &mut output)
/// .unwrap();
///
/// assert!(output.iter().all(|&v| v == 4.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TiledConvolution<'a> {
    pub data: &'a [f32],
    pub data_size: Size,
    pub data_step: usize,
    pub kernel: &'a [f32],
    pub kernel_size: Size,
    pub kernel_step: usize,
    pub output_step: usize,
    pub instances: usize,
    pub conv_type: ConvType,
    pub orientation: Orientation,
}

impl TiledConvolution<'_> {
    /// Size of one output image.
    pub fn output_size(&self) -> Size {
        self.conv_type.output_size(self.data_size, self.kernel_size)
    }

    /// Launches the convolution and accumulates into `output`.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - All instances accumulated
    /// - `Err(ModelError::ConfigurationError)` - If the kernel is empty
    /// - `Err(ModelError::InputValidationError)` - If an operand is too short for `instances` steps
    /// - `Err(ModelError::ResourceError)` - If no block shape fits the shared-memory budget
    /// - `Err(ModelError::DeviceError)` - If the launch fails
    pub fn run(&self, device: &Device, output: &mut [f32]) -> Result<(), ModelError> {
        validate_kernel_size(self.kernel_size)?;

        let output_size = self.output_size();
        if self.instances == 0 || output_size.is_empty() {
            return Ok(());
        }

        validate_operand("data", self.data.len(), self.data_step, self.data_size.area(), self.instances)?;
        validate_operand("kernel", self.kernel.len(), self.kernel_step, self.kernel_size.area(), self.instances)?;
        validate_operand("output", output.len(), self.output_step, output_size.area(), self.instances)?;

        let plan = device.plan_tiles(output_size, self.instances, self.kernel_size)?;
        let block = plan.block;
        let kernel_size = self.kernel_size;
        let data_size = self.data_size;
        let kernel_area = kernel_size.area();
        let tile = Size::new(
            block.y + kernel_size.rows - 1,
            block.x + kernel_size.cols - 1,
        );
        let padding = self.conv_type.tiled_padding(kernel_size);
        let Orientation {
            rotate_data,
            rotate_kernel,
        } = self.orientation;
        let name = format!("tiled_convolution_{}", self.conv_type);

        device.launch(&name, &plan, output, WriteMode::Accumulate, |ctx, shared| {
            let z = ctx.block_idx.z;
            let data_base = z * self.data_step;
            let data = &self.data[data_base..data_base + data_size.area()];
            let kernel_base = z * self.kernel_step;
            let kernel = &self.kernel[kernel_base..kernel_base + kernel_area];
            let (kernel_shared, tile_shared) = shared.split_at_mut(kernel_area);

            let thread_count = ctx.thread_count();
            let tile_origin_row = ctx.block_idx.y * block.y;
            let tile_origin_col = ctx.block_idx.x * block.x;

            // cooperative load
            for thread in ctx.threads() {
                let tid = ctx.linear_id(thread);

                for idx in (tid..kernel_area).step_by(thread_count) {
                    let src = if rotate_kernel {
                        kernel_area - 1 - idx
                    } else {
                        idx
                    };
                    kernel_shared[idx] = kernel[src];
                }

                for idx in (tid..tile.area()).step_by(thread_count) {
                    let row = (tile_origin_row + idx / tile.cols).checked_sub(padding.rows);
                    let col = (tile_origin_col + idx % tile.cols).checked_sub(padding.cols);

                    tile_shared[idx] = match (row, col) {
                        (Some(r), Some(c)) if r < data_size.rows && c < data_size.cols => {
                            if rotate_data {
                                data[(data_size.rows - 1 - r) * data_size.cols
                                    + (data_size.cols - 1 - c)]
                            } else {
                                data[r * data_size.cols + c]
                            }
                        }
                        _ => 0.0,
                    };
                }
            }

            // barrier: the whole tile is resident from here on
            let mut writes = Vec::with_capacity(thread_count);
            for thread in ctx.threads() {
                let (r, c) = ctx.global_pixel(thread);
                if r >= output_size.rows || c >= output_size.cols {
                    continue;
                }

                let mut sum = 0.0;
                for i in 0..kernel_size.rows {
                    let tile_row = (thread.y + i) * tile.cols + thread.x;
                    let kernel_row = i * kernel_size.cols;
                    for j in 0..kernel_size.cols {
                        sum += kernel_shared[kernel_row + j] * tile_shared[tile_row + j];
                    }
                }

                writes.push((z * self.output_step + r * output_size.cols + c, sum));
            }

            writes
        })
    }
}

/// Validates that an operand addressed with `step` holds `instances` images of `area` values.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if the last instance would read past the buffer.
fn validate_operand(
    what: &str,
    len: usize,
    step: usize,
    area: usize,
    instances: usize,
) -> Result<(), ModelError> {
    let required = (instances - 1) * step + area;
    if len < required {
        return Err(ModelError::InputValidationError(format!(
            "{} buffer holds {} values, {} instances with step {} need {}",
            what, len, instances, step, required
        )));
    }
    Ok(())
}
