use super::*;

/// Shared memory needed by one block of a tiled convolution: the kernel plus a
/// halo-padded data tile of `(block.y + kh - 1) x (block.x + kw - 1)` values.
///
/// # Parameters
///
/// - `block` - Thread-block shape, `x` along columns and `y` along rows
/// - `kernel` - Kernel size (rows, cols), both dimensions greater than 0
///
/// # Returns
///
/// * `usize` - Footprint in bytes
pub fn shared_footprint_bytes(block: Dim3, kernel: Size) -> usize {
    let tile_cols = block.x + kernel.cols - 1;
    let tile_rows = block.y + kernel.rows - 1;
    (kernel.area() + tile_cols * tile_rows) * FLOAT_BYTES
}

/// Computes the launch configuration of a shared-memory tiled convolution.
///
/// Starting from the requested block, the larger block axis (rows on ties) is halved and
/// the matching grid axis doubled until the tile footprint fits
/// `config.shared_memory_per_block`. Halving rounds up, so the doubled grid always covers
/// at least the area the requested grid covered.
///
/// # Parameters
///
/// - `config` - Device limits
/// - `grid` - Requested grid, in blocks
/// - `block` - Requested block, in threads
/// - `kernel` - Kernel size
///
/// # Returns
///
/// - `Ok(LaunchConfig)` - Grid, block and exact shared byte count of the tile
/// - `Err(ModelError::ConfigurationError)` - If the kernel is empty
/// - `Err(ModelError::ResourceError)` - If the footprint does not fit even at `min_threads_per_block` threads
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{plan_tiles, shared_footprint_bytes, DeviceConfig, Dim3, Size};
///
/// let config = DeviceConfig::default().with_shared_memory_per_block(4096);
/// let plan = plan_tiles(&config, Dim3::new(2, 2, 1), Dim3::xy(16, 16), Size::new(9, 9)).unwrap();
///
/// assert!(plan.shared_memory_bytes <= 4096);
/// assert_eq!(plan.shared_memory_bytes, shared_footprint_bytes(plan.block, Size::new(9, 9)));
/// ```
pub fn plan_tiles(
    config: &DeviceConfig,
    grid: Dim3,
    block: Dim3,
    kernel: Size,
) -> Result<LaunchConfig, ModelError> {
    if kernel.is_empty() {
        return Err(ModelError::ConfigurationError(format!(
            "Kernel dimensions must be greater than 0, got {}",
            kernel
        )));
    }

    let requested = block;
    let mut block = Dim3::xy(block.x, block.y);
    let mut grid = grid;
    let mut bytes = shared_footprint_bytes(block, kernel);

    while bytes > config.shared_memory_per_block {
        if block.x * block.y <= config.min_threads_per_block {
            return Err(ModelError::ResourceError(format!(
                "shared memory footprint of {} bytes exceeds the {}-byte budget for kernel {} (block {}, grid {})",
                bytes, config.shared_memory_per_block, kernel, block, grid
            )));
        }

        if block.y >= block.x {
            block.y = block.y.div_ceil(2);
            grid.y *= 2;
        } else {
            block.x = block.x.div_ceil(2);
            grid.x *= 2;
        }
        bytes = shared_footprint_bytes(block, kernel);
    }

    if block.x != requested.x || block.y != requested.y {
        debug!(
            kernel = %kernel,
            requested = %requested,
            block = %block,
            grid = %grid,
            shared_memory_bytes = bytes,
            "shrunk thread block to fit shared memory"
        );
    }

    Ok(LaunchConfig {
        grid,
        block,
        shared_memory_bytes: bytes,
    })
}
