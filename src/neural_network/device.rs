use super::*;

/// Adaptive shared-memory tiling scheduler
pub mod scheduler;

pub use scheduler::*;

/// Size in bytes of one element of device memory.
pub const FLOAT_BYTES: usize = std::mem::size_of::<f32>();

/// Three-dimensional launch extent, used both for grids (in blocks) and for blocks (in threads).
///
/// `x` runs along image columns, `y` along image rows and `z` indexes independent
/// problem instances (feature maps, batch elements) of a batched launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dim3 {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dim3 {
    /// Creates a new extent.
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Dim3 { x, y, z }
    }

    /// Creates a planar extent with `z = 1`.
    pub const fn xy(x: usize, y: usize) -> Self {
        Dim3 { x, y, z: 1 }
    }

    /// Total number of elements (blocks or threads) covered.
    pub fn volume(&self) -> usize {
        self.x * self.y * self.z
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Grid and block dimensions of one kernel launch, plus its per-block shared-memory request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub grid: Dim3,
    pub block: Dim3,
    pub shared_memory_bytes: usize,
}

impl LaunchConfig {
    /// One thread per pixel of `output`, repeated for `z` independent instances, without
    /// shared memory.
    pub fn covering(output: Size, block: Dim3, z: usize) -> Self {
        LaunchConfig {
            grid: Dim3::new(
                output.cols.div_ceil(block.x),
                output.rows.div_ceil(block.y),
                z,
            ),
            block: Dim3::xy(block.x, block.y),
            shared_memory_bytes: 0,
        }
    }

    /// Total number of threads launched.
    pub fn total_threads(&self) -> usize {
        self.grid.volume() * self.block.volume()
    }
}

/// How the global writes produced by a launch are applied to the output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `output[i] = value`
    Store,
    /// `output[i] += value`
    Accumulate,
}

/// Hardware limits and launch defaults of the device.
///
/// # Fields
///
/// - `shared_memory_per_block` - Bytes of on-chip memory one block may request
/// - `max_threads_per_block` - Upper bound on threads in a single block
/// - `min_threads_per_block` - Smallest block the tiling scheduler may shrink to
/// - `block_dim` - Block shape requested by convolution and pooling launches, both sides powers of two
/// - `parallel_threshold` - Launches with fewer threads than this run their blocks sequentially
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    pub shared_memory_per_block: usize,
    pub max_threads_per_block: usize,
    pub min_threads_per_block: usize,
    pub block_dim: Dim3,
    pub parallel_threshold: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            shared_memory_per_block: 48 * 1024,
            max_threads_per_block: 1024,
            min_threads_per_block: 32,
            block_dim: Dim3::xy(16, 16),
            parallel_threshold: 4096,
        }
    }
}

impl DeviceConfig {
    /// Returns a copy of this configuration with a different shared-memory budget.
    pub fn with_shared_memory_per_block(mut self, bytes: usize) -> Self {
        self.shared_memory_per_block = bytes;
        self
    }

    /// Returns a copy of this configuration with a different default block shape.
    pub fn with_block_dim(mut self, x: usize, y: usize) -> Self {
        self.block_dim = Dim3::xy(x, y);
        self
    }
}

/// Position of a block inside its grid, handed to every block function.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext {
    pub block_idx: Dim3,
    pub block_dim: Dim3,
    pub grid_dim: Dim3,
}

impl BlockContext {
    /// Number of threads in this block.
    pub fn thread_count(&self) -> usize {
        self.block_dim.x * self.block_dim.y
    }

    /// Thread indices of this block in linear order (`x` fastest).
    pub fn threads(&self) -> impl Iterator<Item = Dim3> + '_ {
        (0..self.block_dim.y)
            .flat_map(move |y| (0..self.block_dim.x).map(move |x| Dim3::new(x, y, 0)))
    }

    /// Linear id of a thread, as used by strided cooperative loops.
    pub fn linear_id(&self, thread: Dim3) -> usize {
        thread.y * self.block_dim.x + thread.x
    }

    /// Global (row, col) of the pixel owned by `thread`.
    pub fn global_pixel(&self, thread: Dim3) -> (usize, usize) {
        (
            self.block_idx.y * self.block_dim.y + thread.y,
            self.block_idx.x * self.block_dim.x + thread.x,
        )
    }
}

/// Emulated accelerator that executes grid launches on the host.
///
/// Every launch is checked against the configured limits, then each block runs with its
/// own zero-filled shared-memory scratch buffer. Block functions execute their threads
/// phase by phase, so the point between two thread loops acts as the block barrier. Blocks
/// are independent of each other and are dispatched through rayon when the launch is
/// large enough. The writes a block returns are applied in block order, which keeps
/// accumulating launches deterministic.
///
/// Launches are issued from one control thread and complete in issue order, matching a
/// single default stream.
///
/// # Example
/// ```rust
/// use rustycnn::neural_network::{Device, DeviceConfig};
///
/// let device = Device::new(DeviceConfig::default()).unwrap();
/// assert_eq!(device.config().shared_memory_per_block, 48 * 1024);
/// ```
pub struct Device {
    config: DeviceConfig,
    plan_cache: Mutex<AHashMap<(Dim3, Size), LaunchConfig>>,
    pending_launches: AtomicUsize,
    total_launches: AtomicUsize,
}

impl Device {
    /// Creates a device after validating its configuration.
    ///
    /// # Returns
    ///
    /// - `Ok(Device)` - A ready device
    /// - `Err(ModelError::ConfigurationError)` - If any limit is zero, the default block is not made of powers of two, or it does not fit `max_threads_per_block`
    pub fn new(config: DeviceConfig) -> Result<Self, ModelError> {
        validate_device_config(&config)?;

        Ok(Device {
            config,
            plan_cache: Mutex::new(AHashMap::new()),
            pending_launches: AtomicUsize::new(0),
            total_launches: AtomicUsize::new(0),
        })
    }

    /// Returns the configuration this device was created with.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Number of launches issued over the lifetime of the device.
    pub fn launch_count(&self) -> usize {
        self.total_launches.load(Ordering::Relaxed)
    }

    /// Plans a shared-memory tiled launch covering `output` for `z` instances with a kernel of
    /// size `kernel`, shrinking the default block until the tile fits.
    ///
    /// Plans are memoized per requested grid and kernel size.
    pub fn plan_tiles(&self, output: Size, z: usize, kernel: Size) -> Result<LaunchConfig, ModelError> {
        let block = self.config.block_dim;
        let grid = Dim3::new(
            output.cols.div_ceil(block.x),
            output.rows.div_ceil(block.y),
            z,
        );

        let mut cache = self
            .plan_cache
            .lock()
            .map_err(|_| ModelError::DeviceError("tiling plan cache is poisoned".to_string()))?;

        if let Some(plan) = cache.get(&(grid, kernel)) {
            return Ok(*plan);
        }

        let plan = plan_tiles(&self.config, grid, block, kernel)?;
        cache.insert((grid, kernel), plan);

        Ok(plan)
    }

    /// Executes `block_fn` once per block of `config.grid` and applies the returned writes to
    /// `output` according to `mode`.
    ///
    /// # Parameters
    ///
    /// - `name` - Kernel name, used in logs and error messages
    /// - `config` - Grid, block and shared-memory request
    /// - `output` - Global output buffer
    /// - `mode` - Whether writes overwrite or accumulate
    /// - `block_fn` - Body of one block; receives the block position and its shared memory, returns `(global index, value)` writes
    ///
    /// # Returns
    ///
    /// - `Ok(())` - All blocks ran and every write landed inside `output`
    /// - `Err(ModelError::DeviceError)` - The launch configuration is invalid or a block wrote out of bounds
    pub fn launch<F>(
        &self,
        name: &str,
        config: &LaunchConfig,
        output: &mut [f32],
        mode: WriteMode,
        block_fn: F,
    ) -> Result<(), ModelError>
    where
        F: Fn(&BlockContext, &mut [f32]) -> Vec<(usize, f32)> + Sync,
    {
        self.validate_launch(name, config)?;

        debug!(
            kernel = name,
            grid = %config.grid,
            block = %config.block,
            shared_memory_bytes = config.shared_memory_bytes,
            "launching kernel"
        );

        let shared_len = config.shared_memory_bytes / FLOAT_BYTES;
        let grid = config.grid;
        let blocks: Vec<Dim3> = (0..grid.z)
            .flat_map(|z| {
                (0..grid.y).flat_map(move |y| (0..grid.x).map(move |x| Dim3::new(x, y, z)))
            })
            .collect();

        let run_block = |block_idx: &Dim3| {
            let ctx = BlockContext {
                block_idx: *block_idx,
                block_dim: config.block,
                grid_dim: grid,
            };
            let mut shared = vec![0.0f32; shared_len];
            block_fn(&ctx, &mut shared)
        };

        let writes: Vec<Vec<(usize, f32)>> = if config.total_threads() >= self.config.parallel_threshold
        {
            blocks.par_iter().map(|b| run_block(b)).collect()
        } else {
            blocks.iter().map(|b| run_block(b)).collect()
        };

        let buffer_len = output.len();
        for (index, value) in writes.into_iter().flatten() {
            let slot = output.get_mut(index).ok_or_else(|| {
                ModelError::DeviceError(format!(
                    "kernel `{}` wrote out of bounds at index {} (buffer length {})",
                    name, index, buffer_len
                ))
            })?;
            match mode {
                WriteMode::Store => *slot = value,
                WriteMode::Accumulate => *slot += value,
            }
        }

        self.pending_launches.fetch_add(1, Ordering::Relaxed);
        self.total_launches.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Device-wide barrier: every launch issued so far has finished and its writes are visible.
    pub fn synchronize(&self) -> Result<(), ModelError> {
        let pending = self.pending_launches.swap(0, Ordering::AcqRel);
        trace!(pending_launches = pending, "device synchronized");
        Ok(())
    }

    fn validate_launch(&self, name: &str, config: &LaunchConfig) -> Result<(), ModelError> {
        let threads = config.block.volume();
        if config.grid.volume() == 0 || threads == 0 {
            return Err(ModelError::DeviceError(format!(
                "invalid configuration for kernel `{}`: grid {} block {}",
                name, config.grid, config.block
            )));
        }
        if threads > self.config.max_threads_per_block {
            return Err(ModelError::DeviceError(format!(
                "kernel `{}` requested {} threads per block, limit is {}",
                name, threads, self.config.max_threads_per_block
            )));
        }
        if config.shared_memory_bytes > self.config.shared_memory_per_block {
            return Err(ModelError::DeviceError(format!(
                "kernel `{}` requested {} bytes of shared memory, limit is {}",
                name, config.shared_memory_bytes, self.config.shared_memory_per_block
            )));
        }
        Ok(())
    }
}

impl Default for Device {
    fn default() -> Self {
        Device {
            config: DeviceConfig::default(),
            plan_cache: Mutex::new(AHashMap::new()),
            pending_launches: AtomicUsize::new(0),
            total_launches: AtomicUsize::new(0),
        }
    }
}

fn validate_device_config(config: &DeviceConfig) -> Result<(), ModelError> {
    if config.shared_memory_per_block == 0
        || config.max_threads_per_block == 0
        || config.min_threads_per_block == 0
    {
        return Err(ModelError::ConfigurationError(
            "Device limits must be greater than 0".to_string(),
        ));
    }
    let block = config.block_dim;
    if !block.x.is_power_of_two() || !block.y.is_power_of_two() {
        return Err(ModelError::ConfigurationError(format!(
            "Block dimensions must be powers of two, got {}",
            block
        )));
    }
    if block.x * block.y > config.max_threads_per_block {
        return Err(ModelError::ConfigurationError(format!(
            "Block {} exceeds {} threads per block",
            block, config.max_threads_per_block
        )));
    }
    Ok(())
}
