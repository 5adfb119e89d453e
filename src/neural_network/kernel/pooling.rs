use super::*;

/// Average-pools `count` independent images by non-overlapping `scale x scale` blocks.
///
/// One thread per output pixel sums the block pixels that lie inside the image and divides
/// by `scale²`, so a block that overruns the image edge counts its missing pixels as zero.
/// Image `z` is read at `z * input_size.area()` and written at `z * (input_size / scale).area()`.
///
/// # Parameters
///
/// - `device` - Device to launch on
/// - `data` - `count` row-major images of `input_size`
/// - `output` - `count` row-major images of `input_size / scale`, overwritten
/// - `input_size` - Size of one input image
/// - `scale` - Pooling factor, greater than 0
/// - `count` - Number of images
///
/// # Returns
///
/// - `Ok(())` - Output written
/// - `Err(ModelError::ConfigurationError)` - If `scale` is 0
/// - `Err(ModelError::InputValidationError)` - If a buffer does not hold `count` images
/// - `Err(ModelError::DeviceError)` - If the launch fails
pub fn downsample(
    device: &Device,
    data: &[f32],
    output: &mut [f32],
    input_size: Size,
    scale: usize,
    count: usize,
) -> Result<(), ModelError> {
    validate_scale(scale)?;
    let output_size = input_size / scale;
    validate_buffer_len("downsample input", data.len(), input_size.area() * count)?;
    validate_buffer_len("downsample output", output.len(), output_size.area() * count)?;

    if count == 0 || output_size.is_empty() {
        return Ok(());
    }

    let config = LaunchConfig::covering(output_size, device.config().block_dim, count);
    let denominator = (scale * scale) as f32;

    device.launch("downsample", &config, output, WriteMode::Store, |ctx, _shared| {
        let z = ctx.block_idx.z;
        let image = &data[z * input_size.area()..(z + 1) * input_size.area()];
        let mut writes = Vec::with_capacity(ctx.thread_count());

        for thread in ctx.threads() {
            let (r, c) = ctx.global_pixel(thread);
            if r >= output_size.rows || c >= output_size.cols {
                continue;
            }

            let mut sum = 0.0;
            for i in r * scale..((r + 1) * scale).min(input_size.rows) {
                for j in c * scale..((c + 1) * scale).min(input_size.cols) {
                    sum += image[i * input_size.cols + j];
                }
            }

            writes.push((
                z * output_size.area() + r * output_size.cols + c,
                sum / denominator,
            ));
        }

        writes
    })
}

/// Replicates every pooled value over its `scale x scale` block for `count` independent images.
///
/// One thread per output (pre-pool) pixel copies the pooled value at
/// `(row / scale, col / scale)`. Pixels whose pooled coordinate falls outside the pooled
/// image, which happens when `output_size` is not a multiple of `scale`, receive 0.
///
/// # Parameters
///
/// - `device` - Device to launch on
/// - `data` - `count` row-major pooled images of `output_size / scale`
/// - `output` - `count` row-major images of `output_size`, overwritten
/// - `output_size` - Size of one pre-pool image
/// - `scale` - Pooling factor, greater than 0
/// - `count` - Number of images
///
/// # Returns
///
/// - `Ok(())` - Output written
/// - `Err(ModelError::ConfigurationError)` - If `scale` is 0
/// - `Err(ModelError::InputValidationError)` - If a buffer does not hold `count` images
/// - `Err(ModelError::DeviceError)` - If the launch fails
pub fn upsample(
    device: &Device,
    data: &[f32],
    output: &mut [f32],
    output_size: Size,
    scale: usize,
    count: usize,
) -> Result<(), ModelError> {
    validate_scale(scale)?;
    let pooled_size = output_size / scale;
    validate_buffer_len("upsample input", data.len(), pooled_size.area() * count)?;
    validate_buffer_len("upsample output", output.len(), output_size.area() * count)?;

    if count == 0 || output_size.is_empty() {
        return Ok(());
    }

    let config = LaunchConfig::covering(output_size, device.config().block_dim, count);

    device.launch("upsample", &config, output, WriteMode::Store, |ctx, _shared| {
        let z = ctx.block_idx.z;
        let pooled = &data[z * pooled_size.area()..(z + 1) * pooled_size.area()];
        let mut writes = Vec::with_capacity(ctx.thread_count());

        for thread in ctx.threads() {
            let (r, c) = ctx.global_pixel(thread);
            if r >= output_size.rows || c >= output_size.cols {
                continue;
            }

            let (pr, pc) = (r / scale, c / scale);
            let value = if pr < pooled_size.rows && pc < pooled_size.cols {
                pooled[pr * pooled_size.cols + pc]
            } else {
                0.0
            };

            writes.push((z * output_size.area() + r * output_size.cols + c, value));
        }

        writes
    })
}

/// Validates the pooling factor.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if scale is 0.
pub(crate) fn validate_scale(scale: usize) -> Result<(), ModelError> {
    if scale == 0 {
        return Err(ModelError::ConfigurationError(
            "Pooling scale must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
