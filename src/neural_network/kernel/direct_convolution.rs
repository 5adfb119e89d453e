use super::*;

/// Computes a single 2D convolution with one device thread per output pixel.
///
/// Each thread evaluates `out[r][c] = sum K[i][j] * D[r + o_r - i][c + o_c - j]`, where the
/// offset `o` is 0 for `Full`, `kernel - 1` for `Valid` and `kernel / 2` for `Same`. Terms
/// whose data coordinate falls outside the image are skipped. Only the plain modes are
/// accepted here; `*Shm` modes go through [`TiledConvolution`].
///
/// # Parameters
///
/// - `device` - Device to launch on
/// - `data` - Row-major input image of `data_size`
/// - `data_size` - Size of the input image
/// - `kernel` - Row-major kernel of `kernel_size`
/// - `kernel_size` - Size of the kernel
/// - `conv_type` - `Same`, `Valid` or `Full`
/// - `output` - Row-major output buffer, overwritten
///
/// # Returns
///
/// - `Ok(())` - Output written
/// - `Err(ModelError::ConfigurationError)` - If a shared-memory mode is passed or the kernel is empty
/// - `Err(ModelError::InputValidationError)` - If a buffer length does not match its size
/// - `Err(ModelError::DeviceError)` - If the launch fails
pub fn direct_convolution(
    device: &Device,
    data: &[f32],
    data_size: Size,
    kernel: &[f32],
    kernel_size: Size,
    conv_type: ConvType,
    output: &mut [f32],
) -> Result<(), ModelError> {
    if conv_type.is_shared_memory() {
        return Err(ModelError::ConfigurationError(format!(
            "Direct convolution does not serve `{}`, use the tiled kernel",
            conv_type
        )));
    }
    validate_kernel_size(kernel_size)?;

    let output_size = conv_type.output_size(data_size, kernel_size);
    validate_buffer_len("data", data.len(), data_size.area())?;
    validate_buffer_len("kernel", kernel.len(), kernel_size.area())?;
    validate_buffer_len("output", output.len(), output_size.area())?;

    if output_size.is_empty() {
        return Ok(());
    }

    let offset = conv_type.direct_offset(kernel_size);
    let config = LaunchConfig::covering(output_size, device.config().block_dim, 1);
    let name = format!("convolve_{}", conv_type);

    device.launch(&name, &config, output, WriteMode::Store, |ctx, _shared| {
        let mut writes = Vec::with_capacity(ctx.thread_count());

        for thread in ctx.threads() {
            let (r, c) = ctx.global_pixel(thread);
            if r >= output_size.rows || c >= output_size.cols {
                continue;
            }

            let mut sum = 0.0;
            for i in 0..kernel_size.rows {
                let Some(dr) = (r + offset.rows).checked_sub(i) else {
                    continue;
                };
                if dr >= data_size.rows {
                    continue;
                }

                for j in 0..kernel_size.cols {
                    let Some(dc) = (c + offset.cols).checked_sub(j) else {
                        continue;
                    };
                    if dc >= data_size.cols {
                        continue;
                    }

                    sum += kernel[i * kernel_size.cols + j] * data[dr * data_size.cols + dc];
                }
            }

            writes.push((r * output_size.cols + c, sum));
        }

        writes
    })
}

/// Validates that a buffer holds exactly `expected` values.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` on a length mismatch.
pub(crate) fn validate_buffer_len(
    what: &str,
    actual: usize,
    expected: usize,
) -> Result<(), ModelError> {
    if actual != expected {
        return Err(ModelError::InputValidationError(format!(
            "{} buffer holds {} values, expected {}",
            what, actual, expected
        )));
    }
    Ok(())
}
