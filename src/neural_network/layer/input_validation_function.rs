use super::*;

/// Validates a feature-map count.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if maps is 0.
pub(super) fn validate_map_count(what: &str, maps: usize) -> Result<(), ModelError> {
    if maps == 0 {
        return Err(ModelError::ConfigurationError(format!(
            "Number of {} maps must be greater than 0",
            what
        )));
    }
    Ok(())
}

/// Validates that a kernel fits inside the input image.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if the kernel is empty or larger than the image
/// in either dimension.
pub(super) fn validate_kernel_fits(kernel_size: Size, image_size: Size) -> Result<(), ModelError> {
    validate_kernel_size(kernel_size)?;
    if kernel_size.rows > image_size.rows || kernel_size.cols > image_size.cols {
        return Err(ModelError::ConfigurationError(format!(
            "Kernel {} does not fit input image {}",
            kernel_size, image_size
        )));
    }
    Ok(())
}

/// Validates a pooling scale against the image it pools.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if scale is 0 or larger than the image.
pub(super) fn validate_pooling_scale(scale: usize, image_size: Size) -> Result<(), ModelError> {
    validate_scale(scale)?;
    if (image_size / scale).is_empty() {
        return Err(ModelError::ConfigurationError(format!(
            "Pooling scale {} leaves nothing of input image {}",
            scale, image_size
        )));
    }
    Ok(())
}

/// Validates a gradient step size.
///
/// # Errors
///
/// Returns `ModelError::ConfigurationError` if the learning rate is negative or not finite.
pub(super) fn validate_learning_rate(learning_rate: f32) -> Result<(), ModelError> {
    if !learning_rate.is_finite() || learning_rate < 0.0 {
        return Err(ModelError::ConfigurationError(format!(
            "Learning rate must be a finite non-negative number, got {}",
            learning_rate
        )));
    }
    Ok(())
}

/// Validates that a feature-map matrix has the map count and image size a layer expects.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` describing the first mismatch.
pub(super) fn validate_feature_maps(
    what: &str,
    maps: &FeatureMaps,
    expected_maps: usize,
    expected_size: Size,
) -> Result<(), ModelError> {
    if maps.maps() != expected_maps {
        return Err(ModelError::InputValidationError(format!(
            "{} has {} feature maps, expected {}",
            what,
            maps.maps(),
            expected_maps
        )));
    }
    if maps.image_size() != expected_size {
        return Err(ModelError::InputValidationError(format!(
            "{} has {} rows per sample ({} maps of {}), expected {} maps of {}",
            what,
            maps.rows(),
            maps.maps(),
            maps.image_size(),
            expected_maps,
            expected_size
        )));
    }
    Ok(())
}

/// Validates that two matrices carry the same number of samples.
///
/// # Errors
///
/// Returns `ModelError::InputValidationError` if the batch sizes differ.
pub(super) fn validate_same_batch(input: &FeatureMaps, error: &FeatureMaps) -> Result<(), ModelError> {
    if input.batch_size() != error.batch_size() {
        return Err(ModelError::InputValidationError(format!(
            "input carries {} samples but error carries {}",
            input.batch_size(),
            error.batch_size()
        )));
    }
    Ok(())
}
