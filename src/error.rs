/// Error types that can occur while configuring or running the convolution engine
///
/// Every variant is fatal for the call that produced it: the forward, backward or update
/// operation is aborted and the error is handed back to the caller unchanged.
///
/// # Variants
///
/// - `ConfigurationError` - an unknown convolution boundary mode, or an invalid layer/device configuration
/// - `ResourceError` - a requested shared-memory footprint does not fit the per-block budget, even after the block was shrunk as far as possible
/// - `InputValidationError` - a supplied matrix does not match the declared image area, map count or batch size
/// - `DeviceError` - a kernel launch was rejected or faulted on the device
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    ConfigurationError(String),
    ResourceError(String),
    InputValidationError(String),
    DeviceError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            ModelError::ResourceError(msg) => write!(f, "Resource error: {}", msg),
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::DeviceError(msg) => write!(f, "Device error: {}", msg),
        }
    }
}

/// Implements the standard error trait for ModelError
impl std::error::Error for ModelError {}
