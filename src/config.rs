//! Pool configuration options

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use reuse_pool::PoolConfiguration;
///
/// let config = PoolConfiguration::<Vec<u8>>::new()
///     .with_initial_size(8)
///     .with_name("buffers")
///     .with_validation(|buf| buf.capacity() <= 64 * 1024);
///
/// assert_eq!(config.initial_size, 8);
/// assert_eq!(config.name, "buffers");
/// assert!(config.validate_on_return);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration<T> {
    /// Number of instances created up front
    pub initial_size: usize,

    /// Name used in log events and metric labels
    pub name: String,

    /// Whether to validate objects when they are returned to the pool
    pub validate_on_return: bool,

    /// Custom validation function, run before the object is reset
    pub validation_function: Option<fn(&T) -> bool>,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            initial_size: 0,
            name: "object_pool".to_string(),
            validate_on_return: false,
            validation_function: None,
        }
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many instances are created when the pool is built
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable validation on return
    ///
    /// An object failing the check is handed back to the caller instead of
    /// being recycled.
    pub fn with_validation(mut self, func: fn(&T) -> bool) -> Self {
        self.validate_on_return = true;
        self.validation_function = Some(func);
        self
    }

    pub(crate) fn accepts(&self, value: &T) -> bool {
        match self.validation_function {
            Some(validate) if self.validate_on_return => validate(value),
            _ => true,
        }
    }
}
