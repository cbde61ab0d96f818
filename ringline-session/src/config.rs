use crate::error::Error;

/// Per-session tuning, shared by every connection an acceptor creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause reads once this many client requests are in flight. 0 = no limit.
    pub max_in_flight: usize,
    /// Smallest read buffer the decoder should hand out.
    pub min_buffer_size: usize,
    /// Largest read buffer the decoder should grow to.
    pub max_buffer_size: usize,
    /// Write each reply as soon as it is ready instead of coalescing the
    /// replies of one executor pass into a single vectored write.
    pub single_write: bool,
    /// Answer `version` in the session instead of forwarding it.
    pub default_version_handler: bool,
    /// Version string reported by the built-in `version` handler.
    pub version_string: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_in_flight: 0,
            min_buffer_size: 256,
            max_buffer_size: 4096,
            single_write: false,
            default_version_handler: true,
            version_string: concat!("ringline ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Check values that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_buffer_size == 0 {
            return Err(Error::Config("min_buffer_size must be > 0".into()));
        }
        if self.max_buffer_size < self.min_buffer_size {
            return Err(Error::Config(
                "max_buffer_size must be >= min_buffer_size".into(),
            ));
        }
        if self.default_version_handler && self.version_string.is_empty() {
            return Err(Error::Config(
                "version_string must be set when the default version handler is on".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`SessionConfig`].
///
/// ```
/// use ringline_session::SessionConfig;
///
/// let config = SessionConfig::builder()
///     .max_in_flight(64)
///     .single_write(true)
///     .build()
///     .expect("invalid config");
/// assert_eq!(config.max_in_flight, 64);
/// ```
#[derive(Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Admission ────────────────────────────────────────────────────

    /// Maximum client requests in flight before reads pause. 0 = no limit.
    pub fn max_in_flight(mut self, n: usize) -> Self {
        self.config.max_in_flight = n;
        self
    }

    // ── Buffers ──────────────────────────────────────────────────────

    /// Read buffer bounds passed to the decoder.
    pub fn buffer_sizes(mut self, min: usize, max: usize) -> Self {
        self.config.min_buffer_size = min;
        self.config.max_buffer_size = max;
        self
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Write each reply individually instead of batching per pass.
    pub fn single_write(mut self, enable: bool) -> Self {
        self.config.single_write = enable;
        self
    }

    // ── Built-in commands ────────────────────────────────────────────

    /// Answer `version` locally.
    pub fn default_version_handler(mut self, enable: bool) -> Self {
        self.config.default_version_handler = enable;
        self
    }

    pub fn version_string(mut self, version: impl Into<String>) -> Self {
        self.config.version_string = version.into();
        self
    }

    /// Validate and return the config.
    pub fn build(self) -> Result<SessionConfig, Error> {
        self.config.validate()?;
        Ok(self.config)
    }
}
