//! Transfer configuration

use serde::{Deserialize, Serialize};

use safstream_session::DEFAULT_BUFFER_SIZE;

use crate::error::CoreError;
use crate::Result;

const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Chunk size when a start request does not name one
    pub default_buffer_size: usize,
    /// Largest chunk size a client may request
    pub max_buffer_size: usize,
    /// Push channel names are `"{channel_prefix}/{session}"`
    pub channel_prefix: String,
    /// Events buffered ahead of a push listener
    pub event_capacity: usize,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_buffer_size == 0 {
            return Err(CoreError::Config(
                "default_buffer_size must be positive".to_string(),
            ));
        }
        if self.default_buffer_size > self.max_buffer_size {
            return Err(CoreError::Config(format!(
                "default_buffer_size {} exceeds max_buffer_size {}",
                self.default_buffer_size, self.max_buffer_size
            )));
        }
        if self.event_capacity == 0 {
            return Err(CoreError::Config(
                "event_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn channel_name(&self, session_id: &str) -> String {
        format!("{}/{}", self.channel_prefix.trim_end_matches('/'), session_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_buffer_size: DEFAULT_BUFFER_SIZE,
            max_buffer_size: MAX_BUFFER_SIZE,
            channel_prefix: "saf_stream/readFile".to_string(),
            event_capacity: 1,
        }
    }
}
