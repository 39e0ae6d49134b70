use std::time::Duration;

/// Path of the query endpoint, relative to the page origin.
pub const QUERY_PATH: &str = "/query";

/// Pause after each character of the typing effect.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(20);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint_path: String,
    pub typing_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_path: QUERY_PATH.to_string(),
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }
}
