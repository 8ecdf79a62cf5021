//! Settings of a [`Card`](crate::Card).

/// Attempts made for each discovery candidate before it is skipped.
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Logs every frame sent to and received from the card, at the `info` level.
    /// Has no effect unless the crate is built with the `tracing` feature.
    pub apdu_logging: bool,

    /// Attempts made for each discovery candidate that fails in the transport.
    pub max_attempts: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            apdu_logging: false,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
