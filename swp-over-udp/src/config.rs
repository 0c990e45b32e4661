//! Engine configuration.
//!
//! Window size and retransmission timeout are fixed for the lifetime of an
//! engine; there is no negotiation and no adaptive RTO.

use std::time::Duration;

/// Default number of chunks that may be unacknowledged at once.
pub const WINDOW_SIZE: usize = 5;

/// Default time a chunk may stay unacknowledged before it is re-sent.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(1);

/// Parameters shared by [`crate::sender::Sender`] and
/// [`crate::receiver::Receiver`].
#[derive(Debug, Clone, PartialEq)]
pub struct SwpConfig {
    /// Maximum number of outstanding chunks (sender only).
    pub window_size: usize,
    /// Per-chunk retransmission timeout (sender only).
    pub retransmit_timeout: Duration,
    /// Probability in `[0.0, 1.0]` that the link drops a datagram, applied
    /// independently to each direction.
    pub loss_probability: f64,
    /// Seed for the loss model.  `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SwpConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
            loss_probability: 0.0,
            seed: None,
        }
    }
}

impl SwpConfig {
    /// Default configuration with the given loss probability.
    pub fn with_loss(loss_probability: f64) -> Self {
        Self {
            loss_probability,
            ..Self::default()
        }
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if u32::try_from(self.window_size).is_err() {
            return Err(ConfigError::WindowTooLarge(self.window_size));
        }
        if self.retransmit_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        check_probability(self.loss_probability)
    }
}

pub(crate) fn check_probability(p: f64) -> Result<(), ConfigError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::LossProbability(p))
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("window size must be at least 1")]
    ZeroWindow,
    #[error("window size {0} does not fit a u32 permit count")]
    WindowTooLarge(usize),
    #[error("retransmission timeout must be non-zero")]
    ZeroTimeout,
    #[error("loss probability {0} is outside [0.0, 1.0]")]
    LossProbability(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let c = SwpConfig::default();
        assert_eq!(c.window_size, 5);
        assert_eq!(c.retransmit_timeout, Duration::from_secs(1));
        assert_eq!(c.loss_probability, 0.0);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_bad_probability() {
        assert_eq!(
            SwpConfig::with_loss(1.5).validate(),
            Err(ConfigError::LossProbability(1.5))
        );
        assert!(SwpConfig::with_loss(-0.1).validate().is_err());
        assert!(SwpConfig::with_loss(f64::NAN).validate().is_err());
        assert!(SwpConfig::with_loss(1.0).validate().is_ok());
    }

    #[test]
    fn rejects_zero_window_and_timeout() {
        let c = SwpConfig {
            window_size: 0,
            ..SwpConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroWindow));

        let c = SwpConfig {
            retransmit_timeout: Duration::ZERO,
            ..SwpConfig::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ZeroTimeout));
    }
}
