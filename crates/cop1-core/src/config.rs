use std::time::Duration;

use anyhow::bail;

use crate::TimeoutType;

/// Initial parameters of one FOP instance.
///
/// K, T1, the transmission limit and the timeout type can be changed later
/// through directives; these are only the values the engine starts with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FopConfig {
    /// Virtual channel served by this FOP; CLCWs for other channels are dropped.
    pub vcid: u8,
    /// FOP sliding window width K.
    pub sliding_window: u8,
    /// Initial value of timer T1.
    pub t1_initial: Duration,
    /// Transmissions allowed per frame before the FOP gives up.
    pub transmission_limit: u32,
    /// What happens when T1 expires at the transmission limit.
    pub timeout_type: TimeoutType,
}

impl Default for FopConfig {
    fn default() -> Self {
        Self {
            vcid: 0,
            sliding_window: 10,
            t1_initial: Duration::from_secs(5),
            transmission_limit: 3,
            timeout_type: TimeoutType::Alert,
        }
    }
}

impl FopConfig {
    /// # Errors
    ///
    /// Returns an error if the window width, T1 or the transmission limit is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sliding_window == 0 {
            bail!("FOP sliding window width must be 0<K<=255");
        }
        if self.t1_initial.is_zero() {
            bail!("T1 initial value must be positive");
        }
        if self.transmission_limit == 0 {
            bail!("transmission limit must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(FopConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_values() {
        let zero_window = FopConfig {
            sliding_window: 0,
            ..FopConfig::default()
        };
        assert!(zero_window.validate().is_err());

        let zero_t1 = FopConfig {
            t1_initial: Duration::ZERO,
            ..FopConfig::default()
        };
        assert!(zero_t1.validate().is_err());

        let zero_limit = FopConfig {
            transmission_limit: 0,
            ..FopConfig::default()
        };
        assert!(zero_limit.validate().is_err());
    }
}
