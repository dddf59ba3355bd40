use crate::constants::CLOCK_SPEED;
use crate::error::{Error, Result};

/// Above this a period rounds down to nothing
const MAX_RATE: u32 = 1_000_000_000;

/// Tunables for a `Coordinator`
///
/// The timers always run at `TIMER_RATE`; only the instruction clock and the optional built-in
/// presentation sampler are adjustable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Instructions executed per second
    pub cycle_rate: u32,
    /// If set, a background thread samples for new frames this many times per second.
    /// Leave unset when a display drives `Coordinator::sample` from its own refresh signal.
    pub presentation_rate: Option<u32>,
    /// Seed for `RND`; entropy is used when unset
    pub seed: Option<u64>,
}

impl Config {
    pub fn with_cycle_rate(mut self, hz: u32) -> Self {
        self.cycle_rate = hz;
        self
    }

    pub fn with_presentation_rate(mut self, hz: u32) -> Self {
        self.presentation_rate = Some(hz);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Rejects rates of 0 Hz or above `MAX_RATE`
    pub fn validate(&self) -> Result<()> {
        let rates = [("cycle", Some(self.cycle_rate)), ("presentation", self.presentation_rate)];
        for (name, hz) in rates {
            match hz {
                Some(hz) if hz == 0 || hz > MAX_RATE => {
                    return Err(Error::InvalidRate { name, hz });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycle_rate: CLOCK_SPEED,
            presentation_rate: None,
            seed: None,
        }
    }
}
