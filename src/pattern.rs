use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// How long the light stays lit for a single flash.
pub const DEFAULT_ON_DURATION: Duration = Duration::from_millis(75);

/// Gaps between flashes, in milliseconds.
pub const DEFAULT_GAPS_MS: [u64; 3] = [100, 100, 400];

/// A non-empty, cyclic sequence of gaps between flashes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlinkPattern {
    gaps: Vec<Duration>,
}

impl BlinkPattern {
    pub fn new(gaps: Vec<Duration>) -> Result<Self> {
        if gaps.is_empty() {
            return Err(Error::InvalidPattern);
        }
        Ok(BlinkPattern { gaps })
    }

    pub fn from_millis(gaps_ms: &[u64]) -> Result<Self> {
        BlinkPattern::new(gaps_ms.iter().copied().map(Duration::from_millis).collect())
    }

    /// The gap to wait after flash number `counter`, wrapping around the pattern.
    #[inline]
    pub fn gap(&self, counter: u64) -> Duration {
        // gaps is never empty so the modulo is always defined
        self.gaps[(counter % self.gaps.len() as u64) as usize]
    }

    /// Length of one full cycle for a given on-duration.
    pub fn period(&self, on_duration: Duration) -> Duration {
        self.gaps.iter().map(|gap| *gap + on_duration).sum()
    }
}

impl Default for BlinkPattern {
    fn default() -> Self {
        BlinkPattern {
            gaps: DEFAULT_GAPS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}

impl fmt::Display for BlinkPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, gap) in self.gaps.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}ms", gap.as_millis())?;
        }
        f.write_str("]")
    }
}
