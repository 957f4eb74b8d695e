//! Artificial response latency
//!
//! Replies can be held back for a random interval so the assistant answers at
//! a human-looking cadence. Tests run with [`LatencyPolicy::Disabled`].

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatencyPolicy {
    #[default]
    Disabled,
    /// Uniformly distributed delay, both bounds inclusive
    Uniform { min: Duration, max: Duration },
}

impl LatencyPolicy {
    /// Bounds are reordered if given backwards
    pub fn uniform(a: Duration, b: Duration) -> Self {
        if a <= b {
            Self::Uniform { min: a, max: b }
        } else {
            Self::Uniform { min: b, max: a }
        }
    }

    /// Parse `off`, `0`, `<ms>` or `<min_ms>-<max_ms>`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("off") || raw == "0" {
            return Ok(Self::Disabled);
        }

        let parse_ms = |s: &str| {
            s.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| format!("invalid millisecond value {s:?}: {e}"))
        };

        match raw.split_once('-') {
            Some((min, max)) => Ok(Self::uniform(parse_ms(min)?, parse_ms(max)?)),
            None => {
                let fixed = parse_ms(raw)?;
                Ok(Self::uniform(fixed, fixed))
            }
        }
    }

    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Disabled => Duration::ZERO,
            Self::Uniform { min, max } if min == max => min,
            Self::Uniform { min, max } => rng.gen_range(min..=max),
        }
    }
}
