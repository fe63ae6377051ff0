use chrono::{DateTime, Duration, Utc};

/// Three hours between two chargeable scans of the same account.
pub const DEFAULT_FARE_COOLDOWN_SECS: i64 = 10_800;

#[derive(Debug, Clone, PartialEq)]
pub enum FareDecision {
    /// The scan charges a fare and `last_transaction` becomes `at`.
    Charged {
        at: DateTime<Utc>,
        /// Elapsed time since the previous charge, `None` on the first one.
        seconds_since_last: Option<f64>,
    },
    /// The scan falls inside the cooldown window; nothing is written.
    Suppressed { seconds_since_last: f64 },
}

impl FareDecision {
    pub fn is_charged(&self) -> bool {
        matches!(self, FareDecision::Charged { .. })
    }

    pub fn seconds_since_last(&self) -> Option<f64> {
        match self {
            FareDecision::Charged { seconds_since_last, .. } => *seconds_since_last,
            FareDecision::Suppressed { seconds_since_last } => Some(*seconds_since_last),
        }
    }
}

/// Cooldown rule for fare charges.
///
/// Holds no state of its own: callers pass the stored `last_transaction` and
/// persist the outcome. Stores must apply the decision while holding a
/// per-account lock so concurrent scans cannot both charge.
#[derive(Debug, Clone, Copy)]
pub struct FareLedger {
    cooldown: Duration,
}

impl Default for FareLedger {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_FARE_COOLDOWN_SECS))
    }
}

impl FareLedger {
    pub fn new(cooldown: Duration) -> Self {
        Self { cooldown }
    }

    pub fn decide(&self, last_transaction: Option<DateTime<Utc>>, now: DateTime<Utc>) -> FareDecision {
        let Some(last) = last_transaction else {
            return FareDecision::Charged {
                at: now,
                seconds_since_last: None,
            };
        };

        let elapsed = now - last;
        let seconds = elapsed.num_milliseconds() as f64 / 1000.0;

        if elapsed < self.cooldown {
            FareDecision::Suppressed {
                seconds_since_last: seconds,
            }
        } else {
            FareDecision::Charged {
                at: now,
                seconds_since_last: Some(seconds),
            }
        }
    }
}
