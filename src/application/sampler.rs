use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of the admission check for a freshly fetched price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Admission {
    /// No sample stored yet
    FirstSample,
    Admitted { elapsed_secs: i64 },
    /// Too close to the last stored sample; not an error
    TooSoon { elapsed_secs: i64, required_secs: i64 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Admission::TooSoon { .. })
    }
}

/// Enforces a minimum spacing between stored samples.
///
/// The spacing is set a little below the polling interval so that tick
/// jitter does not drop a sample, while extra executions inside one
/// interval do not store near-duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionGate {
    min_spacing: chrono::Duration,
}

impl AdmissionGate {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing: chrono::Duration::from_std(min_spacing)
                .unwrap_or_else(|_| chrono::Duration::MAX),
        }
    }

    pub fn min_spacing(&self) -> chrono::Duration {
        self.min_spacing
    }

    pub fn decide(&self, now: DateTime<Utc>, last: Option<DateTime<Utc>>) -> Admission {
        let Some(last) = last else {
            return Admission::FirstSample;
        };

        let elapsed = now - last;
        if elapsed >= self.min_spacing {
            Admission::Admitted {
                elapsed_secs: elapsed.num_seconds(),
            }
        } else {
            Admission::TooSoon {
                elapsed_secs: elapsed.num_seconds(),
                required_secs: self.min_spacing.num_seconds(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_empty_series_admits() {
        let gate = AdmissionGate::new(Duration::from_secs(55));
        assert_eq!(gate.decide(t0(), None), Admission::FirstSample);
    }

    #[test]
    fn test_exact_spacing_admits() {
        let gate = AdmissionGate::new(Duration::from_secs(55));
        let decision = gate.decide(t0() + chrono::Duration::seconds(55), Some(t0()));
        assert_eq!(decision, Admission::Admitted { elapsed_secs: 55 });
    }

    #[test]
    fn test_one_second_short_rejects() {
        let gate = AdmissionGate::new(Duration::from_secs(55));
        let decision = gate.decide(t0() + chrono::Duration::seconds(54), Some(t0()));
        assert!(!decision.is_admitted());
        assert_eq!(
            decision,
            Admission::TooSoon {
                elapsed_secs: 54,
                required_secs: 55
            }
        );
    }

    #[test]
    fn test_clock_going_backwards_rejects() {
        let gate = AdmissionGate::new(Duration::from_secs(55));
        let decision = gate.decide(t0() - chrono::Duration::seconds(10), Some(t0()));
        assert!(!decision.is_admitted());
    }
}
