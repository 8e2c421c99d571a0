//! Notification hygiene
//!
//! Candidates pass through quiet hours, per-(rule, instrument) cooldown, and
//! dedupe before they may fire. The gate owns the fire records, so the
//! read-then-write on approval is a single critical section per key.

use crate::data::Instrument;
use crate::error::{EngineError, Result};
use crate::rules::{CandidateAlert, Severity, TradeAction};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A local-time window during which non-exempt alerts are suppressed.
///
/// Overnight windows (start > end) wrap midnight. The start is inclusive and
/// the end exclusive: with 23:00-07:00, a candidate at 23:00 is suppressed
/// and one at exactly 07:00 is admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tz: Tz,
}

impl QuietHours {
    /// Parse an "HH:MM-HH:MM" window.
    pub fn parse(window: &str, tz: Tz) -> Result<Self> {
        let (left, right) = window
            .split_once('-')
            .ok_or_else(|| EngineError::InvalidConfig(format!("quiet hours '{window}'")))?;
        let parse_time = |s: &str| {
            NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|e| EngineError::InvalidConfig(format!("quiet hours '{window}': {e}")))
        };
        Ok(Self {
            start: parse_time(left)?,
            end: parse_time(right)?,
            tz,
        })
    }

    /// Is `at` inside the window, evaluated in the monitored timezone?
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let local = at.with_timezone(&self.tz).time();
        if self.start < self.end {
            self.start <= local && local < self.end
        } else if self.start > self.end {
            // overnight wrap
            local >= self.start || local < self.end
        } else {
            // zero-length window never suppresses
            false
        }
    }
}

/// Last approved fire for a (rule, instrument) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    pub last_fired: DateTime<Utc>,
    /// Sample price at fire time (percent-move reference)
    pub price: f64,
    /// Rounded value bucket used for dedupe
    pub value_bucket: i64,
}

/// Why a candidate was not admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SuppressReason {
    QuietHours,
    Cooldown { remaining_secs: i64 },
    Duplicate,
}

/// An alert that cleared the gate.
#[derive(Debug, Clone)]
pub struct ApprovedAlert {
    pub rule_id: String,
    pub instrument: Instrument,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    pub value: f64,
    pub price: f64,
    pub action: TradeAction,
}

/// Gate decision.
#[derive(Debug, Clone)]
pub enum Admission {
    Approved(ApprovedAlert),
    Suppressed {
        rule_id: String,
        reason: SuppressReason,
    },
}

/// Applies quiet hours, cooldown, and dedupe to candidate alerts.
///
/// Approval and the fire-record update happen in the same call; there is no
/// approval without the state update and no update without approval.
#[derive(Debug)]
pub struct HygieneGate {
    quiet_hours: Option<QuietHours>,
    /// Coalescing window for near-duplicate candidates
    dedupe_window: Duration,
    fires: HashMap<(String, String), FireRecord>,
}

impl HygieneGate {
    pub fn new(quiet_hours: Option<QuietHours>, dedupe_window: Duration) -> Self {
        Self {
            quiet_hours,
            dedupe_window,
            fires: HashMap::new(),
        }
    }

    /// Install a persisted fire record before live traffic.
    pub fn seed(&mut self, rule_id: impl Into<String>, symbol: impl Into<String>, record: FireRecord) {
        self.fires.insert((rule_id.into(), symbol.into()), record);
    }

    /// Last fire for a (rule, instrument) pair.
    pub fn last_fire(&self, rule_id: &str, symbol: &str) -> Option<&FireRecord> {
        self.fires
            .get(&(rule_id.to_string(), symbol.to_string()))
    }

    /// All fire records, for persistence.
    pub fn fire_records(&self) -> impl Iterator<Item = (&(String, String), &FireRecord)> {
        self.fires.iter()
    }

    /// Admit or suppress one candidate at time `now`.
    pub fn admit(&mut self, candidate: CandidateAlert, now: DateTime<Utc>) -> Admission {
        let exempt =
            candidate.exempt_from_quiet_hours || candidate.severity == Severity::Critical;
        if !exempt {
            if let Some(quiet) = &self.quiet_hours {
                if quiet.contains(now) {
                    return Admission::Suppressed {
                        rule_id: candidate.rule_id,
                        reason: SuppressReason::QuietHours,
                    };
                }
            }
        }

        let key = (candidate.rule_id.clone(), candidate.instrument.symbol.clone());
        let value_bucket = bucket(candidate.value);
        if let Some(last) = self.fires.get(&key) {
            let elapsed = now - last.last_fired;
            if elapsed < candidate.cooldown {
                return Admission::Suppressed {
                    rule_id: candidate.rule_id,
                    reason: SuppressReason::Cooldown {
                        remaining_secs: (candidate.cooldown - elapsed).num_seconds(),
                    },
                };
            }
            if elapsed < self.dedupe_window && last.value_bucket == value_bucket {
                return Admission::Suppressed {
                    rule_id: candidate.rule_id,
                    reason: SuppressReason::Duplicate,
                };
            }
        }

        // approval and record update are one step
        self.fires.insert(
            key,
            FireRecord {
                last_fired: now,
                price: candidate.price,
                value_bucket,
            },
        );
        Admission::Approved(ApprovedAlert {
            rule_id: candidate.rule_id,
            instrument: candidate.instrument,
            timestamp: now,
            message: candidate.message,
            severity: candidate.severity,
            value: candidate.value,
            price: candidate.price,
            action: candidate.action,
        })
    }
}

/// Round a rule value to a cent-sized bucket for dedupe.
fn bucket(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Instrument;
    use chrono::TimeZone;
    use chrono_tz::America::Los_Angeles;

    fn candidate(rule_id: &str, cooldown_secs: i64, value: f64) -> CandidateAlert {
        CandidateAlert {
            rule_id: rule_id.to_string(),
            instrument: Instrument::equity("NVDA"),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            message: "test".to_string(),
            severity: Severity::Info,
            value,
            price: 100.0,
            cooldown: Duration::seconds(cooldown_secs),
            exempt_from_quiet_hours: false,
            action: TradeAction::Hold,
        }
    }

    /// A UTC instant whose Los Angeles local time is `hh:mm` on 2025-06-10.
    fn la_time(hh: u32, mm: u32) -> DateTime<Utc> {
        Los_Angeles
            .with_ymd_and_hms(2025, 6, 10, hh, mm, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn quiet_gate() -> HygieneGate {
        let quiet = QuietHours::parse("23:00-07:00", Los_Angeles).unwrap();
        HygieneGate::new(Some(quiet), Duration::seconds(5))
    }

    #[test]
    fn quiet_hours_window_boundaries() {
        let quiet = QuietHours::parse("23:00-07:00", Los_Angeles).unwrap();
        assert!(quiet.contains(la_time(23, 30)));
        assert!(quiet.contains(la_time(23, 0)));
        assert!(quiet.contains(la_time(3, 0)));
        assert!(!quiet.contains(la_time(7, 0)), "window end is exclusive");
        assert!(!quiet.contains(la_time(12, 0)));
    }

    #[test]
    fn quiet_hours_suppress_non_exempt() {
        let mut gate = quiet_gate();
        match gate.admit(candidate("r", 60, 1.0), la_time(23, 30)) {
            Admission::Suppressed { reason, .. } => assert_eq!(reason, SuppressReason::QuietHours),
            Admission::Approved(_) => panic!("should be suppressed at 23:30"),
        }
        assert!(matches!(
            gate.admit(candidate("r", 60, 1.0), la_time(7, 0)),
            Admission::Approved(_)
        ));
    }

    #[test]
    fn critical_and_exempt_bypass_quiet_hours() {
        let mut gate = quiet_gate();
        let mut critical = candidate("crit", 60, 1.0);
        critical.severity = Severity::Critical;
        assert!(matches!(
            gate.admit(critical, la_time(23, 30)),
            Admission::Approved(_)
        ));
        let mut exempt = candidate("ath", 60, 2.0);
        exempt.exempt_from_quiet_hours = true;
        assert!(matches!(
            gate.admit(exempt, la_time(23, 30)),
            Admission::Approved(_)
        ));
    }

    #[test]
    fn cooldown_boundary_is_inclusive_at_expiry() {
        let mut gate = HygieneGate::new(None, Duration::seconds(5));
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(matches!(
            gate.admit(candidate("r", 60, 1.0), t0),
            Admission::Approved(_)
        ));
        // 59s later: still cooling down
        match gate.admit(candidate("r", 60, 2.0), t0 + Duration::seconds(59)) {
            Admission::Suppressed { reason, .. } => {
                assert!(matches!(reason, SuppressReason::Cooldown { remaining_secs: 1 }))
            }
            Admission::Approved(_) => panic!("should be cooling down"),
        }
        // exactly 60s later: approved
        assert!(matches!(
            gate.admit(candidate("r", 60, 3.0), t0 + Duration::seconds(60)),
            Admission::Approved(_)
        ));
    }

    #[test]
    fn cooldown_is_per_rule_instrument_pair() {
        let mut gate = HygieneGate::new(None, Duration::zero());
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(matches!(
            gate.admit(candidate("a", 60, 1.0), t0),
            Admission::Approved(_)
        ));
        // different rule, same instrument, same instant
        assert!(matches!(
            gate.admit(candidate("b", 60, 1.0), t0),
            Admission::Approved(_)
        ));
    }

    #[test]
    fn near_duplicates_coalesce() {
        let mut gate = HygieneGate::new(None, Duration::seconds(5));
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        // zero cooldown so only dedupe applies
        assert!(matches!(
            gate.admit(candidate("r", 0, 2.504), t0),
            Admission::Approved(_)
        ));
        // same bucket (2.50) inside the window: merged
        match gate.admit(candidate("r", 0, 2.498), t0 + Duration::seconds(2)) {
            Admission::Suppressed { reason, .. } => assert_eq!(reason, SuppressReason::Duplicate),
            Admission::Approved(_) => panic!("near-duplicate should coalesce"),
        }
        // different bucket inside the window: its own alert
        assert!(matches!(
            gate.admit(candidate("r", 0, 2.60), t0 + Duration::seconds(3)),
            Admission::Approved(_)
        ));
        // same bucket after the window: fine
        assert!(matches!(
            gate.admit(candidate("r", 0, 2.60), t0 + Duration::seconds(10)),
            Admission::Approved(_)
        ));
    }

    #[test]
    fn seeded_record_enforces_cooldown_across_restart() {
        let mut gate = HygieneGate::new(None, Duration::seconds(5));
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        gate.seed(
            "r",
            "NVDA",
            FireRecord {
                last_fired: t0,
                price: 100.0,
                value_bucket: 100,
            },
        );
        assert!(matches!(
            gate.admit(candidate("r", 60, 1.0), t0 + Duration::seconds(30)),
            Admission::Suppressed { .. }
        ));
    }
}
