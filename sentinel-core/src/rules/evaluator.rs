//! Pure rule evaluation
//!
//! `evaluate` is a function of the current sample, indicator snapshot,
//! extrema event, and prior fire record. It mutates nothing; suppression is
//! the hygiene gate's job.

use crate::data::Sample;
use crate::extrema::ExtremaEvent;
use crate::hygiene::FireRecord;
use crate::indicators::IndicatorSnapshot;
use crate::rules::{
    AlertRule, CandidateAlert, Direction, ExtremaSide, PercentReference, RuleCondition,
};

/// Everything a rule evaluation can see.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub sample: &'a Sample,
    pub snapshot: &'a IndicatorSnapshot,
    /// Extrema event produced by this sample, if any
    pub extrema_event: Option<&'a ExtremaEvent>,
    /// First price seen this session for this instrument
    pub session_open: Option<f64>,
    /// Last approved fire for (rule, instrument), if any
    pub prior_fire: Option<&'a FireRecord>,
}

/// Evaluate one rule against one sample. Pure; returns at most one candidate.
pub fn evaluate(rule: &AlertRule, ctx: &EvalContext<'_>) -> Option<CandidateAlert> {
    if !rule.pattern.matches(&ctx.sample.instrument) {
        return None;
    }

    let (message, value) = match &rule.condition {
        RuleCondition::ThresholdCross { level, direction } => {
            let prev = ctx.snapshot.prev_price?;
            let price = ctx.sample.price;
            let crossed = match direction {
                Direction::Up => prev <= *level && price > *level,
                Direction::Down => prev >= *level && price < *level,
            };
            if !crossed {
                return None;
            }
            let verb = match direction {
                Direction::Up => "above",
                Direction::Down => "below",
            };
            (
                format!(
                    "{} @ {:.2} crossed {} {:.2}",
                    ctx.sample.instrument, price, verb, level
                ),
                price,
            )
        }
        RuleCondition::PercentMove {
            reference,
            magnitude_pct,
        } => {
            let reference_price = match reference {
                PercentReference::SessionOpen => ctx.session_open?,
                // before the first fire the session open stands in, so the
                // rule can bootstrap on a fresh deployment
                PercentReference::PreviousFire => {
                    ctx.prior_fire.map(|f| f.price).or(ctx.session_open)?
                }
            };
            if reference_price <= 0.0 {
                return None;
            }
            let pct = (ctx.sample.price - reference_price) / reference_price * 100.0;
            if pct.abs() < *magnitude_pct {
                return None;
            }
            (
                format!(
                    "{} @ {:.2} moved {:+.2}% from {:.2}",
                    ctx.sample.instrument, ctx.sample.price, pct, reference_price
                ),
                pct,
            )
        }
        RuleCondition::IndicatorCrossover { crossover } => {
            if ctx.snapshot.crossover != Some(*crossover) {
                return None;
            }
            let fast = ctx.snapshot.sma_fast?;
            let slow = ctx.snapshot.sma_slow?;
            (
                format!(
                    "{} {:?} cross: fast SMA {:.2} vs slow SMA {:.2}",
                    ctx.sample.instrument, crossover, fast, slow
                ),
                fast - slow,
            )
        }
        RuleCondition::NewExtremum { side } => match (ctx.extrema_event?, side) {
            (ExtremaEvent::NewHigh { price, .. }, Some(ExtremaSide::High) | None) => (
                format!("{} new all-time high {:.2}", ctx.sample.instrument, price),
                *price,
            ),
            (ExtremaEvent::NewLow { price, .. }, Some(ExtremaSide::Low) | None) => (
                format!("{} new all-time low {:.2}", ctx.sample.instrument, price),
                *price,
            ),
            _ => return None,
        },
    };

    Some(CandidateAlert {
        rule_id: rule.id.clone(),
        instrument: ctx.sample.instrument.clone(),
        timestamp: ctx.sample.timestamp,
        message,
        severity: rule.severity,
        value,
        price: ctx.sample.price,
        cooldown: rule.cooldown,
        exempt_from_quiet_hours: rule.exempt_from_quiet_hours,
        action: rule.action,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Instrument;
    use crate::indicators::{IndicatorConfig, IndicatorState};
    use crate::rules::InstrumentPattern;
    use chrono::{TimeZone, Utc};

    fn sample(secs: i64, price: f64) -> Sample {
        Sample::equity(
            "NVDA",
            Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            price,
            None,
        )
    }

    fn run_rule(rule: &AlertRule, prices: &[f64]) -> Vec<CandidateAlert> {
        let mut state = IndicatorState::new(IndicatorConfig::default());
        let mut fired = Vec::new();
        let mut session_open = None;
        for (i, &p) in prices.iter().enumerate() {
            let s = sample(i as i64, p);
            let snap = state.update(&s).unwrap();
            session_open.get_or_insert(p);
            let ctx = EvalContext {
                sample: &s,
                snapshot: &snap,
                extrema_event: None,
                session_open,
                prior_fire: None,
            };
            if let Some(c) = evaluate(rule, &ctx) {
                fired.push(c);
            }
        }
        fired
    }

    #[test]
    fn threshold_cross_fires_once_per_crossing() {
        let rule = AlertRule::new(
            "nvda-180-up",
            InstrumentPattern::Symbol("NVDA".into()),
            RuleCondition::ThresholdCross {
                level: 180.0,
                direction: Direction::Up,
            },
        );
        // one up-crossing, then price stays above; then a re-cross
        let fired = run_rule(
            &rule,
            &[178.0, 179.5, 180.5, 181.0, 185.0, 179.0, 181.0],
        );
        assert_eq!(fired.len(), 2, "one per actual crossing, not per sample");
    }

    #[test]
    fn threshold_cross_needs_a_previous_sample() {
        let rule = AlertRule::new(
            "nvda-180-up",
            InstrumentPattern::Any,
            RuleCondition::ThresholdCross {
                level: 180.0,
                direction: Direction::Up,
            },
        );
        // first sample is already above the level: no crossing observed
        let fired = run_rule(&rule, &[185.0, 186.0]);
        assert!(fired.is_empty());
    }

    #[test]
    fn downward_cross_direction() {
        let rule = AlertRule::new(
            "nvda-180-down",
            InstrumentPattern::Any,
            RuleCondition::ThresholdCross {
                level: 180.0,
                direction: Direction::Down,
            },
        );
        let fired = run_rule(&rule, &[181.0, 179.0, 178.0]);
        assert_eq!(fired.len(), 1);
    }

    #[test]
    fn percent_move_from_session_open() {
        let rule = AlertRule::new(
            "pct-2",
            InstrumentPattern::Any,
            RuleCondition::PercentMove {
                reference: PercentReference::SessionOpen,
                magnitude_pct: 2.0,
            },
        );
        // open 100; 101.9 is under 2%, 102.0 is exactly 2%, 97.5 is -2.5%
        let fired = run_rule(&rule, &[100.0, 101.9, 102.0, 97.5]);
        assert_eq!(fired.len(), 2);
        assert!((fired[0].value - 2.0).abs() < 1e-9);
        assert!(fired[1].value < 0.0);
    }

    #[test]
    fn previous_fire_reference_bootstraps_from_session_open() {
        let rule = AlertRule::new(
            "pct-fire",
            InstrumentPattern::Any,
            RuleCondition::PercentMove {
                reference: PercentReference::PreviousFire,
                magnitude_pct: 2.0,
            },
        );
        let s = sample(0, 110.0);
        let mut state = IndicatorState::new(IndicatorConfig::default());
        let snap = state.update(&s).unwrap();

        // no fire record yet: the session open is the reference
        let ctx = EvalContext {
            sample: &s,
            snapshot: &snap,
            extrema_event: None,
            session_open: Some(100.0),
            prior_fire: None,
        };
        let c = evaluate(&rule, &ctx).unwrap();
        assert!((c.value - 10.0).abs() < 1e-9);

        // once a record exists it takes over as the reference
        let record = FireRecord {
            last_fired: s.timestamp,
            price: 109.0,
            value_bucket: 1000,
        };
        let ctx = EvalContext {
            prior_fire: Some(&record),
            ..ctx
        };
        assert!(evaluate(&rule, &ctx).is_none(), "0.9% from the last fire");
    }

    #[test]
    fn pattern_filters_instruments() {
        let rule = AlertRule::new(
            "aapl-only",
            InstrumentPattern::Symbol("AAPL".into()),
            RuleCondition::NewExtremum { side: None },
        );
        let s = sample(0, 100.0);
        let mut state = IndicatorState::new(IndicatorConfig::default());
        let snap = state.update(&s).unwrap();
        let event = ExtremaEvent::NewHigh {
            price: 100.0,
            at: s.timestamp,
            previous: None,
        };
        let ctx = EvalContext {
            sample: &s,
            snapshot: &snap,
            extrema_event: Some(&event),
            session_open: Some(100.0),
            prior_fire: None,
        };
        assert!(evaluate(&rule, &ctx).is_none());
    }

    #[test]
    fn new_extremum_side_filter() {
        let high_rule = AlertRule::new(
            "ath",
            InstrumentPattern::Any,
            RuleCondition::NewExtremum {
                side: Some(ExtremaSide::High),
            },
        );
        let low_rule = AlertRule::new(
            "atl",
            InstrumentPattern::Any,
            RuleCondition::NewExtremum {
                side: Some(ExtremaSide::Low),
            },
        );
        let s = sample(0, 90.0);
        let mut state = IndicatorState::new(IndicatorConfig::default());
        let snap = state.update(&s).unwrap();
        let event = ExtremaEvent::NewLow {
            price: 90.0,
            at: s.timestamp,
            previous: Some(95.0),
        };
        let ctx = EvalContext {
            sample: &s,
            snapshot: &snap,
            extrema_event: Some(&event),
            session_open: Some(90.0),
            prior_fire: None,
        };
        assert!(evaluate(&high_rule, &ctx).is_none());
        let c = evaluate(&low_rule, &ctx).unwrap();
        assert_eq!(c.value, 90.0);
        assert_eq!(c.instrument, Instrument::equity("NVDA"));
    }
}
