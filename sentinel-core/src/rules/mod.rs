//! Alert rules
//!
//! Rule definitions are a closed tagged-variant type evaluated by exhaustive
//! pattern dispatch; each variant carries only the parameters its kind needs.

pub mod evaluator;

pub use evaluator::*;

use crate::data::Instrument;
use crate::indicators::Crossover;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Crossing direction for price-level rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

/// Which side of the extrema interval a rule watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtremaSide {
    High,
    Low,
}

/// Reference price for percent-move rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PercentReference {
    /// First price seen this session
    SessionOpen,
    /// Price recorded at the rule's previous fire; the session open stands in
    /// before the first fire
    PreviousFire,
}

/// Alert rule condition. Closed set; evaluation matches exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuleCondition {
    /// Price crossed a configured level in the configured direction,
    /// detected via sign change between consecutive samples.
    ThresholdCross { level: f64, direction: Direction },
    /// Percent change from a reference price exceeded a magnitude.
    PercentMove {
        reference: PercentReference,
        magnitude_pct: f64,
    },
    /// SMA fast/slow crossover flag from the indicator engine.
    IndicatorCrossover { crossover: Crossover },
    /// The extrema tracker reported a new high/low. `side: None` watches both.
    NewExtremum { side: Option<ExtremaSide> },
}

/// Which instruments a rule applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstrumentPattern {
    /// Every instrument
    Any,
    /// One exact symbol
    Symbol(String),
    /// Any option contract on this underlying
    Underlying(String),
}

impl InstrumentPattern {
    pub fn matches(&self, instrument: &Instrument) -> bool {
        match self {
            InstrumentPattern::Any => true,
            InstrumentPattern::Symbol(s) => instrument.symbol == *s,
            InstrumentPattern::Underlying(u) => instrument
                .contract
                .as_ref()
                .map(|c| c.underlying == *u)
                .unwrap_or(false),
        }
    }
}

/// Alert severity. `Critical` bypasses quiet hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// What the paper trader does with an approved alert from this rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Hold,
    Enter,
    Exit,
}

/// A configured alert rule.
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub id: String,
    pub pattern: InstrumentPattern,
    pub condition: RuleCondition,
    /// Minimum gap between two fires for the same (rule, instrument)
    pub cooldown: Duration,
    /// Exempt from quiet-hours suppression (extrema rules typically are)
    pub exempt_from_quiet_hours: bool,
    pub severity: Severity,
    pub action: TradeAction,
}

impl AlertRule {
    pub fn new(id: impl Into<String>, pattern: InstrumentPattern, condition: RuleCondition) -> Self {
        Self {
            id: id.into(),
            pattern,
            condition,
            cooldown: Duration::minutes(30),
            exempt_from_quiet_hours: false,
            severity: Severity::Info,
            action: TradeAction::Hold,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn exempt_from_quiet_hours(mut self) -> Self {
        self.exempt_from_quiet_hours = true;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_action(mut self, action: TradeAction) -> Self {
        self.action = action;
        self
    }
}

/// A candidate alert produced by the evaluator.
///
/// Ephemeral: hygiene (quiet hours, cooldown, dedupe) is applied downstream,
/// so the evaluator may emit a candidate every time its condition holds.
#[derive(Debug, Clone)]
pub struct CandidateAlert {
    pub rule_id: String,
    pub instrument: Instrument,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    /// The value that triggered the rule (price, percent, indicator value)
    pub value: f64,
    /// Sample price at evaluation time, used by the paper trader
    pub price: f64,
    pub cooldown: Duration,
    pub exempt_from_quiet_hours: bool,
    pub action: TradeAction,
}
