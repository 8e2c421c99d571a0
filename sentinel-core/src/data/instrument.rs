//! Instrument identity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Instrument kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Common stock / ETF
    Equity,
    /// Listed option contract
    Option,
}

/// Call or put side of an option contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl OptionRight {
    /// Single-letter OCC code ("C" / "P")
    pub fn code(&self) -> char {
        match self {
            OptionRight::Call => 'C',
            OptionRight::Put => 'P',
        }
    }
}

/// Contract details carried by option instruments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Underlying ticker (e.g., "NVDA")
    pub underlying: String,
    /// Strike price
    pub strike: f64,
    /// Expiry date
    pub expiry: NaiveDate,
    /// Call or put
    pub right: OptionRight,
}

/// An instrument identity: a ticker or an option contract symbol.
///
/// Identity is the symbol alone; two instruments with the same symbol are the
/// same instrument. Option instruments additionally carry their contract
/// details for convenience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticker or OCC-style contract symbol
    pub symbol: String,
    /// Equity or option
    pub kind: InstrumentKind,
    /// Contract details, present only for options
    pub contract: Option<OptionContract>,
}

impl Instrument {
    /// Create an equity instrument
    pub fn equity(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            kind: InstrumentKind::Equity,
            contract: None,
        }
    }

    /// Create an option instrument with an OCC-style symbol
    /// (root + YYMMDD + C/P + strike in mills, zero-padded to 8 digits).
    pub fn option(
        underlying: impl Into<String>,
        strike: f64,
        expiry: NaiveDate,
        right: OptionRight,
    ) -> Self {
        let underlying = underlying.into();
        let symbol = format!(
            "{}{}{}{:08}",
            underlying,
            expiry.format("%y%m%d"),
            right.code(),
            (strike * 1000.0).round() as u64,
        );
        Self {
            symbol,
            kind: InstrumentKind::Option,
            contract: Some(OptionContract {
                underlying,
                strike,
                expiry,
                right,
            }),
        }
    }

    /// Underlying ticker for options, the symbol itself for equities
    pub fn underlying(&self) -> &str {
        match &self.contract {
            Some(c) => &c.underlying,
            None => &self.symbol,
        }
    }
}

impl PartialEq for Instrument {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for Instrument {}

impl Hash for Instrument {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occ_symbol_format() {
        let expiry = NaiveDate::from_ymd_opt(2025, 10, 17).unwrap();
        let inst = Instrument::option("NVDA", 105.0, expiry, OptionRight::Call);
        assert_eq!(inst.symbol, "NVDA251017C00105000");
        assert_eq!(inst.kind, InstrumentKind::Option);
        assert_eq!(inst.underlying(), "NVDA");
    }

    #[test]
    fn identity_is_symbol() {
        let a = Instrument::equity("NVDA");
        let b = Instrument::equity("NVDA");
        assert_eq!(a, b);
    }
}
