//! Options strike selection
//!
//! Picks the nearest-Friday expiry and the at-the-money strike plus its two
//! listed neighbors from a chain snapshot. The set is recomputed whole on
//! every snapshot since expiry and moneyness shift discontinuously.

use crate::data::ChainSnapshot;
use crate::error::{EngineError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// The chosen expiry and strikes for one underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStrikeSet {
    pub underlying: String,
    /// First Friday strictly after the evaluation date
    pub expiry: NaiveDate,
    /// Listed strike minimizing |strike − underlying price|, ties to lower
    pub atm: f64,
    /// Next lower listed strike, `None` at the chain edge
    pub below: Option<f64>,
    /// Next higher listed strike, `None` at the chain edge
    pub above: Option<f64>,
}

impl OptionStrikeSet {
    /// The selected strikes, ascending.
    pub fn strikes(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(3);
        if let Some(b) = self.below {
            out.push(b);
        }
        out.push(self.atm);
        if let Some(a) = self.above {
            out.push(a);
        }
        out
    }
}

/// First Friday strictly after `date`. A Friday input rolls to the next
/// Friday; "today" is never a valid expiry for a fresh selection.
pub fn next_friday(date: NaiveDate) -> NaiveDate {
    let days_ahead = (Weekday::Fri.num_days_from_monday() as i64
        - date.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
    date + Duration::days(days_ahead)
}

/// Select the target expiry and ATM ± one listed strike.
///
/// `as_of` is the evaluation date in the monitored timezone. Fails with
/// [`EngineError::NoContractsAvailable`] when the chain lists no strikes for
/// the target expiry.
pub fn select_strikes(
    underlying_price: f64,
    chain: &ChainSnapshot,
    as_of: NaiveDate,
) -> Result<OptionStrikeSet> {
    let expiry = next_friday(as_of);
    let strikes = chain
        .strikes_for(expiry)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| EngineError::NoContractsAvailable {
            underlying: chain.underlying.clone(),
            expiry,
        })?;

    // strikes are sorted ascending; strict < keeps the lower strike on ties
    let mut atm_idx = 0;
    let mut best = f64::INFINITY;
    for (i, &strike) in strikes.iter().enumerate() {
        let dist = (strike - underlying_price).abs();
        if dist < best {
            best = dist;
            atm_idx = i;
        }
    }

    Ok(OptionStrikeSet {
        underlying: chain.underlying.clone(),
        expiry,
        atm: strikes[atm_idx],
        below: atm_idx.checked_sub(1).map(|i| strikes[i]),
        above: strikes.get(atm_idx + 1).copied(),
    })
}
