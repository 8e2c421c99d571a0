//! Engine configuration
//!
//! Env-driven, with the same defaults the desk has always run with. Changing
//! configuration never touches persisted extrema or ledger state.

use crate::hygiene::QuietHours;
use crate::indicators::IndicatorConfig;
use crate::rules::{
    AlertRule, Direction, ExtremaSide, InstrumentPattern, PercentReference, RuleCondition,
    Severity, TradeAction,
};
use anyhow::Context;
use chrono::Duration;
use chrono_tz::Tz;
use dotenv::dotenv;

/// Engine configuration surface.
#[derive(Debug, Clone)]
pub struct Config {
    /// Equity tickers to watch
    pub watchlist: Vec<String>,
    /// Underlyings whose option chains are watched (NVDA-only by default)
    pub options_watchlist: Vec<String>,
    /// Stock polling interval, seconds
    pub poll_seconds: u64,
    /// Option-chain polling interval, seconds (never faster than 30s)
    pub options_poll_seconds: u64,
    /// Monitored timezone for quiet hours
    pub timezone: Tz,
    /// Quiet-hours window, "HH:MM-HH:MM"
    pub quiet_hours: String,
    /// Default per-rule cooldown
    pub cooldown: Duration,
    /// Dedupe coalescing window
    pub dedupe_window: Duration,
    pub indicators: IndicatorConfig,
    /// Fixed paper-trade position size
    pub unit_size: f64,
    pub starting_equity: f64,
    /// Per-instrument sample channel capacity
    pub channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watchlist: split_list("NVDA,QUBT,PLTR,LMT,JPM,AAPL"),
            options_watchlist: split_list("NVDA"),
            poll_seconds: 30,
            options_poll_seconds: 30,
            timezone: chrono_tz::America::Los_Angeles,
            quiet_hours: "23:00-07:00".to_string(),
            cooldown: Duration::minutes(30),
            dedupe_window: Duration::seconds(10),
            indicators: IndicatorConfig::default(),
            unit_size: 1.0,
            starting_equity: 500.0,
            channel_capacity: 64,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv().ok();
        let defaults = Config::default();

        let poll_seconds = env_or("POLL_SECONDS", defaults.poll_seconds)?;
        Ok(Config {
            watchlist: std::env::var("WATCHLIST")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.watchlist),
            options_watchlist: std::env::var("OPTIONS_SYMBOLS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.options_watchlist),
            poll_seconds,
            options_poll_seconds: env_or("OPTIONS_POLL_SECONDS", poll_seconds)?.max(30),
            timezone: std::env::var("TIMEZONE")
                .unwrap_or_else(|_| defaults.timezone.to_string())
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("bad TIMEZONE: {e}"))?,
            quiet_hours: std::env::var("QUIET_HOURS").unwrap_or(defaults.quiet_hours),
            cooldown: Duration::minutes(env_or("ALERT_COOLDOWN_MIN", 30)?),
            dedupe_window: Duration::seconds(env_or("DEDUPE_SECONDS", 10)?),
            indicators: IndicatorConfig {
                sma_fast: env_or("SMA_FAST", defaults.indicators.sma_fast)?,
                sma_slow: env_or("SMA_SLOW", defaults.indicators.sma_slow)?,
                rsi_period: env_or("RSI_PERIOD", defaults.indicators.rsi_period)?,
            },
            unit_size: env_or("PAPER_UNIT_SIZE", defaults.unit_size)?,
            starting_equity: env_or("PAPER_STARTING_EQUITY", defaults.starting_equity)?,
            channel_capacity: defaults.channel_capacity,
        })
    }

    /// Parsed quiet-hours window in the monitored timezone.
    pub fn quiet_hours_window(&self) -> crate::error::Result<QuietHours> {
        QuietHours::parse(&self.quiet_hours, self.timezone)
    }

    /// The desk's standing rule set: trend crossovers drive the paper
    /// trader, percent moves and fresh extrema page the desk. Extrema alerts
    /// are exempt from quiet hours.
    pub fn default_rules(&self) -> Vec<AlertRule> {
        use crate::indicators::Crossover;
        vec![
            AlertRule::new(
                "golden-cross",
                InstrumentPattern::Any,
                RuleCondition::IndicatorCrossover {
                    crossover: Crossover::Golden,
                },
            )
            .with_cooldown(self.cooldown)
            .with_action(TradeAction::Enter),
            AlertRule::new(
                "death-cross",
                InstrumentPattern::Any,
                RuleCondition::IndicatorCrossover {
                    crossover: Crossover::Death,
                },
            )
            .with_cooldown(self.cooldown)
            .with_action(TradeAction::Exit),
            AlertRule::new(
                "pct-move-2",
                InstrumentPattern::Any,
                RuleCondition::PercentMove {
                    reference: PercentReference::SessionOpen,
                    magnitude_pct: 2.0,
                },
            )
            .with_cooldown(self.cooldown)
            .with_severity(Severity::Warning),
            AlertRule::new(
                "all-time-high",
                InstrumentPattern::Any,
                RuleCondition::NewExtremum {
                    side: Some(ExtremaSide::High),
                },
            )
            .with_cooldown(self.cooldown)
            .with_severity(Severity::Warning)
            .exempt_from_quiet_hours(),
            AlertRule::new(
                "all-time-low",
                InstrumentPattern::Any,
                RuleCondition::NewExtremum {
                    side: Some(ExtremaSide::Low),
                },
            )
            .with_cooldown(self.cooldown)
            .with_severity(Severity::Warning)
            .exempt_from_quiet_hours(),
        ]
    }

    /// A per-ticker threshold rule, for ad-hoc price-level watches.
    pub fn threshold_rule(
        &self,
        symbol: &str,
        level: f64,
        direction: Direction,
    ) -> AlertRule {
        AlertRule::new(
            format!("threshold-{}-{:.2}", symbol.to_lowercase(), level),
            InstrumentPattern::Symbol(symbol.to_string()),
            RuleCondition::ThresholdCross { level, direction },
        )
        .with_cooldown(self.cooldown)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("bad {key}={raw}: {e}"))
            .context("config"),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_desk() {
        let cfg = Config::default();
        assert_eq!(cfg.watchlist[0], "NVDA");
        assert_eq!(cfg.options_watchlist, vec!["NVDA".to_string()]);
        assert_eq!(cfg.poll_seconds, 30);
        assert_eq!(cfg.quiet_hours, "23:00-07:00");
        assert!(cfg.quiet_hours_window().is_ok());
    }

    #[test]
    fn default_rules_cover_all_condition_kinds() {
        let cfg = Config::default();
        let rules = cfg.default_rules();
        assert!(rules.iter().any(|r| matches!(
            r.condition,
            RuleCondition::IndicatorCrossover { .. }
        )));
        assert!(rules
            .iter()
            .any(|r| matches!(r.condition, RuleCondition::PercentMove { .. })));
        assert!(rules
            .iter()
            .any(|r| matches!(r.condition, RuleCondition::NewExtremum { .. })));
        let threshold = cfg.threshold_rule("NVDA", 180.0, Direction::Up);
        assert!(matches!(
            threshold.condition,
            RuleCondition::ThresholdCross { .. }
        ));
    }

    #[test]
    fn list_splitting_normalizes() {
        assert_eq!(split_list("nvda, aapl ,"), vec!["NVDA", "AAPL"]);
    }
}
