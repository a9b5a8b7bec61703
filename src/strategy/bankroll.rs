//! Martingale bankroll.
//!
//! Tracks the stake progression, cumulative P&L, losing streaks, and
//! drawdown for a stream of settled (prediction, outcome) pairs. The stake
//! is multiplied after every loss and reset to the base bet after every win
//! or whenever the progression would exceed the optional cap.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::types::{Outcome, Prediction, RoundResult, RoundwatchError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankrollConfig {
    /// Stake placed at the start of every progression.
    pub base_bet: f64,
    /// Stake multiplier applied after a loss (2.0 = classic doubling).
    pub multiplier: f64,
    /// Progression is abandoned once the stake would exceed this. `None` = unbounded.
    pub stake_cap: Option<f64>,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            base_bet: 3.0,
            multiplier: 2.0,
            stake_cap: None,
        }
    }
}

impl BankrollConfig {
    pub fn validate(&self) -> Result<(), RoundwatchError> {
        if !self.base_bet.is_finite() || self.base_bet <= 0.0 {
            return Err(RoundwatchError::Config(format!(
                "base_bet must be > 0 (got {})",
                self.base_bet
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier <= 1.0 {
            return Err(RoundwatchError::Config(format!(
                "multiplier must be > 1.0 (got {})",
                self.multiplier
            )));
        }
        if let Some(cap) = self.stake_cap {
            if cap.is_nan() || cap <= self.base_bet {
                return Err(RoundwatchError::Config(format!(
                    "stake_cap must exceed base_bet {} (got {})",
                    self.base_bet, cap
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bankroll
// ---------------------------------------------------------------------------

/// Single-owner staking state. Mutated once per settled wager.
#[derive(Debug, Clone)]
pub struct Bankroll {
    config: BankrollConfig,
    stake: f64,
    profit: f64,
    rounds_bet: u64,
    losing_streak: u32,
    longest_losing_streak: u32,
    max_stake: f64,
    resets: u32,
    peak_profit: f64,
    max_drawdown: f64,
}

impl Bankroll {
    /// Fails when `base_bet <= 0` or `multiplier <= 1.0`.
    pub fn new(config: BankrollConfig) -> Result<Self, RoundwatchError> {
        config.validate()?;
        Ok(Self {
            stake: config.base_bet,
            config,
            profit: 0.0,
            rounds_bet: 0,
            losing_streak: 0,
            longest_losing_streak: 0,
            max_stake: 0.0,
            resets: 0,
            peak_profit: 0.0,
            max_drawdown: 0.0,
        })
    }

    /// Settle one round. `NoBet` leaves every field untouched.
    pub fn on_round(&mut self, prediction: Prediction, actual: Outcome) -> RoundResult {
        let Some(picked) = prediction.symbol() else {
            return RoundResult::NoBet;
        };

        let staked = self.stake;
        let result = if picked == actual {
            self.profit += staked;
            self.losing_streak = 0;
            self.stake = self.config.base_bet;
            RoundResult::Win
        } else {
            self.profit -= staked;
            self.losing_streak += 1;
            self.longest_losing_streak = self.longest_losing_streak.max(self.losing_streak);
            // Saturate so an uncapped streak never reaches infinity.
            self.stake = (staked * self.config.multiplier).min(f64::MAX);

            if let Some(cap) = self.config.stake_cap {
                if self.stake > cap {
                    warn!(
                        would_be = self.stake,
                        cap,
                        streak = self.losing_streak,
                        "Stake cap exceeded, progression reset"
                    );
                    self.stake = self.config.base_bet;
                    self.resets += 1;
                }
            }
            RoundResult::Lose
        };

        self.peak_profit = self.peak_profit.max(self.profit);
        self.max_drawdown = self.max_drawdown.max(self.peak_profit - self.profit);
        self.max_stake = self.max_stake.max(self.stake);
        self.rounds_bet += 1;

        debug!(
            result = %result,
            staked,
            profit = self.profit,
            next_stake = self.stake,
            streak = self.losing_streak,
            "Bankroll updated"
        );

        result
    }

    // -- Accessors --------------------------------------------------------

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn profit(&self) -> f64 {
        self.profit
    }

    pub fn rounds_bet(&self) -> u64 {
        self.rounds_bet
    }

    pub fn losing_streak(&self) -> u32 {
        self.losing_streak
    }

    pub fn longest_losing_streak(&self) -> u32 {
        self.longest_losing_streak
    }

    pub fn max_stake(&self) -> f64 {
        self.max_stake
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn peak_profit(&self) -> f64 {
        self.peak_profit
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }

    /// Profit over the approximate capital risked (`rounds_bet * base_bet`).
    pub fn roi(&self) -> f64 {
        if self.rounds_bet == 0 {
            0.0
        } else {
            self.profit / (self.rounds_bet as f64 * self.config.base_bet)
        }
    }

    /// Minimum bankroll that survives the worst observed losing streak uncapped.
    pub fn required_capital(&self) -> f64 {
        let streak = self.longest_losing_streak.max(1);
        required_capital(self.config.base_bet, self.config.multiplier, streak)
    }

    pub fn summary(&self) -> BankrollSummary {
        BankrollSummary {
            profit: self.profit,
            roi: self.roi(),
            rounds_bet: self.rounds_bet,
            longest_losing_streak: self.longest_losing_streak,
            max_stake: self.max_stake,
            max_drawdown: self.max_drawdown,
            resets: self.resets,
            next_stake: self.stake,
            required_capital: self.required_capital(),
        }
    }
}

/// Sum of a geometric stake progression over `losses` consecutive losses.
pub fn required_capital(base_bet: f64, multiplier: f64, losses: u32) -> f64 {
    if multiplier == 1.0 {
        return base_bet * losses as f64;
    }
    base_bet * (multiplier.powi(losses as i32) - 1.0) / (multiplier - 1.0)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollSummary {
    pub profit: f64,
    pub roi: f64,
    pub rounds_bet: u64,
    pub longest_losing_streak: u32,
    pub max_stake: f64,
    pub max_drawdown: f64,
    pub resets: u32,
    pub next_stake: f64,
    pub required_capital: f64,
}

impl fmt::Display for BankrollSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PnL={:.2} | ROI={:.2}% | roundsBet={} | longestL={} | maxStake={:.2} | MDD={:.2} | resets={} | nextStake={:.2} | requiredCapital={:.2}",
            self.profit,
            self.roi * 100.0,
            self.rounds_bet,
            self.longest_losing_streak,
            self.max_stake,
            self.max_drawdown,
            self.resets,
            self.next_stake,
            self.required_capital,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Symbol;

    fn bankroll(cap: Option<f64>) -> Bankroll {
        Bankroll::new(BankrollConfig {
            base_bet: 3.0,
            multiplier: 2.0,
            stake_cap: cap,
        })
        .unwrap()
    }

    fn lose(b: &mut Bankroll) -> RoundResult {
        b.on_round(Prediction::PickA, Symbol::B)
    }

    fn win(b: &mut Bankroll) -> RoundResult {
        b.on_round(Prediction::PickA, Symbol::A)
    }

    // -- Construction ----------------------------------------------------

    #[test]
    fn test_rejects_non_positive_base_bet() {
        let cfg = BankrollConfig { base_bet: 0.0, ..Default::default() };
        assert!(matches!(Bankroll::new(cfg), Err(RoundwatchError::Config(_))));
        let cfg = BankrollConfig { base_bet: -1.0, ..Default::default() };
        assert!(Bankroll::new(cfg).is_err());
    }

    #[test]
    fn test_rejects_multiplier_at_or_below_one() {
        let cfg = BankrollConfig { multiplier: 1.0, ..Default::default() };
        assert!(Bankroll::new(cfg).is_err());
        let cfg = BankrollConfig { multiplier: 0.5, ..Default::default() };
        assert!(Bankroll::new(cfg).is_err());
    }

    #[test]
    fn test_rejects_cap_not_above_base_bet() {
        for cap in [f64::NAN, -1.0, 0.0, 2.0, 3.0] {
            let cfg = BankrollConfig { stake_cap: Some(cap), ..Default::default() };
            assert!(
                matches!(Bankroll::new(cfg), Err(RoundwatchError::Config(_))),
                "cap {cap} accepted"
            );
        }
        let cfg = BankrollConfig { stake_cap: Some(3.5), ..Default::default() };
        assert!(Bankroll::new(cfg).is_ok());
    }

    #[test]
    fn test_fresh_state() {
        let b = bankroll(None);
        assert_eq!(b.stake(), 3.0);
        assert_eq!(b.profit(), 0.0);
        assert_eq!(b.rounds_bet(), 0);
        assert_eq!(b.roi(), 0.0);
        assert_eq!(b.max_drawdown(), 0.0);
    }

    // -- Progression -----------------------------------------------------

    #[test]
    fn test_losses_double_the_stake() {
        let mut b = bankroll(None);
        let mut stakes = vec![b.stake()];
        for _ in 0..4 {
            assert_eq!(lose(&mut b), RoundResult::Lose);
            stakes.push(b.stake());
        }
        assert_eq!(stakes, vec![3.0, 6.0, 12.0, 24.0, 48.0]);
        assert_eq!(b.profit(), -(3.0 + 6.0 + 12.0 + 24.0));
        assert_eq!(b.losing_streak(), 4);
        assert_eq!(b.longest_losing_streak(), 4);
    }

    #[test]
    fn test_win_resets_stake_and_streak() {
        let mut b = bankroll(None);
        lose(&mut b);
        lose(&mut b);
        assert_eq!(b.stake(), 12.0);
        assert_eq!(win(&mut b), RoundResult::Win);
        assert_eq!(b.stake(), 3.0);
        assert_eq!(b.losing_streak(), 0);
        assert_eq!(b.longest_losing_streak(), 2);
        // -3 -6 +12
        assert_eq!(b.profit(), 3.0);
    }

    #[test]
    fn test_pick_b_wins_on_b() {
        let mut b = bankroll(None);
        assert_eq!(b.on_round(Prediction::PickB, Symbol::B), RoundResult::Win);
        assert_eq!(b.on_round(Prediction::PickB, Symbol::A), RoundResult::Lose);
        assert_eq!(b.profit(), 0.0);
        assert_eq!(b.stake(), 6.0);
    }

    #[test]
    fn test_cap_resets_instead_of_clamping() {
        let mut b = bankroll(Some(20.0));
        lose(&mut b);
        lose(&mut b);
        assert_eq!(b.stake(), 12.0);
        assert_eq!(b.resets(), 0);
        // 12 * 2 = 24 > 20 -> back to base, not 20
        lose(&mut b);
        assert_eq!(b.stake(), 3.0);
        assert_eq!(b.resets(), 1);
        assert_eq!(b.losing_streak(), 3);
        assert_eq!(b.max_stake(), 12.0);
    }

    #[test]
    fn test_uncapped_streak_stays_finite() {
        let mut b = bankroll(None);
        for _ in 0..1100 {
            lose(&mut b);
        }
        assert!(b.stake().is_finite());
        assert_eq!(b.stake(), f64::MAX);
        assert!(b.max_stake().is_finite());

        win(&mut b);
        assert_eq!(b.stake(), 3.0);
        assert!(!b.profit().is_nan());
    }

    #[test]
    fn test_no_bet_changes_nothing() {
        let mut b = bankroll(None);
        lose(&mut b);
        let before = b.summary();
        assert_eq!(b.on_round(Prediction::NoBet, Symbol::A), RoundResult::NoBet);
        assert_eq!(b.on_round(Prediction::NoBet, Symbol::B), RoundResult::NoBet);
        assert_eq!(b.summary(), before);
        assert_eq!(b.losing_streak(), 1);
    }

    // -- Risk metrics ----------------------------------------------------

    #[test]
    fn test_drawdown_tracks_peak() {
        let mut b = bankroll(None);
        win(&mut b); // +3, peak 3
        win(&mut b); // +6, peak 6
        lose(&mut b); // 3
        lose(&mut b); // -3
        assert_eq!(b.peak_profit(), 6.0);
        assert_eq!(b.max_drawdown(), 9.0);
        win(&mut b); // -3 + 12 = 9
        assert_eq!(b.peak_profit(), 9.0);
        assert_eq!(b.max_drawdown(), 9.0);
        assert!(b.max_drawdown() >= 0.0);
    }

    #[test]
    fn test_roi() {
        let mut b = bankroll(None);
        win(&mut b);
        lose(&mut b);
        win(&mut b);
        // +3 -3 +6 = 6 over 3 * 3.0
        assert!((b.roi() - 6.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_required_capital_formula() {
        assert_eq!(required_capital(3.0, 2.0, 3), 21.0);
        assert_eq!(required_capital(3.0, 1.0, 4), 12.0);
        assert_eq!(required_capital(1.0, 3.0, 2), 4.0);
    }

    #[test]
    fn test_required_capital_uses_at_least_one_loss() {
        let mut b = bankroll(None);
        assert_eq!(b.required_capital(), 3.0);
        lose(&mut b);
        lose(&mut b);
        lose(&mut b);
        assert_eq!(b.required_capital(), 21.0);
    }

    #[test]
    fn test_summary_display() {
        let mut b = bankroll(None);
        lose(&mut b);
        let text = b.summary().to_string();
        assert!(text.contains("PnL=-3.00"));
        assert!(text.contains("nextStake=6.00"));
        assert!(text.contains("longestL=1"));
    }
}
