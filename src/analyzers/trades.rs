use std::collections::HashMap;

use chrono::NaiveDate;

use super::position_tracker::{ClosePosTrade, PositionTracker};
use crate::datetime::DateTime;
use crate::order::Action;

/// One closed trade's realized profit (or, in the returns array, a bar's
/// running equity contribution).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TradeProfit {
    pub datetime: DateTime,
    pub value: f64,
}

/// Per-trading-day rollup, driven by `NewTradingDay`: not present in the
/// original's public API beyond the `m_allDailyMetrics` vector it
/// maintains, so the shape here is inferred from `updateDailyMetrics`'s
/// usage (current equity, today's realized P&L, and today's trade count).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub equity: f64,
    pub realized_pnl_today: f64,
    pub trades_today: u32,
}

/// Records the profit/loss and return of every completed round-trip trade.
///
/// Operates on individual closed trades, not on the whole portfolio: buying
/// 1 share at $10 and selling it at $20 is a single trade with a $10 profit
/// and a 100% return, independent of how the rest of the portfolio moved.
#[derive(Default)]
pub struct Trades {
    trackers: HashMap<String, PositionTracker>,

    all: Vec<TradeProfit>,
    profits: Vec<TradeProfit>,
    losses: Vec<f64>,
    all_returns: Vec<f64>,
    positive_returns: Vec<f64>,
    negative_returns: Vec<f64>,
    even_trades: u32,

    total_net_profits: f64,
    total_trade_cost: f64,
    closed_transactions: Vec<ClosePosTrade>,

    daily_metrics: Vec<DailyMetrics>,
    realized_pnl_today: f64,
    trades_today: u32,
    last_trading_date: Option<NaiveDate>,
}

impl Trades {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.all.len()
    }

    pub fn profitable_count(&self) -> usize {
        self.profits.len()
    }

    pub fn unprofitable_count(&self) -> usize {
        self.losses.len()
    }

    pub fn even_count(&self) -> u32 {
        self.even_trades
    }

    pub fn total_net_profits(&self) -> f64 {
        self.total_net_profits
    }

    pub fn total_trade_cost(&self) -> f64 {
        self.total_trade_cost
    }

    pub fn all(&self) -> &[TradeProfit] {
        &self.all
    }

    pub fn profits(&self) -> &[TradeProfit] {
        &self.profits
    }

    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    pub fn all_returns(&self) -> &[f64] {
        &self.all_returns
    }

    pub fn daily_metrics(&self) -> &[DailyMetrics] {
        &self.daily_metrics
    }

    pub fn closed_transactions(&self) -> &[ClosePosTrade] {
        &self.closed_transactions
    }

    /// Feeds a single execution into the per-instrument position tracker.
    /// When the position returns to flat, snapshots the closed trade and
    /// buckets it into profitable/unprofitable/even.
    pub fn record_fill(
        &mut self,
        datetime: DateTime,
        instrument: &str,
        action: Action,
        price: f64,
        quantity: f64,
        commission: f64,
        slippage: f64,
    ) {
        let tracker = self
            .trackers
            .entry(instrument.to_string())
            .or_insert_with(|| PositionTracker::new(instrument));

        match action {
            Action::Buy => tracker.buy(datetime, quantity, price, commission, slippage),
            Action::Sell => tracker.sell(datetime, quantity, price, commission, slippage),
            Action::SellShort => {
                tracker.sell_short(datetime, quantity, price, commission, slippage)
            }
            Action::BuyToCover => tracker.cover(datetime, quantity, price, commission, slippage),
        }

        if tracker.shares() != 0.0 {
            return;
        }

        let closed = tracker.take_close_pos_trade();
        let profit = closed.realized_profit;
        let ret = tracker.last_return();
        let cost = closed.commissions + closed.slippages;

        self.all.push(TradeProfit {
            datetime,
            value: profit,
        });
        self.all_returns.push(ret);
        if profit > 0.0 {
            self.profits.push(TradeProfit {
                datetime,
                value: profit,
            });
            self.positive_returns.push(ret);
        } else if profit < 0.0 {
            self.losses.push(profit);
            self.negative_returns.push(ret);
        } else {
            self.even_trades += 1;
        }

        self.total_net_profits += profit;
        self.total_trade_cost += cost;
        self.realized_pnl_today += profit;
        self.trades_today += 1;
        self.closed_transactions.push(closed);
    }

    /// Rolls up the day that just ended into a [`DailyMetrics`] entry and
    /// resets the day's counters.
    pub fn on_new_trading_day(&mut self, datetime: DateTime, equity: f64) {
        if let Some(date) = self.last_trading_date {
            self.daily_metrics.push(DailyMetrics {
                date,
                equity,
                realized_pnl_today: self.realized_pnl_today,
                trades_today: self.trades_today,
            });
        }
        self.last_trading_date = Some(datetime.date());
        self.realized_pnl_today = 0.0;
        self.trades_today = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_recorded_as_one_trade() {
        let mut trades = Trades::new();
        let dt = DateTime::from_ymd_hms(2024, 1, 1, 0, 0, 0);
        trades.record_fill(dt, "AAPL", Action::Buy, 10.0, 1.0, 0.0, 0.0);
        assert_eq!(trades.count(), 0);
        trades.record_fill(dt, "AAPL", Action::Sell, 20.0, 1.0, 0.0, 0.0);
        assert_eq!(trades.count(), 1);
        assert_eq!(trades.profitable_count(), 1);
        assert!((trades.total_net_profits() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn daily_metrics_roll_up_once_per_day() {
        let mut trades = Trades::new();
        let d1 = DateTime::from_ymd_hms(2024, 1, 1, 0, 0, 0);
        let d2 = DateTime::from_ymd_hms(2024, 1, 2, 0, 0, 0);
        trades.record_fill(d1, "AAPL", Action::Buy, 10.0, 1.0, 0.0, 0.0);
        trades.record_fill(d1, "AAPL", Action::Sell, 12.0, 1.0, 0.0, 0.0);
        trades.on_new_trading_day(d2, 10_012.0);
        assert_eq!(trades.daily_metrics().len(), 1);
        assert_eq!(trades.daily_metrics()[0].trades_today, 1);
    }
}
