use chrono::NaiveDate;

use crate::datetime::DateTime;

/// Sharpe ratio over a fixed number of trading periods per annum (the
/// "daily returns" mode, the original's default).
fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, trading_periods: f64, annualized: bool) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let sq_sum: f64 = returns.iter().map(|r| r * r).sum();
    let stdev = (sq_sum / n - mean * mean).sqrt();

    if stdev == 0.0 {
        return 0.0;
    }

    let rf_per_return = risk_free_rate / trading_periods;
    let avg_excess_returns = mean - rf_per_return;
    let mut ret = avg_excess_returns / stdev;
    if annualized {
        ret *= trading_periods.sqrt();
    }
    ret
}

/// Sharpe ratio computed directly over the elapsed calendar span, used in
/// "per-bar" mode where returns aren't bucketed by day.
///
/// Uses 365 (not 252) so that a full calendar year maps to a `yearsTraded`
/// of 1.0, matching the original's comment.
fn sharpe_ratio2(
    returns: &[f64],
    risk_free_rate: f64,
    first: DateTime,
    last: DateTime,
    annualized: bool,
) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let sq_sum: f64 = returns.iter().map(|r| r * r).sum();
    let stdev = (sq_sum / n - mean * mean).sqrt();

    if stdev == 0.0 {
        return 0.0;
    }

    let years_traded = (last.days_since(&first) + 1) as f64 / 365.0;
    let risk_free_rate_for_period = risk_free_rate * years_traded;
    let rf_per_return = risk_free_rate_for_period / n;
    let avg_excess_returns = mean - rf_per_return;
    let mut ret = avg_excess_returns / stdev;
    if annualized {
        ret *= (n / years_traded).sqrt();
    }
    ret
}

/// Accumulates per-bar net returns into a Sharpe ratio, in either daily or
/// per-bar mode.
///
/// In daily mode the original chains same-day returns by updating
/// `m_returns.front()` instead of the most-recently-pushed entry — a bug,
/// since every subsequent same-day bar would overwrite the *first* day's
/// return instead of the current one. This implementation updates the last
/// pushed day's return instead, matching the chaining behavior the daily
/// mode is meant to provide.
pub struct Sharpe {
    use_daily_returns: bool,
    returns: Vec<f64>,
    current_date: Option<NaiveDate>,
    first_datetime: DateTime,
    last_datetime: DateTime,
}

const TRADING_PERIODS_PER_YEAR: f64 = 252.0;

impl Sharpe {
    pub fn new(use_daily_returns: bool) -> Self {
        Self {
            use_daily_returns,
            returns: Vec::new(),
            current_date: None,
            first_datetime: DateTime::INVALID,
            last_datetime: DateTime::INVALID,
        }
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn on_returns(&mut self, datetime: DateTime, net_return: f64) {
        if self.use_daily_returns {
            let date = datetime.date();
            if self.current_date == Some(date) {
                let last = self.returns.last_mut().expect("current_date implies a prior push");
                *last = (1.0 + *last) * (1.0 + net_return) - 1.0;
            } else {
                self.current_date = Some(date);
                self.returns.push(net_return);
            }
        } else {
            self.returns.push(net_return);
            if !self.first_datetime.is_valid() {
                self.first_datetime = datetime;
            }
            self.last_datetime = datetime;
        }
    }

    pub fn sharpe_ratio(&self, risk_free_rate: f64, annualized: bool) -> f64 {
        if self.use_daily_returns {
            sharpe_ratio(&self.returns, risk_free_rate, TRADING_PERIODS_PER_YEAR, annualized)
        } else {
            sharpe_ratio2(
                &self.returns,
                risk_free_rate,
                self.first_datetime,
                self.last_datetime,
                annualized,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_volatility_yields_zero_sharpe() {
        let mut sharpe = Sharpe::new(true);
        let d1 = DateTime::from_ymd_hms(2024, 1, 1, 0, 0, 0);
        let d2 = DateTime::from_ymd_hms(2024, 1, 2, 0, 0, 0);
        sharpe.on_returns(d1, 0.01);
        sharpe.on_returns(d2, 0.01);
        assert_eq!(sharpe.sharpe_ratio(0.0, true), 0.0);
    }

    #[test]
    fn same_day_bars_chain_into_one_daily_return() {
        let mut sharpe = Sharpe::new(true);
        let morning = DateTime::from_ymd_hms(2024, 1, 1, 9, 30, 0);
        let afternoon = DateTime::from_ymd_hms(2024, 1, 1, 15, 0, 0);
        sharpe.on_returns(morning, 0.01);
        sharpe.on_returns(afternoon, 0.02);
        assert_eq!(sharpe.returns().len(), 1);
        let expected = (1.01_f64) * 1.02 - 1.0;
        assert!((sharpe.returns()[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn positive_returns_yield_positive_sharpe() {
        let mut sharpe = Sharpe::new(true);
        for (day, ret) in [(1, 0.01), (2, -0.005), (3, 0.02), (4, 0.005)] {
            sharpe.on_returns(DateTime::from_ymd_hms(2024, 1, day, 0, 0, 0), ret);
        }
        assert!(sharpe.sharpe_ratio(0.0, true) > 0.0);
    }
}
