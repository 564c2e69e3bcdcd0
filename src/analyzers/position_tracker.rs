use crate::datetime::DateTime;
use crate::order::Action;

/// One buy/sell/short/cover event recorded against a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TradingRecord {
    pub datetime: DateTime,
    pub action: Action,
    pub price: f64,
    pub quantity: f64,
}

/// A snapshot taken whenever a position returns to flat: the full round
/// trip's cost and P&L, plus every trade that contributed to it.
#[derive(Clone, Debug)]
pub struct ClosePosTrade {
    pub instrument: String,
    pub trade_num: usize,
    pub traded_volume: f64,
    pub close_volume: f64,
    pub realized_profit: f64,
    pub commissions: f64,
    pub slippages: f64,
    pub trades: Vec<TradingRecord>,
}

/// Tracks one instrument's position to compute net profit and return,
/// ported near-verbatim from the original `PositionTracker`: long and short
/// exposure are tracked independently with a share-weighted average price
/// per side.
pub struct PositionTracker {
    instrument: String,
    long_pos: f64,
    short_pos: f64,
    long_avg_price: f64,
    short_avg_price: f64,
    multiplier: f64,
    commissions: f64,
    slippages: f64,
    last_net_profit: f64,
    last_return: f64,
    cum_traded_shares: f64,
    curr_pos_traded_volume: f64,
    all_trades: Vec<TradingRecord>,
    curr_active_pos_trades: Vec<TradingRecord>,
}

impl PositionTracker {
    pub fn new(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            long_pos: 0.0,
            short_pos: 0.0,
            long_avg_price: 0.0,
            short_avg_price: 0.0,
            multiplier: 1.0,
            commissions: 0.0,
            slippages: 0.0,
            last_net_profit: 0.0,
            last_return: 0.0,
            cum_traded_shares: 0.0,
            curr_pos_traded_volume: 0.0,
            all_trades: Vec::new(),
            curr_active_pos_trades: Vec::new(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn set_multiplier(&mut self, multiplier: f64) {
        assert!(multiplier > 0.0, "multiplier must be greater than 0");
        self.multiplier = multiplier;
    }

    pub fn shares(&self) -> f64 {
        self.long_pos - self.short_pos
    }

    pub fn cum_traded_shares(&self) -> f64 {
        self.cum_traded_shares
    }

    pub fn net_profit(&self) -> f64 {
        self.last_net_profit
    }

    pub fn last_return(&self) -> f64 {
        self.last_return
    }

    fn record(&mut self, datetime: DateTime, action: Action, price: f64, quantity: f64) {
        let record = TradingRecord {
            datetime,
            action,
            price,
            quantity,
        };
        self.all_trades.push(record);
        self.curr_active_pos_trades.push(record);
        self.curr_pos_traded_volume += quantity;
    }

    pub fn buy(
        &mut self,
        datetime: DateTime,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) {
        assert!(quantity > 0.0, "quantity must be greater than 0");
        let cost = self.long_avg_price * self.long_pos + price * quantity;
        self.long_pos += quantity;
        self.long_avg_price = cost / self.long_pos;
        self.cum_traded_shares += quantity;
        self.commissions += commission;
        self.slippages += slippage;
        self.record(datetime, Action::Buy, price, quantity);
    }

    pub fn sell(
        &mut self,
        datetime: DateTime,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) {
        assert!(quantity > 0.0, "quantity must be greater than 0");
        assert!(
            quantity <= self.long_pos + 1e-7,
            "quantity must be less than long position size"
        );

        self.last_net_profit = (price - self.long_avg_price) * quantity * self.multiplier;
        self.last_return =
            self.last_net_profit / (self.long_avg_price * quantity * self.multiplier);

        self.long_pos -= quantity;
        if self.long_pos.abs() < 1e-7 {
            self.long_pos = 0.0;
            self.long_avg_price = 0.0;
        }

        self.cum_traded_shares += quantity;
        self.commissions += commission;
        self.slippages += slippage;
        self.record(datetime, Action::Sell, price, quantity);
    }

    pub fn sell_short(
        &mut self,
        datetime: DateTime,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) {
        assert!(quantity > 0.0, "quantity must be greater than 0");
        let cost = self.short_avg_price * self.short_pos + price * quantity;
        self.short_pos += quantity;
        self.short_avg_price = cost / self.short_pos;
        self.cum_traded_shares += quantity;
        self.commissions += commission;
        self.slippages += slippage;
        self.record(datetime, Action::SellShort, price, quantity);
    }

    pub fn cover(
        &mut self,
        datetime: DateTime,
        quantity: f64,
        price: f64,
        commission: f64,
        slippage: f64,
    ) {
        assert!(quantity > 0.0, "quantity must be greater than 0");
        assert!(
            quantity <= self.short_pos + 1e-7,
            "quantity must be less than short position size"
        );

        self.last_net_profit = (self.short_avg_price - price) * quantity * self.multiplier;
        self.last_return =
            self.last_net_profit / (self.short_avg_price * quantity * self.multiplier);

        self.short_pos -= quantity;
        if self.short_pos.abs() < 1e-7 {
            self.short_pos = 0.0;
            self.short_avg_price = 0.0;
        }

        self.cum_traded_shares += quantity;
        self.commissions += commission;
        self.slippages += slippage;
        self.record(datetime, Action::BuyToCover, price, quantity);
    }

    /// Snapshots the trades accumulated since the position was last flat and
    /// clears them, matching the original's behavior of resetting
    /// `m_currActivePosTrades` once `getShares() == 0`.
    pub fn take_close_pos_trade(&mut self) -> ClosePosTrade {
        let trade = ClosePosTrade {
            instrument: self.instrument.clone(),
            trade_num: self.curr_active_pos_trades.len(),
            traded_volume: self.curr_pos_traded_volume,
            close_volume: self.curr_pos_traded_volume / 2.0,
            realized_profit: self.last_net_profit,
            commissions: self.commissions,
            slippages: self.slippages,
            trades: std::mem::take(&mut self.curr_active_pos_trades),
        };
        self.curr_pos_traded_volume = 0.0;
        self.commissions = 0.0;
        self.slippages = 0.0;
        trade
    }
}
