/// A single instrument's position bookkeeping: long and short shares are
/// tracked separately (mirroring the original's `BrokerPos`, which never
/// nets a short against a long directly — `SellShort` then `Buy` are two
/// independent lots), each with its own share-weighted average price.
#[derive(Clone, Debug, Default)]
pub struct Position {
    pub long_shares: f64,
    pub short_shares: f64,
    pub long_avg_price: f64,
    pub short_avg_price: f64,
    pub last_price: f64,
}

impl Position {
    pub fn shares(&self) -> f64 {
        self.long_shares - self.short_shares
    }

    pub fn mark(&mut self, price: f64) {
        self.last_price = price;
    }

    pub fn apply_buy(&mut self, quantity: f64, price: f64) {
        let cost = self.long_avg_price * self.long_shares + price * quantity;
        self.long_shares += quantity;
        self.long_avg_price = cost / self.long_shares;
    }

    /// Reduces (or closes) the long position. Returns the realized P&L.
    ///
    /// # Panics
    /// Panics if `quantity` exceeds the long position held, mirroring the
    /// original's `ASSERT(false, "Quantity must be less than long position
    /// size")`.
    pub fn apply_sell(&mut self, quantity: f64, price: f64, multiplier: f64) -> f64 {
        assert!(
            quantity <= self.long_shares + 1e-7,
            "sell quantity {} exceeds long position {}",
            quantity,
            self.long_shares
        );
        let pnl = (price - self.long_avg_price) * quantity * multiplier;
        self.long_shares -= quantity;
        if self.long_shares.abs() < 1e-7 {
            self.long_shares = 0.0;
            self.long_avg_price = 0.0;
        }
        pnl
    }

    pub fn apply_sell_short(&mut self, quantity: f64, price: f64) {
        let cost = self.short_avg_price * self.short_shares + price * quantity;
        self.short_shares += quantity;
        self.short_avg_price = cost / self.short_shares;
    }

    /// Reduces (or closes) the short position. Returns the realized P&L.
    pub fn apply_cover(&mut self, quantity: f64, price: f64, multiplier: f64) -> f64 {
        assert!(
            quantity <= self.short_shares + 1e-7,
            "cover quantity {} exceeds short position {}",
            quantity,
            self.short_shares
        );
        let pnl = (self.short_avg_price - price) * quantity * multiplier;
        self.short_shares -= quantity;
        if self.short_shares.abs() < 1e-7 {
            self.short_shares = 0.0;
            self.short_avg_price = 0.0;
        }
        pnl
    }
}
