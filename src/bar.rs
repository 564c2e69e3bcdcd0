use crate::datetime::DateTime;

/// The resolution a [`Bar`] was sampled at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    Tick,
    Second,
    Minute,
    Hour,
    Day,
}

/// A single OHLCV observation for one instrument at one timestamp, or a tick.
///
/// Zero denotes "missing field" for the OHLC prices: the `low <= open,close
/// <= high` invariant is only checked for bars where all four prices are
/// present.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub instrument: String,
    #[serde(skip)]
    pub datetime: DateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub open_interest: u64,
    pub resolution: Resolution,
    pub interval: u32,
    /// Last traded price, for tick-resolution bars.
    pub last_price: Option<f64>,
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
    pub bid_size: Option<u64>,
    pub ask_size: Option<u64>,
}

impl Bar {
    pub fn new(
        instrument: impl Into<String>,
        datetime: DateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        resolution: Resolution,
        interval: u32,
    ) -> Self {
        let bar = Self {
            instrument: instrument.into(),
            datetime,
            open,
            high,
            low,
            close,
            volume,
            open_interest: 0,
            resolution,
            interval,
            last_price: None,
            bid_price: None,
            ask_price: None,
            bid_size: None,
            ask_size: None,
        };
        bar.check_invariant();
        bar
    }

    /// A single tick observation, as consumed by [`crate::fill::TickFillStrategy`].
    pub fn tick(instrument: impl Into<String>, datetime: DateTime, price: f64, size: u64) -> Self {
        Self {
            instrument: instrument.into(),
            datetime,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: size,
            open_interest: 0,
            resolution: Resolution::Tick,
            interval: 1,
            last_price: Some(price),
            bid_price: None,
            ask_price: None,
            bid_size: None,
            ask_size: None,
        }
    }

    fn check_invariant(&self) {
        if self.open != 0.0 && self.high != 0.0 && self.low != 0.0 && self.close != 0.0 {
            assert!(
                self.low <= self.open
                    && self.low <= self.close
                    && self.low <= self.high
                    && self.open <= self.high
                    && self.close <= self.high,
                "bar invariant violated for {} at {:?}: low={} open={} close={} high={}",
                self.instrument,
                self.datetime,
                self.low,
                self.open,
                self.close,
                self.high
            );
        }
    }
}
