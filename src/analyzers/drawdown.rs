use crate::datetime::DateTime;

/// Tracks maximum drawdown and longest drawdown duration over a series of
/// equity observations, ported from `DrawDownCalculator`.
///
/// The longest-duration tie-break uses `>=` in both the "new high" and
/// "new low" branches, matching the original's documented quirk ("Must use
/// 'greater than or equal to' here"): a drawdown that exactly repeats the
/// longest-so-far duration replaces it, so the reported longest drawdown is
/// always the *most recent* one among ties, not the first.
pub struct DrawdownCalculator {
    initialized: bool,
    high_watermark: f64,
    low_watermark: f64,
    high_datetime: DateTime,
    last_datetime: DateTime,

    max_dd: f64,
    max_dd_percentage: f64,
    max_dd_begin: DateTime,
    max_dd_end: DateTime,

    longest_dd_duration: i64,
    longest_dd_begin: DateTime,
    longest_dd_end: DateTime,
}

impl DrawdownCalculator {
    pub fn new() -> Self {
        Self {
            initialized: false,
            high_watermark: f64::NAN,
            low_watermark: f64::NAN,
            high_datetime: DateTime::INVALID,
            last_datetime: DateTime::INVALID,
            max_dd: 0.0,
            max_dd_percentage: 0.0,
            max_dd_begin: DateTime::INVALID,
            max_dd_end: DateTime::INVALID,
            longest_dd_duration: 0,
            longest_dd_begin: DateTime::INVALID,
            longest_dd_end: DateTime::INVALID,
        }
    }

    pub fn update(&mut self, dt: DateTime, equity: f64) {
        if !self.initialized {
            self.initialized = true;
            self.high_datetime = dt;
            self.last_datetime = dt;
            self.high_watermark = equity;
            self.low_watermark = equity;
            self.max_dd_begin = dt;
            self.max_dd_end = dt;
            self.longest_dd_begin = dt;
            self.longest_dd_end = dt;
            return;
        }

        if equity >= self.high_watermark {
            let duration = dt.days_since(&self.high_datetime);
            if duration >= self.longest_dd_duration {
                self.longest_dd_duration = duration;
                self.longest_dd_begin = self.high_datetime;
                self.longest_dd_end = dt;
            }

            self.low_watermark = equity;
            self.high_watermark = equity;
            self.high_datetime = dt;
        } else if equity < self.low_watermark {
            self.low_watermark = equity;
            let drawdown = self.high_watermark - self.low_watermark;
            if drawdown > self.max_dd {
                self.max_dd = drawdown;
                self.max_dd_percentage = drawdown / self.high_watermark;
                self.max_dd_begin = self.high_datetime;
                self.max_dd_end = dt;
            }

            let duration = dt.days_since(&self.high_datetime);
            if duration >= self.longest_dd_duration {
                self.longest_dd_duration = duration;
                self.longest_dd_begin = self.high_datetime;
                self.longest_dd_end = dt;
            }
        }

        self.last_datetime = dt;
    }

    pub fn max_drawdown(&self, use_percentage: bool) -> f64 {
        if use_percentage {
            self.max_dd_percentage.abs()
        } else {
            self.max_dd.abs()
        }
    }

    pub fn max_drawdown_begin(&self) -> DateTime {
        self.max_dd_begin
    }

    pub fn max_drawdown_end(&self) -> DateTime {
        self.max_dd_end
    }

    pub fn longest_drawdown_duration(&self) -> i64 {
        self.longest_dd_duration
    }

    pub fn longest_drawdown_begin(&self) -> DateTime {
        self.longest_dd_begin
    }

    pub fn longest_drawdown_end(&self) -> DateTime {
        self.longest_dd_end
    }
}

impl Default for DrawdownCalculator {
    fn default() -> Self {
        Self::new()
    }
}
