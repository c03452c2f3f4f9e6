use chrono::NaiveDate;

use crate::external::price_provider::ExternalPricePoint;

/// Periods used by the fixed indicator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSettings {
    pub sma_period: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            sma_period: 20,
            rsi_period: 14,
        }
    }
}

/// Indicator values computed over a lookback window.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorValues {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub last_close: f64,
    pub sma: f64,
    pub rsi: f64,
    pub above_sma: bool,
}

/// Trailing slice of the series used for indicator computation.
///
/// Takes the last `min(lookback, len)` points; the series is assumed to be
/// ascending by date.
pub fn lookback_window(series: &[ExternalPricePoint], lookback: usize) -> &[ExternalPricePoint] {
    let from = series.len().saturating_sub(lookback);
    &series[from..]
}

/// Simple Moving Average (SMA) of the most recent values.
///
/// The period is clamped to the number of values, so `[10, 20, 30]` over a
/// period of 5 averages all three. An empty slice or zero period yields 0.
pub fn sma_last(values: &[f64], period: usize) -> f64 {
    let period = period.min(values.len());
    if period == 0 {
        return 0.0;
    }

    values[values.len() - period..].iter().sum::<f64>() / period as f64
}

/// Relative Strength Index (RSI) over the last `period` day-over-day changes.
///
/// Uses plain sums rather than Wilder smoothing:
/// 1. Sum positive changes into `gain`, absolute negative changes into `loss`
/// 2. Average both over `period`
/// 3. Resolve the zero cases before dividing:
///    - no movement at all: 50
///    - no losses: 100
///    - no gains: 0
/// 4. Otherwise RSI = 100 - (100 / (1 + avg_gain / avg_loss))
///
/// Needs at least `period + 1` values; returns 0 otherwise.
pub fn rsi_last(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() <= period {
        return 0.0;
    }

    let (gain, loss) = values[values.len() - period - 1..]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(gain, loss), diff| {
            if diff > 0.0 {
                (gain + diff, loss)
            } else if diff < 0.0 {
                (gain, loss - diff)
            } else {
                (gain, loss)
            }
        });

    let avg_gain = gain / period as f64;
    let avg_loss = loss / period as f64;

    // Order matters: the zero branches are not interchangeable.
    if avg_gain == 0.0 && avg_loss == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

/// Computes the indicator set over the trailing `lookback` points.
///
/// Returns `None` when the window is empty; callers report that as missing data.
pub fn compute_indicators(
    series: &[ExternalPricePoint],
    lookback: usize,
    settings: IndicatorSettings,
) -> Option<IndicatorValues> {
    let window = lookback_window(series, lookback);
    let first = window.first()?;
    let last = window.last()?;

    let closes: Vec<f64> = window.iter().map(|p| p.close).collect();
    let sma = sma_last(&closes, settings.sma_period);
    let rsi = rsi_last(&closes, settings.rsi_period);

    Some(IndicatorValues {
        start_date: first.date,
        end_date: last.date,
        last_close: last.close,
        sma,
        rsi,
        above_sma: last.close >= sma,
    })
}
