use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const STATUS_OK: &str = "OK";

/// Market bucket a classified symbol belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Market {
    #[serde(rename = "TW")]
    Tw,
    #[serde(rename = "US")]
    Us,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Tw => "TW",
            Market::Us => "US",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TW" => Ok(Market::Tw),
            "US" => Ok(Market::Us),
            other => Err(format!("Unsupported market: {}", other)),
        }
    }
}

/// Canonical form of a symbol: trimmed and uppercased.
///
/// Used both when inserting technicals and when looking them up.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Indicator snapshot for one symbol, built once per enrichment request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSummary {
    pub symbol: String,
    pub market: Market,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub last_close: f64,
    #[serde(rename = "sma20")]
    pub sma: f64,
    #[serde(rename = "rsi14")]
    pub rsi: f64,
    #[serde(rename = "aboveSma20")]
    pub above_sma: bool,
    pub message: String,
}

impl IndicatorSummary {
    /// Summary for a symbol whose data could not be obtained.
    pub fn failed(symbol: &str, market: Market, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            market,
            start_date: None,
            end_date: None,
            last_close: 0.0,
            sma: 0.0,
            rsi: 0.0,
            above_sma: false,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.message.eq_ignore_ascii_case(STATUS_OK)
    }
}
