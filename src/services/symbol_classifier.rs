use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{normalize_symbol, Market, OpinionDocument};

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"));

/// Why a candidate was not looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Blank,
    NullToken,
    Unrecognized,
}

/// Outcome of classifying one candidate symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Taiwan(String),
    Us(String),
    Rejected(RejectReason),
}

impl Classification {
    pub fn market(&self) -> Option<Market> {
        match self {
            Classification::Taiwan(_) => Some(Market::Tw),
            Classification::Us(_) => Some(Market::Us),
            Classification::Rejected(_) => None,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        match self {
            Classification::Taiwan(s) | Classification::Us(s) => Some(s),
            Classification::Rejected(_) => None,
        }
    }
}

fn is_taiwan_code(symbol: &str) -> bool {
    symbol.len() == 4 && symbol.bytes().all(|b| b.is_ascii_digit())
}

fn is_us_ticker(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len())
        && symbol.bytes().all(|b| b.is_ascii_uppercase() || b == b'.')
        && symbol != "NULL"
}

/// Classifies a raw candidate into a market bucket.
///
/// Checks run in order: blank or `null` is rejected, the rest is trimmed and
/// uppercased, then tested against the TW shape (four ASCII digits) and the
/// US shape (one to five letters or periods). Never panics; anything else,
/// including control characters or overlong input, is rejected.
pub fn classify(raw: &str) -> Classification {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Classification::Rejected(RejectReason::Blank);
    }
    if trimmed.eq_ignore_ascii_case("null") {
        return Classification::Rejected(RejectReason::NullToken);
    }

    let symbol = normalize_symbol(trimmed);
    if is_taiwan_code(&symbol) {
        Classification::Taiwan(symbol)
    } else if is_us_ticker(&symbol) {
        Classification::Us(symbol)
    } else {
        Classification::Rejected(RejectReason::Unrecognized)
    }
}

/// Every maximal run of exactly four ASCII digits in `text`.
///
/// Catches securities mentioned by code that the extractor did not list.
pub fn scan_four_digit_codes(text: &str) -> Vec<&str> {
    DIGIT_RUN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|run| run.len() == 4)
        .collect()
}

/// Merges document symbols and raw-text codes into one candidate list.
///
/// Document symbols come first, then codes scanned from `raw_text`. Entries
/// are normalized and de-duplicated, keeping first-seen order. Blank symbols
/// are dropped here; `null` tokens are left for `classify` to reject.
pub fn extract_candidates(document: &OpinionDocument, raw_text: &str) -> Vec<String> {
    let from_document = document
        .tickers
        .iter()
        .filter_map(|t| t.symbol.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let from_text = scan_four_digit_codes(raw_text).into_iter();

    let mut seen = HashSet::new();
    from_document
        .chain(from_text)
        .map(normalize_symbol)
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
