use std::fmt::Write;

use crate::models::{
    normalize_symbol, IndicatorSummary, OpinionDocument, SectorOpinion, SentimentTag,
    TechnicalsMap, TickerOpinion,
};

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Symbol usable for display and lookup, or `None` for missing / `null` symbols.
fn usable_symbol(ticker: &TickerOpinion) -> Option<String> {
    non_blank(ticker.symbol.as_deref())
        .filter(|s| !s.eq_ignore_ascii_case("null"))
        .map(normalize_symbol)
}

/// Maps a provider failure message onto wording suitable for readers.
fn technical_excuse(message: &str) -> &'static str {
    if message.contains("402") && message.contains("subscription") {
        "this symbol is not covered by the free data plan, so no technical data is available."
    } else if message.contains("API") {
        "technical data is temporarily unavailable due to an external API problem."
    } else {
        "data unavailable or the lookup failed."
    }
}

fn technical_clause(ta: &IndicatorSummary) -> String {
    if !ta.is_ok() {
        return technical_excuse(&ta.message).to_string();
    }

    let mut clause = String::new();
    if ta.last_close > 0.0 {
        let _ = write!(clause, "last close around {:.2}, ", ta.last_close);
    }
    if ta.sma > 0.0 {
        clause.push_str(if ta.above_sma {
            "trading above its moving average, "
        } else {
            "trading below its moving average, "
        });
    }
    if ta.rsi > 0.0 {
        let _ = write!(clause, "RSI around {:.2}.", ta.rsi);
    } else {
        clause.push_str("RSI value pending.");
    }
    clause
}

fn ticker_line(ticker: &TickerOpinion, symbol: &str, technicals: &TechnicalsMap) -> String {
    let display = match non_blank(ticker.name.as_deref()) {
        Some(name) => format!("{} ({})", name, symbol),
        None => symbol.to_string(),
    };

    let mut line = format!(
        "- {}: the show leans {}",
        display,
        SentimentTag::describe(ticker.sentiment.as_deref())
    );
    match non_blank(ticker.reason.as_deref()) {
        Some(reason) => {
            let _ = write!(line, ", mainly because: {}", reason);
        }
        None => line.push('.'),
    }

    if let Some(ta) = technicals.get(symbol) {
        let _ = write!(line, " Technicals: {}", technical_clause(ta));
    }
    line
}

fn sector_line(sector: &SectorOpinion) -> String {
    let mut line = format!(
        "- {}: overall view leans {}",
        non_blank(sector.name.as_deref()).unwrap_or("Unnamed sector"),
        SentimentTag::describe(sector.sentiment.as_deref())
    );
    match non_blank(sector.reason.as_deref()) {
        Some(reason) => {
            let _ = write!(line, ", because: {}", reason);
        }
        None => line.push('.'),
    }
    line
}

/// Renders the human-readable report.
///
/// Sections, in order: summary, stocks, sectors, macro view. A section with no
/// content is left out entirely. Pure: depends only on its arguments.
pub fn render_narrative(document: &OpinionDocument, technicals: &TechnicalsMap) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(summary) = non_blank(document.summary.as_deref()) {
        sections.push(format!("Episode highlights:\n{}", summary));
    }

    let ticker_lines: Vec<String> = document
        .tickers
        .iter()
        .filter_map(|t| usable_symbol(t).map(|symbol| ticker_line(t, &symbol, technicals)))
        .collect();
    if !ticker_lines.is_empty() {
        sections.push(format!("Stocks:\n{}", ticker_lines.join("\n")));
    }

    if !document.sectors.is_empty() {
        let lines: Vec<String> = document.sectors.iter().map(sector_line).collect();
        sections.push(format!("Sectors and themes:\n{}", lines.join("\n")));
    }

    if !document.macro_view.is_empty() {
        let lines: Vec<String> = document
            .macro_view
            .iter()
            .map(|item| format!("- {}", item))
            .collect();
        sections.push(format!("Market overview:\n{}", lines.join("\n")));
    }

    sections.join("\n\n").trim().to_string()
}
