//! HTML summaries for the chat front end and plain tables for the console.

use quantlaxmi_carry::{CarryRecord, RankedViews, SpreadRecord};

pub const NO_DATA: &str = "No data to display.";
const ABSENT: &str = "—";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => ABSENT.to_string(),
    }
}

fn fmt_price(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => ABSENT.to_string(),
    }
}

pub fn carry_message(title: &str, rows: &[CarryRecord]) -> String {
    let mut lines = vec![format!("<b>{}</b>", escape_html(title))];
    if rows.is_empty() {
        lines.push(NO_DATA.to_string());
        return lines.join("\n");
    }
    for r in rows {
        lines.push(format!(
            "• <b>{}:</b>\n      Underlying: {}\n      Carry, % p.a.: {}\n      Carry, %: {}\n      Futures last: {}\n      Underlying last: {}\n      Lot multiplier: {}\n      Days to expiry: {}",
            escape_html(&r.futures_short_name),
            escape_html(&r.underlying_short_name),
            fmt_pct(r.carry_pct_annualized),
            fmt_pct(r.carry_pct),
            fmt_price(r.futures_last),
            fmt_price(r.underlying_last),
            r.lot_multiplier,
            r.days_to_expiry,
        ));
    }
    lines.join("\n")
}

pub fn spread_message(title: &str, rows: &[SpreadRecord]) -> String {
    let mut lines = vec![format!("<b>{}</b>", escape_html(title))];
    if rows.is_empty() {
        lines.push(NO_DATA.to_string());
        return lines.join("\n");
    }
    for r in rows {
        lines.push(format!(
            "• <b>{}:</b>\n      Carry, % p.a.: {}\n      Carry, %: {}\n      Days to far expiry: {}",
            escape_html(&r.spread_name),
            fmt_pct(r.spread_carry_pct_annualized),
            fmt_pct(Some(r.spread_carry_pct)),
            r.days_to_expiry,
        ));
    }
    lines.join("\n")
}

/// The three published messages of a cycle: top carry, top spreads, bottom spreads.
pub fn cycle_messages(views: &RankedViews) -> [String; 3] {
    let stamp = views.as_of.format("%d.%m.%Y %H:%M");
    [
        carry_message(
            &format!("📊 Top carry, % p.a. ({stamp})"),
            &views.top_carry,
        ),
        spread_message(
            &format!("📈 Top spread carry, % p.a. ({stamp})"),
            &views.top_spreads,
        ),
        spread_message(
            &format!("📉 Bottom spread carry, % p.a. ({stamp})"),
            &views.bottom_spreads,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Console tables
// ---------------------------------------------------------------------------

pub fn carry_header() -> String {
    format!(
        "{:>3}  {:<14} {:<8} {:>10} {:>10} {:>5} {:>8} {:>9}",
        "#", "CONTRACT", "UNDERL", "FUT", "SPOT", "DAYS", "CARRY%", "ANN%"
    )
}

pub fn carry_row(i: usize, r: &CarryRecord) -> String {
    format!(
        "{:>3}  {:<14} {:<8} {:>10} {:>10} {:>5} {:>8} {:>9}",
        i + 1,
        r.futures_short_name,
        r.underlying_code,
        fmt_price(r.futures_last),
        fmt_price(r.underlying_last),
        r.days_to_expiry,
        fmt_pct(r.carry_pct),
        fmt_pct(r.carry_pct_annualized),
    )
}

pub fn spread_header() -> String {
    format!(
        "{:>3}  {:<28} {:>5} {:>8} {:>9}",
        "#", "SPREAD", "DAYS", "CARRY%", "ANN%"
    )
}

pub fn spread_row(i: usize, r: &SpreadRecord) -> String {
    format!(
        "{:>3}  {:<28} {:>5} {:>8} {:>9}",
        i + 1,
        r.spread_name,
        r.days_to_expiry,
        fmt_pct(Some(r.spread_carry_pct)),
        fmt_pct(r.spread_carry_pct_annualized),
    )
}
