// Human-readable alert text, Telegram HTML flavour.

use crate::engine::types::{ChangeEvent, Percentage};

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `1234567.8` -> `1,234,567.80`
pub fn format_amount(v: f64) -> String {
    let s = format!("{:.2}", v.abs());
    let (int, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, ch) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

fn is_increase(old: &Percentage, new: &Percentage) -> bool {
    matches!((old.value(), new.value()), (Some(o), Some(n)) if n > o)
}

pub fn change_message(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::New { token, capacity, token_apr, tvl } => {
            let mut msg = format!(
                "🆕 <b>New Pool Detected</b>\n\n\
                 Asset: <b>{}</b>\n\
                 Capacity: <code>{}</code>\n\
                 Token APR: <code>{}</code>\n\
                 TVL: <code>{}</code>",
                escape_html(token),
                escape_html(capacity.as_str()),
                escape_html(token_apr),
                format_amount(*tvl),
            );
            if let Some(space) = capacity.remaining_of(*tvl) {
                msg.push_str(&format!("\nAvailable: <code>{}</code>", format_amount(space)));
            }
            msg
        }
        ChangeEvent::CapacityChange { token, old_capacity, new_capacity, token_apr, tvl } => {
            let arrow = if is_increase(old_capacity, new_capacity) { "📈" } else { "📉" };
            let mut msg = format!(
                "{arrow} <b>Capacity Changed</b>\n\n\
                 Asset: <b>{}</b>\n\
                 Old Capacity: <code>{}</code>\n\
                 New Capacity: <code>{}</code>\n\
                 Token APR: <code>{}</code>\n\
                 TVL: <code>{}</code>",
                escape_html(token),
                escape_html(old_capacity.as_str()),
                escape_html(new_capacity.as_str()),
                escape_html(token_apr),
                format_amount(*tvl),
            );
            if let Some(space) = new_capacity.remaining_of(*tvl) {
                msg.push_str(&format!("\nAvailable: <code>{}</code>", format_amount(space)));
            }
            msg
        }
    }
}

pub fn status_message(status: &str) -> String {
    format!("ℹ️ <b>Monitor Status</b>\n\n{}", escape_html(status))
}

pub fn error_message(error: &str) -> String {
    format!("⚠️ <b>Error Alert</b>\n\n<code>{}</code>", escape_html(error))
}
