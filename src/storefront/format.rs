//! Price formatting

/// Currency symbol rendered after every price
pub const CURRENCY: &str = "₿";

/// Format a price the way the storefront renders it
///
/// At most three fraction digits, trailing zeros dropped, thousands grouped
/// with commas, then the currency symbol: `0.008 ₿`, `1,234.5 ₿`, `0 ₿`.
pub fn format_price(amount: f64) -> String {
    format!("{} {}", format_number(amount), CURRENCY)
}

fn format_number(amount: f64) -> String {
    let rounded = format!("{:.3}", amount.abs());
    let (int_part, frac_part) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = amount < 0.0 && (int_part != "0" || !frac.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}

/// Sum item prices and format the total
pub fn format_total<'a>(prices: impl IntoIterator<Item = &'a f64>) -> String {
    format_price(prices.into_iter().sum())
}
