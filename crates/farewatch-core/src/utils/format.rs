use chrono::NaiveDateTime;

/// Currency prefix used for all displayed prices.
const CURRENCY_SYMBOL: &str = "R$";

/// Format a price with two decimals, e.g. `R$ 1234.50`
pub fn format_price(price: f64) -> String {
    format!("{} {:.2}", CURRENCY_SYMBOL, price)
}

/// Format a route as `GRU → SDU`
pub fn format_route(origin: &str, destination: &str) -> String {
    format!("{} → {}", origin, destination)
}

/// Describe the number of stops on a flight
pub fn format_stops(stops: u32) -> String {
    match stops {
        0 => "Direct".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    }
}

/// Format a backend timestamp for display
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%b %d, %Y %H:%M").to_string()
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}
