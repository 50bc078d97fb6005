use sha2::{Digest, Sha256};

pub fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)
}

/// Two decimals with `,` thousands separators, e.g. `1,234.50`.
pub fn fmt_money(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.2}", value.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// Rounded integer percent of a 0..1 rate, without the `%` sign.
pub fn pct_of_rate(rate: f64) -> String {
    format!("{}", (rate * 100.0).round() as i64)
}

pub fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}
