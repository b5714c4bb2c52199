pub const PLACEHOLDER: &str = "—";

/// A 0..=1 fraction as a percentage, e.g. `0.6` -> `60.0%`.
pub fn pct(v: Option<f64>) -> String {
    finite(v)
        .map(|v| format!("{:.1}%", v * 100.0))
        .unwrap_or_else(placeholder)
}

/// A decimal return as a signed percentage, e.g. `0.0123` -> `+1.23%`.
pub fn signed_return(v: Option<f64>) -> String {
    finite(v)
        .map(|v| format!("{:+.2}%", v * 100.0))
        .unwrap_or_else(placeholder)
}

pub fn score(v: Option<f64>) -> String {
    finite(v)
        .map(|v| format!("{v:.1}"))
        .unwrap_or_else(placeholder)
}

pub fn count(v: Option<u32>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(placeholder)
}

pub fn text(v: Option<&str>) -> String {
    v.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(placeholder)
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|v| v.is_finite())
}

fn placeholder() -> String {
    PLACEHOLDER.to_string()
}
