// src/core/normalize.rs

/// Reduces raw user input to a bare, lowercase hostname.
///
/// Trims, lowercases, strips a leading `http://` and then a leading
/// `https://`, and drops everything from the first `/`. Returns `None` when
/// nothing is left, which callers treat as a rejected request.
pub fn normalize_domain(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();

    let without_http = lowered.strip_prefix("http://").unwrap_or(&lowered);
    let without_scheme = without_http
        .strip_prefix("https://")
        .unwrap_or(without_http);

    let host = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .trim();

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}
