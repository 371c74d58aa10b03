//! Query-string helpers for catalog URLs
//!
//! These work on the raw URL text so that the untouched parts of a query keep
//! their exact encoding. That matters because cache keys are the verbatim URL.

use std::collections::HashMap;
use url::form_urlencoded;

/// Sets, replaces or removes `parameter` in the query string of `url`.
///
/// `value` is form-encoded (spaces become `+`). A `None` or empty value
/// removes the parameter. Other parameters keep their order and encoding.
pub fn set_parameter(url: &str, parameter: &str, value: Option<&str>) -> String {
    let value = value.filter(|v| !v.is_empty());
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };

    let Some(value) = value else {
        let Some(query) = query else {
            return url.to_string();
        };
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| pair_key(pair) != parameter)
            .collect();
        if kept.is_empty() {
            return base.to_string();
        }
        return format!("{}?{}", base, kept.join("&"));
    };

    let encoded: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
    let Some(query) = query else {
        return format!("{}?{}={}", url, parameter, encoded);
    };

    if !query.split('&').any(|pair| pair_key(pair) == parameter) {
        return format!("{}&{}={}", url, parameter, encoded);
    }

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| {
            if pair_key(pair) == parameter {
                format!("{}={}", parameter, encoded)
            } else {
                pair.to_string()
            }
        })
        .collect();
    format!("{}?{}", base, pairs.join("&"))
}

/// Parses the parameters after the first `?` in `input`.
///
/// Values are form-decoded (`+` and percent escapes). Segments without an
/// `=` are ignored; a repeated name keeps its last value.
pub fn parse_parameters(input: &str) -> HashMap<String, String> {
    let Some((_, query)) = input.split_once('?') else {
        return HashMap::new();
    };

    query
        .split('&')
        .filter(|pair| pair.contains('='))
        .filter_map(|pair| form_urlencoded::parse(pair.as_bytes()).next())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}
