//! Small text helpers used by handlers and templates.

use url::Url;

/// Pick the first free slug in the sequence `base`, `base-1`, `base-2`, ...
pub fn first_free_slug<E>(
    base: &str,
    mut taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !taken(base)? {
        return Ok(base.to_string());
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !taken(&candidate)? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Prefix `https://` when the URL has no scheme.
pub fn format_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Truncate to `max_len` characters, ending with an ellipsis when cut.
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

/// Host of a URL for display, without a leading `www.`.
pub fn domain_of(url: &str) -> String {
    match Url::parse(&format_url(url)) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
            .unwrap_or_default(),
        Err(_) => url.to_string(),
    }
}

/// Google Maps search link for a free-text location.
pub fn maps_link(location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    let encoded: String = url::form_urlencoded::byte_serialize(location.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    Some(format!("https://www.google.com/maps/search/{}", encoded))
}

/// True for an absolute http(s) URL with a host.
pub fn is_valid_url(url: &str) -> bool {
    match Url::parse(url.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}
