//! Inline images: uploads become base64 data URLs, and anything without a
//! usable image gets a generated placeholder.

use askama::Template;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const DEFAULT_SIZE: (u32, u32) = (400, 300);
pub const AVATAR_SIZE: (u32, u32) = (200, 200);

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

const COLOR_SCHEMES: &[(&str, &str)] = &[
    ("#667eea", "#764ba2"),
    ("#f093fb", "#f5576c"),
    ("#4facfe", "#00f2fe"),
    ("#43e97b", "#38f9d7"),
    ("#fa709a", "#fee140"),
    ("#a8edea", "#fed6e3"),
];

const TITLE_FONT_SIZE: u32 = 32;
const LINE_HEIGHT: u32 = 45;
const MAX_LINES: usize = 2;
const SIDE_PADDING: u32 = 80;
const MAX_WORD_CHARS: usize = 15;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Only image files are allowed (JPG, PNG, GIF)")]
    NotAnImage,
}

#[derive(Template)]
#[template(path = "placeholder.svg")]
struct PlaceholderSvg<'a> {
    width: u32,
    height: u32,
    primary: &'a str,
    secondary: &'a str,
    lines: Vec<PlacedLine>,
    font_size: u32,
}

struct PlacedLine {
    text: String,
    y: u32,
}

/// Gradient colors for a title, chosen by the first byte of its MD5 digest.
pub fn color_scheme(title: &str) -> (&'static str, &'static str) {
    let digest = md5::compute(title.as_bytes());
    COLOR_SCHEMES[digest.0[0] as usize % COLOR_SCHEMES.len()]
}

/// Estimated rendered width of a line of title text.
fn text_width(text: &str) -> u32 {
    // Bold sans glyphs average a little over half the font size.
    (text.chars().count() as u32 * TITLE_FONT_SIZE * 6) / 10
}

/// Greedy word wrap to the canvas width, keeping at most two lines.
pub fn wrap_title(title: &str, width: u32) -> Vec<String> {
    let max_width = width.saturating_sub(SIDE_PADDING);
    let mut lines = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in title.split_whitespace() {
        let mut candidate = current.clone();
        candidate.push(word);
        if text_width(&candidate.join(" ")) <= max_width {
            current = candidate;
        } else if !current.is_empty() {
            lines.push(current.join(" "));
            current = vec![word];
        } else if word.chars().count() > MAX_WORD_CHARS {
            let cut: String = word.chars().take(MAX_WORD_CHARS).collect();
            lines.push(format!("{}...", cut));
        } else {
            lines.push(word.to_string());
        }
    }
    if !current.is_empty() {
        lines.push(current.join(" "));
    }

    lines.truncate(MAX_LINES);
    lines
}

/// Render the placeholder for `title` as an SVG document.
pub fn placeholder_svg(title: &str, size: (u32, u32)) -> Result<String, askama::Error> {
    let (width, height) = size;
    let (primary, secondary) = color_scheme(title);
    let wrapped = wrap_title(title, width);
    let start_y = height.saturating_sub(wrapped.len() as u32 * LINE_HEIGHT) / 2;
    let lines = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| PlacedLine {
            text,
            y: start_y + i as u32 * LINE_HEIGHT,
        })
        .collect();

    PlaceholderSvg {
        width,
        height,
        primary,
        secondary,
        lines,
        font_size: TITLE_FONT_SIZE,
    }
    .render()
}

/// Placeholder image for `title` as a `data:` URL.
pub fn placeholder_data_url(title: &str, size: (u32, u32)) -> String {
    let svg = placeholder_svg(title, size).unwrap_or_else(|e| {
        tracing::error!("Placeholder render error: {}", e);
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}"><rect width="100%" height="100%" fill="{}"/></svg>"#,
            size.0,
            size.1,
            color_scheme(title).0
        )
    });
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Identify an image format from its leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || head.starts_with("<?xml") {
            Some("image/svg+xml")
        } else {
            None
        }
    }
}

/// True when `data_url` is a base64 `data:image/...` URL carrying real image bytes.
pub fn is_valid_image_data_url(data_url: &str) -> bool {
    let Some(rest) = data_url.strip_prefix("data:image/") else {
        return false;
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return false;
    };
    match STANDARD.decode(payload.trim()) {
        Ok(bytes) => sniff_image(&bytes).is_some(),
        Err(_) => false,
    }
}

/// The stored image when it is usable, otherwise a placeholder for `title`.
pub fn safe_image_url(stored: Option<&str>, title: &str, size: (u32, u32)) -> String {
    match stored {
        Some(url) if is_valid_image_data_url(url) => url.to_string(),
        _ => placeholder_data_url(title, size),
    }
}

/// Convert an uploaded file to a data URL for inline storage.
/// Returns `Ok(None)` when nothing was uploaded.
pub fn upload_to_data_url(filename: &str, bytes: &[u8]) -> Result<Option<String>, UploadError> {
    if filename.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    if bytes.is_empty() {
        return Ok(None);
    }

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::NotAnImage);
    }

    let mime = match sniff_image(bytes) {
        Some(mime) if mime != "image/svg+xml" => mime,
        _ => return Err(UploadError::NotAnImage),
    };

    Ok(Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes))))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn color_scheme_is_deterministic() {
        assert_eq!(color_scheme("Blue Bottle Coffee"), color_scheme("Blue Bottle Coffee"));
        assert!(COLOR_SCHEMES.contains(&color_scheme("anything")));
    }

    #[test]
    fn placeholder_is_deterministic_data_url() {
        let a = placeholder_data_url("Tacos El Gordo", DEFAULT_SIZE);
        let b = placeholder_data_url("Tacos El Gordo", DEFAULT_SIZE);
        assert_eq!(a, b);
        assert!(a.starts_with("data:image/svg+xml;base64,"));
        assert!(is_valid_image_data_url(&a));
    }

    #[test]
    fn placeholder_svg_contains_escaped_title_and_brand() {
        let svg = placeholder_svg("Fish & Chips", DEFAULT_SIZE).unwrap();
        assert!(svg.contains("Fish &amp; Chips"));
        assert!(svg.contains("CUR8tr"));
        assert!(svg.contains(r#"width="400""#));
    }

    #[test]
    fn wrap_title_keeps_two_lines() {
        let lines = wrap_title("The Very Long Title Of A Restaurant Somewhere Nice", 400);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| text_width(l) <= 320));
    }

    #[test]
    fn wrap_title_truncates_giant_words() {
        let lines = wrap_title("Supercalifragilisticexpialidocious", 400);
        assert_eq!(lines, vec!["Supercalifragil..."]);
    }

    #[test]
    fn wrap_title_empty_has_no_lines() {
        assert!(wrap_title("   ", 400).is_empty());
    }

    #[test]
    fn sniff_recognizes_common_formats() {
        assert_eq!(sniff_image(PNG_HEADER), Some("image/png"));
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_image(b"GIF89a...."), Some("image/gif"));
        assert_eq!(sniff_image(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image(b"hello world"), None);
    }

    #[test]
    fn data_url_validation() {
        let png = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        assert!(is_valid_image_data_url(&png));
        assert!(!is_valid_image_data_url("/static/uploads/old.jpg"));
        assert!(!is_valid_image_data_url("data:image/png;base64,%%%"));
        let text = format!("data:image/png;base64,{}", STANDARD.encode("plain text"));
        assert!(!is_valid_image_data_url(&text));
    }

    #[test]
    fn safe_image_url_falls_back_to_placeholder() {
        let png = format!("data:image/png;base64,{}", STANDARD.encode(PNG_HEADER));
        assert_eq!(safe_image_url(Some(&png), "x", DEFAULT_SIZE), png);
        assert_eq!(
            safe_image_url(Some("broken"), "Title", DEFAULT_SIZE),
            placeholder_data_url("Title", DEFAULT_SIZE)
        );
        assert_eq!(
            safe_image_url(None, "Title", DEFAULT_SIZE),
            placeholder_data_url("Title", DEFAULT_SIZE)
        );
    }

    #[test]
    fn upload_accepts_images_only() {
        let url = upload_to_data_url("photo.PNG", PNG_HEADER).unwrap().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        assert_eq!(upload_to_data_url("", b""), Ok(None));
        assert_eq!(
            upload_to_data_url("notes.txt", b"hello"),
            Err(UploadError::NotAnImage)
        );
        assert_eq!(
            upload_to_data_url("fake.jpg", b"hello"),
            Err(UploadError::NotAnImage)
        );
    }
}
