//! Local naming: output filename from the URL and filesystem-safe worker slugs.

/// Filename used when the URL path yields nothing usable.
const DEFAULT_FILENAME: &str = "download.bin";

/// Linux NAME_MAX.
const NAME_MAX: usize = 255;

/// Derives the name of the assembled file from the last path segment of `url`.
///
/// Query strings and fragments are ignored. Falls back to `download.bin` when
/// the URL does not parse or has no usable segment.
///
/// - `output_filename("https://example.com/iso/debian-12.iso?x=1")` → `"debian-12.iso"`
/// - `output_filename("https://example.com/")` → `"download.bin"`
pub fn output_filename(url: &str) -> String {
    let segment = url::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segs| segs.rfind(|s| !s.is_empty()).map(str::to_string))
    });
    match segment {
        Some(s) => {
            let clean = sanitize_component(&s);
            if clean.is_empty() || clean == "." || clean == ".." {
                DEFAULT_FILENAME.to_string()
            } else {
                clean
            }
        }
        None => DEFAULT_FILENAME.to_string(),
    }
}

/// Sanitizes one path component for Linux: separators, NUL, control characters
/// and whitespace become `_` (runs collapsed), surrounding dots and underscores
/// are trimmed, and the result is capped at 255 bytes.
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let bad = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        let c = if bad { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }
    truncate_on_boundary(out.trim_matches(|c| c == '.' || c == '_'), NAME_MAX)
}

/// Slug for an ssh target usable inside artifact names: ASCII alphanumerics,
/// `.` and `-` are kept, everything else (including `_`, which separates the
/// slug from the range) becomes `-`.
pub fn worker_slug(target: &str) -> String {
    let slug: String = target
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    if slug.is_empty() {
        "worker".to_string()
    } else {
        truncate_on_boundary(&slug, 64)
    }
}

fn truncate_on_boundary(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    s[..take].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_filename_from_last_segment() {
        assert_eq!(
            output_filename("https://cdn.example.com/path/to/debian-12.iso"),
            "debian-12.iso"
        );
        assert_eq!(
            output_filename("https://example.com/file.zip?token=abc#frag"),
            "file.zip"
        );
        assert_eq!(output_filename("https://example.com/dir/"), "dir");
    }

    #[test]
    fn output_filename_fallbacks() {
        assert_eq!(output_filename("https://example.com/"), "download.bin");
        assert_eq!(output_filename("https://example.com"), "download.bin");
        assert_eq!(output_filename("not a url"), "download.bin");
        assert_eq!(output_filename("https://example.com/.."), "download.bin");
    }

    #[test]
    fn output_filename_decoded_space_is_sanitized() {
        assert_eq!(output_filename("https://example.com/a%20b.txt"), "a%20b.txt");
        assert_eq!(sanitize_component("a b\tc.txt"), "a_b_c.txt");
    }

    #[test]
    fn sanitize_trims_and_collapses() {
        assert_eq!(sanitize_component("..file___name.txt.."), "file_name.txt");
        assert_eq!(sanitize_component("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_component("x\u{0}y"), "x_y");
    }

    #[test]
    fn worker_slug_replaces_separators() {
        assert_eq!(worker_slug("user@host.example:2222"), "user-host.example-2222");
        assert_eq!(worker_slug("my_box"), "my-box");
        assert_eq!(worker_slug(""), "worker");
    }
}
