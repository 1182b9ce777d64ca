//! Parse probe output (tool lookup, `df`, response headers).

use crate::worker::FetchTool;

/// Picks the fetch tool from `command -v curl; command -v wget` output.
/// curl wins when both are present.
pub fn parse_tool_probe(stdout: &str) -> Option<FetchTool> {
    let found = |name: &str| {
        stdout.lines().map(str::trim).any(|line| {
            line == name || line.rsplit('/').next().is_some_and(|last| last == name)
        })
    };
    if found("curl") {
        Some(FetchTool::Curl)
    } else if found("wget") {
        Some(FetchTool::Wget)
    } else {
        None
    }
}

/// Available bytes from `df -Pk` output: second line, fourth column, in KiB.
pub fn parse_df_available(output: &str) -> Option<u64> {
    let line = output.lines().filter(|l| !l.trim().is_empty()).nth(1)?;
    let kib: u64 = line.split_whitespace().nth(3)?.parse().ok()?;
    kib.checked_mul(1024)
}

/// Last `Content-Length` among response header lines. With redirects followed
/// every hop prints its own headers; the final response comes last.
pub fn parse_content_length(headers: &str) -> Option<u64> {
    headers
        .lines()
        .filter_map(|line| {
            let (name, value) = line.trim().split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<u64>().ok()
            } else {
                None
            }
        })
        .last()
}
