//! Remote shell command lines for each operation.

use crate::planner::ByteRange;
use crate::worker::FetchTool;

use super::FetchRequest;

/// Quotes `s` for a POSIX shell: wraps in single quotes, escaping embedded ones.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Prints the path of each tool that exists; the caller inspects stdout.
pub(crate) fn probe_tool_command() -> String {
    "command -v curl; command -v wget; true".to_string()
}

/// POSIX output format, sizes in KiB.
pub(crate) fn free_space_command() -> String {
    "df -Pk .".to_string()
}

/// Header-only request printing response headers on stdout (redirects followed).
pub(crate) fn head_command(tool: FetchTool, request: &FetchRequest) -> String {
    let mut parts: Vec<String> = Vec::new();
    match tool {
        FetchTool::Curl => {
            parts.push("curl -sSIL".to_string());
            parts.extend(curl_headers(&request.headers));
            parts.push(shell_quote(&request.url));
        }
        FetchTool::Wget => {
            parts.push("wget -S --spider".to_string());
            parts.extend(wget_headers(&request.headers));
            parts.push(shell_quote(&request.url));
            parts.push("2>&1".to_string());
        }
    }
    parts.join(" ")
}

/// Range fetch into `artifact` in the remote working directory.
pub(crate) fn fetch_command(
    tool: FetchTool,
    request: &FetchRequest,
    range: ByteRange,
    artifact: &str,
) -> String {
    let range_header = format!("Range: {}", range.range_header_value());
    let mut parts: Vec<String> = Vec::new();
    match tool {
        FetchTool::Curl => {
            parts.push("curl -sS -f -L".to_string());
            parts.extend(curl_headers(&request.headers));
            parts.extend(curl_headers(std::slice::from_ref(&range_header)));
            parts.push("-o".to_string());
            parts.push(shell_quote(artifact));
            parts.push(shell_quote(&request.url));
        }
        FetchTool::Wget => {
            parts.push("wget -q".to_string());
            parts.extend(wget_headers(&request.headers));
            parts.extend(wget_headers(std::slice::from_ref(&range_header)));
            parts.push("-O".to_string());
            parts.push(shell_quote(artifact));
            parts.push(shell_quote(&request.url));
        }
    }
    parts.join(" ")
}

pub(crate) fn delete_command(artifact: &str) -> String {
    format!("rm -f -- {}", shell_quote(artifact))
}

fn curl_headers(headers: &[String]) -> impl Iterator<Item = String> + '_ {
    headers.iter().map(|h| format!("-H {}", shell_quote(h)))
}

fn wget_headers(headers: &[String]) -> impl Iterator<Item = String> + '_ {
    headers
        .iter()
        .map(|h| format!("--header={}", shell_quote(h)))
}
