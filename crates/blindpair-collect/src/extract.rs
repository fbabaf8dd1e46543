//! Submission extraction from issue bodies.
//!
//! The survey page files one issue per participant. The body carries either a
//! fenced ```json block with the full response record, or compact result codes
//! (`<pair>-<dataset>-<video>-<answers>`) in a fenced block or as bare lines.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Result code shape: `<pair>-<dataset>-<video>-<answers>`.
pub const RESULT_CODE_PATTERN: &str = r"^\d+-\d+-\d+-\d+$";

static RESULT_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(RESULT_CODE_PATTERN).unwrap());

static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n(.*?)```").unwrap());

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Contents of the first ```json fenced block, trimmed.
pub fn extract_json_block(body: &str) -> Option<&str> {
    let start = body.find(JSON_FENCE)? + JSON_FENCE.len();
    let end = body[start..].find(FENCE)? + start;
    let block = body[start..end].trim();
    (!block.is_empty()).then_some(block)
}

/// Whether `s` is a well-formed result code.
pub fn is_result_code(s: &str) -> bool {
    RESULT_CODE_RE.is_match(s)
}

/// Split a blob of result codes on newlines, literal `\n` and commas.
pub fn split_result_codes(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .split(['\n', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result codes found in an issue body.
///
/// Fenced blocks are searched first; when none holds a code, bare lines of
/// the whole body are used. Lines that are not codes are dropped.
pub fn extract_result_codes(body: &str) -> Vec<String> {
    for capture in FENCED_BLOCK_RE.captures_iter(body) {
        let codes = valid_codes(&capture[1]);
        if !codes.is_empty() {
            return codes;
        }
    }
    valid_codes(body)
}

fn valid_codes(text: &str) -> Vec<String> {
    split_result_codes(text)
        .into_iter()
        .filter(|line| {
            let ok = is_result_code(line);
            if !ok {
                debug!(line = %line, "Ignoring non result-code line");
            }
            ok
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_block() {
        let body = "## Result\n\n```json\n{\"participantId\": \"p1\"}\n```\nthanks";
        assert_eq!(extract_json_block(body), Some("{\"participantId\": \"p1\"}"));
        assert_eq!(extract_json_block("no fences here"), None);
        assert_eq!(extract_json_block("```json\n   \n```"), None);
        assert_eq!(extract_json_block("```json\n{\"unterminated\": 1}"), None);
    }

    #[test]
    fn test_codes_in_fenced_block() {
        let body = "Results:\n```\n0-1-3-1221\n1-1-8-1122\n```\n";
        assert_eq!(extract_result_codes(body), vec!["0-1-3-1221", "1-1-8-1122"]);
    }

    #[test]
    fn test_codes_with_literal_newlines_and_commas() {
        let body = "```text\n0-1-3-1221\\n0-1-17-2112,1-1-8-1122\n```";
        assert_eq!(
            extract_result_codes(body),
            vec!["0-1-3-1221", "0-1-17-2112", "1-1-8-1122"]
        );
    }

    #[test]
    fn test_bare_lines_and_noise() {
        let body = "My codes\n0-1-3-1221\nnot a code\n 2-1-5-2221 \n";
        assert_eq!(extract_result_codes(body), vec!["0-1-3-1221", "2-1-5-2221"]);
        assert!(extract_result_codes("nothing to see").is_empty());
    }

    #[test]
    fn test_is_result_code() {
        assert!(is_result_code("1-1-8-1122"));
        assert!(is_result_code("10-2-33-12"));
        assert!(!is_result_code("1-1-8"));
        assert!(!is_result_code("a-1-8-1122"));
    }
}
