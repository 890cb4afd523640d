//! Line tokenizer shared by bridge and port config files (spec.md §6
//! "Configuration file": `key value...`, `#` comments, whitespace-separated
//! tokens).

use crate::error::DaemonError;

/// Splits one line into whitespace-separated tokens, dropping anything from
/// an unquoted `#` onward. Returns `None` for blank/comment-only lines.
pub(crate) fn tokenize(line: &str) -> Option<Vec<&str>> {
    let code = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    let tokens: Vec<&str> = code.split_whitespace().collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens)
    }
}

/// Parses the `vids <ranges>` value: comma-separated `N` or `N-M`, `N<=M<=4094`.
pub(crate) fn parse_vid_ranges(value: &str) -> Result<Vec<(u16, u16)>, DaemonError> {
    let mut ranges = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_vid(a)?, parse_vid(b)?),
            None => {
                let v = parse_vid(part)?;
                (v, v)
            }
        };
        if start > end || end > 4094 {
            return Err(format!("invalid VID range '{part}'").into());
        }
        ranges.push((start, end));
    }
    Ok(ranges)
}

fn parse_vid(s: &str) -> Result<u16, DaemonError> {
    s.parse::<u16>().map_err(|_| format!("'{s}' is not a valid VID").into())
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, DaemonError> {
    match value {
        "yes" | "on" | "true" | "1" => Ok(true),
        "no" | "off" | "false" | "0" => Ok(false),
        other => Err(format!("'{other}' is not yes/no").into()),
    }
}

pub(crate) fn parse_u32(field: &str, value: &str) -> Result<u32, DaemonError> {
    value.parse::<u32>().map_err(|_| format!("'{field}' expects an integer, got '{value}'").into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_strips_comments_and_blank_lines() {
        assert_eq!(tokenize("max-age 20 # default"), Some(vec!["max-age", "20"]));
        assert_eq!(tokenize("   # only a comment"), None);
        assert_eq!(tokenize(""), None);
    }

    #[test]
    fn vid_ranges_accepts_mixed_singles_and_ranges() {
        assert_eq!(parse_vid_ranges("10,20-30,40").unwrap(), vec![(10, 10), (20, 30), (40, 40)]);
    }

    #[test]
    fn vid_ranges_rejects_out_of_bounds() {
        assert!(parse_vid_ranges("1-4095").is_err());
        assert!(parse_vid_ranges("30-10").is_err());
    }
}
