//! Quoting paths into the argument string and splitting it back into argv.

use std::path::Path;

/// Wraps a path in double quotes, escaping embedded quotes.
pub fn quote(path: &Path) -> String {
    format!("\"{}\"", path.to_string_lossy().replace('"', "\\\""))
}

/// Splits an argument string into argv, honouring double quotes.
///
/// Inside quotes `\"` is a literal quote; every other backslash is kept
/// as-is so Windows paths survive untouched.
pub fn split_arguments(arguments: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = arguments.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                in_token = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        args.push(current);
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain() {
        assert_eq!(split_arguments("-y  -i in.mp4"), vec!["-y", "-i", "in.mp4"]);
    }

    #[test]
    fn test_split_quoted_path_with_spaces() {
        assert_eq!(
            split_arguments(r#"-i "C:\My Videos\in.mp4" "out put.mkv""#),
            vec!["-i", r"C:\My Videos\in.mp4", "out put.mkv"]
        );
    }

    #[test]
    fn test_split_keeps_filter_clause_whole() {
        assert_eq!(
            split_arguments(r#"-filter_complex "[0] setpts=0.5*PTS ;[1] reverse " -map 0:0"#),
            vec![
                "-filter_complex",
                "[0] setpts=0.5*PTS ;[1] reverse ",
                "-map",
                "0:0"
            ]
        );
    }

    #[test]
    fn test_split_escaped_quote_and_empty_argument() {
        assert_eq!(
            split_arguments(r#"title="a \"b\"" """#),
            vec![r#"title=a "b""#, ""]
        );
    }

    #[test]
    fn test_quote_round_trips() {
        let path = Path::new(r#"odd "name".mp4"#);
        assert_eq!(split_arguments(&quote(path)), vec![r#"odd "name".mp4"#]);
    }
}
