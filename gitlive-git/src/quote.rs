//! Command-string quoting.
//!
//! Runner commands are single pre-escaped strings. Arguments containing
//! whitespace or a double quote are wrapped in double quotes with interior
//! quotes escaped as `\"`; empty arguments become `""`. [`split`] is the
//! inverse used by the runner before spawning git.

/// Quote one argument for inclusion in a runner command string.
pub fn quote(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.chars().any(|c| c.is_whitespace() || c == '"') {
        return arg.to_string();
    }
    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Split a pre-escaped command string back into arguments.
pub(crate) fn split(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut in_quotes = false;

    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '\\' if chars.peek() == Some(&'"') => {
                    chars.next();
                    current.push('"');
                }
                '"' => in_quotes = false,
                _ => current.push(c),
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token {
                        args.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    has_token = true;
                }
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_pass_through() {
        assert_eq!(quote("rev-parse"), "rev-parse");
        assert_eq!(quote("live/1.0.0"), "live/1.0.0");
    }

    #[test]
    fn whitespace_and_quotes_are_wrapped() {
        assert_eq!(quote("GitLive Publisher"), "\"GitLive Publisher\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote(""), "\"\"");
    }

    #[test]
    fn split_reverses_quote() {
        let args = ["a b", "", "plain", "with\"quote"];
        let command = args.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" ");
        assert_eq!(split(&command), args);
    }

    #[test]
    fn split_collapses_runs_of_whitespace() {
        assert_eq!(split("  tag   --list  live/*  "), ["tag", "--list", "live/*"]);
    }

    #[test]
    fn split_keeps_quoted_sections_inside_a_token() {
        assert_eq!(
            split("commit-tree abc -m \"two words\""),
            ["commit-tree", "abc", "-m", "two words"]
        );
        assert_eq!(split("--pretty=format:\"%H %ct\""), ["--pretty=format:%H %ct"]);
    }
}
