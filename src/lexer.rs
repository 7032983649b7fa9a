//! Lexical analysis of an input line into argument tokens.
//!
//! A token is either a run of characters that are neither whitespace nor quotes, or a
//! single- or double-quoted span. Quotes are stripped and do not nest; there is no escape
//! processing. Operators such as `|` and `&` are only recognized as separate tokens when
//! they are surrounded by whitespace.

use regex::Regex;
use std::sync::LazyLock;

/// Alternatives, tried left to right at each position:
/// 1. a bare word,
/// 2. a closed double-quoted span,
/// 3. a closed single-quoted span,
/// 4. an unterminated quote, kept literally together with the word that follows it.
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^\s"']+|"([^"]*)"|'([^']*)'|["'][^\s"']*"#).expect("token pattern is valid")
});

/// Split `line` into tokens.
///
/// Scanning is best-effort: malformed quoting never fails, an unmatched quote is simply
/// kept as a literal character at the start of the next token.
///
/// ```
/// use minishell::lexer::split_into_tokens;
/// assert_eq!(split_into_tokens(r#"cd "My Docs""#), vec!["cd", "My Docs"]);
/// ```
pub fn split_into_tokens(line: &str) -> Vec<String> {
    TOKEN
        .captures_iter(line)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_owned())
        })
        .collect()
}
