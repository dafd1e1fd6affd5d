//! Invocation-argument splitting and placeholder substitution.
//!
//! The raw argument string splits into positional tokens with shell-like
//! quoting; an unbalanced quote falls back to a plain whitespace split so a
//! sloppy invocation still activates. Substitution is ordered, first-match,
//! applied once over the body: indexed `$ARGUMENTS[N]`, then the full
//! `$ARGUMENTS` string, then the bare `$N` shorthand.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// One alternation, one scan: substituted values are never re-scanned, and
// the alternation order gives indexed tokens precedence over the bare forms.
static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$ARGUMENTS\[(\d+)\]|\$ARGUMENTS|\$(\d+)").expect("placeholder pattern")
});

/// Split a raw argument string into positional tokens.
///
/// Single and double quotes group embedded whitespace; quote characters do
/// not appear in the tokens. Unbalanced quoting degrades to whitespace
/// splitting rather than failing the activation.
pub fn split_arguments(raw: &str) -> Vec<String> {
    match quoted_split(raw) {
        Some(tokens) => tokens,
        None => {
            log::debug!("unbalanced quoting in arguments, using whitespace split");
            raw.split_whitespace().map(String::from).collect()
        }
    }
}

fn quoted_split(raw: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return None;
    }
    if in_token {
        tokens.push(current);
    }
    Some(tokens)
}

/// Apply argument substitution to a capability body.
///
/// When the body carries no placeholder at all, the raw arguments are
/// appended as a trailing `ARGUMENTS:` line instead, so a capability
/// authored without placeholders can still observe its invocation.
pub fn substitute(body: &str, raw_arguments: &str) -> String {
    let positional = split_arguments(raw_arguments);
    let had_placeholder = PLACEHOLDER_RE.is_match(body);

    let lookup = |text: &str| {
        text.parse::<usize>()
            .ok()
            .and_then(|index| positional.get(index).cloned())
            .unwrap_or_default()
    };

    let text = PLACEHOLDER_RE.replace_all(body, |caps: &Captures| {
        if let Some(index) = caps.get(1) {
            lookup(index.as_str())
        } else if let Some(index) = caps.get(2) {
            lookup(index.as_str())
        } else {
            raw_arguments.to_string()
        }
    });

    if had_placeholder || raw_arguments.trim().is_empty() {
        text.into_owned()
    } else {
        format!("{text}\n\nARGUMENTS: {raw_arguments}")
    }
}
