//! Cursor-based key scanning and Redis-style glob matching.

use std::collections::HashSet;
use std::future::Future;

/// Follows a `SCAN`-style cursor from 0 until the backend returns cursor 0 again.
///
/// `next_page(cursor)` must return the next cursor and the keys of that page.
/// Keys reported more than once (which `SCAN` is allowed to do) are returned once.
pub async fn drain_scan<F, Fut, E>(mut next_page: F) -> Result<Vec<String>, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<(u64, Vec<String>), E>>,
{
    let mut cursor = 0u64;
    let mut seen = HashSet::new();
    let mut keys = Vec::new();

    loop {
        let (next, batch) = next_page(cursor).await?;
        for key in batch {
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
        if next == 0 {
            break;
        }
        cursor = next;
    }

    Ok(keys)
}

#[derive(Debug)]
enum Token {
    Literal(char),
    AnyChar,
    AnySequence,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Token {
    fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnySequence => true,
            Token::Class { negated, ranges } => {
                let hit = ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi);
                hit != *negated
            }
        }
    }
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if !matches!(tokens.last(), Some(Token::AnySequence)) {
                    tokens.push(Token::AnySequence);
                }
            }
            '?' => tokens.push(Token::AnyChar),
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '[' => {
                let negated = chars.next_if_eq(&'^').is_some();
                let mut ranges = Vec::new();
                while let Some(c) = chars.next() {
                    if c == ']' {
                        break;
                    }
                    let lo = if c == '\\' { chars.next().unwrap_or('\\') } else { c };
                    if chars.peek() == Some(&'-') {
                        chars.next();
                        match chars.next() {
                            Some(']') | None => {
                                ranges.push((lo, lo));
                                ranges.push(('-', '-'));
                                break;
                            }
                            Some(hi) => ranges.push((lo.min(hi), lo.max(hi))),
                        }
                    } else {
                        ranges.push((lo, lo));
                    }
                }
                tokens.push(Token::Class { negated, ranges });
            }
            other => tokens.push(Token::Literal(other)),
        }
    }

    tokens
}

/// Matches `text` against a Redis `MATCH` glob (`*`, `?`, `[...]`, `\` escapes).
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let tokens = tokenize(pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut t, mut p) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(Token::AnySequence) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(token) if token.matches(text[t]) => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    backtrack = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    tokens[p..]
        .iter()
        .all(|token| matches!(token, Token::AnySequence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_glob_basics() {
        assert!(glob_match("analytics:*", "analytics:campaigns:overview"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a?c", "abc"));
        assert!(!glob_match("a?c", "ac"));
        assert!(glob_match("h[ae]llo", "hello"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-c]llo", "hbllo"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(!glob_match("analytics:*", "other:key"));
    }

    #[test]
    fn test_glob_multiple_stars() {
        assert!(glob_match("*:c1:*", "p:d:op:c1:f:1"));
        assert!(!glob_match("*:c1:*", "p:d:op:c10:f:1"));
        assert!(glob_match("a*b*c", "axxbyyc"));
        assert!(!glob_match("a*b*c", "axxbyy"));
    }

    #[tokio::test]
    async fn test_drain_scan_follows_cursor_until_zero() {
        let pages = vec![
            (7u64, vec!["a".to_string(), "b".to_string()]),
            (3, vec![]),
            (0, vec!["b".to_string(), "c".to_string()]),
        ];
        let mut calls = Vec::new();
        let mut iter = pages.into_iter();

        let keys = drain_scan(|cursor| {
            calls.push(cursor);
            let page = iter.next().unwrap_or((0, vec![]));
            async move { Ok::<_, Infallible>(page) }
        })
        .await
        .unwrap();

        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(calls, vec![0, 7, 3]);
    }

    #[tokio::test]
    async fn test_drain_scan_terminates_with_no_matches() {
        let mut calls = 0;
        let keys = drain_scan(|_| {
            calls += 1;
            async { Ok::<_, Infallible>((0u64, Vec::new())) }
        })
        .await
        .unwrap();

        assert!(keys.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_drain_scan_propagates_errors() {
        let result = drain_scan(|_| async { Err::<(u64, Vec<String>), _>("boom") }).await;
        assert_eq!(result.unwrap_err(), "boom");
    }
}
