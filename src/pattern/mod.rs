//! Route pattern compilation and matching.
//!
//! A path spec is compiled once at registration into a [`RoutePattern`] and
//! is immutable afterwards. Three spec styles are supported, plus an escape
//! hatch:
//!
//! | Spec                 | Example match            | Captures                        |
//! |----------------------|--------------------------|---------------------------------|
//! | `/cats`              | `/cats`                  | *(none)*                        |
//! | `/cats/:id`          | `/cats/bob`              | `id → "bob"`                    |
//! | `/files/*`           | `/files/docs/readme.txt` | `wildcard → "docs/readme.txt"`  |
//! | [`RoutePattern::raw`]| per the regex            | named groups, in capture order  |
//!
//! Matching is anchored: the whole path must be consumed. A trailing slash
//! in the spec is a strict suffix requirement — `/cats/` does not match
//! `/cats`, and vice versa. The empty path is normalized to `/` before
//! matching. A failed match is an ordinary `None`, never an error.

use regex::Regex;
use thiserror::Error;

use crate::context::Params;

/// The capture name used for `*` wildcards.
pub const WILDCARD: &str = "wildcard";

/// Error compiling a raw pattern.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The raw pattern is not a valid regular expression.
    #[error("invalid raw route pattern: {0}")]
    InvalidRaw(#[from] regex::Error),
}

// One element of a compiled spec.
#[derive(Debug, Clone)]
enum Token {
    // A literal run of characters, matched verbatim.
    Literal(String),
    // `:name` — a maximal non-empty run of characters up to the next
    // `/`, `?`, or `#`.
    Param(String),
    // `*` — a greedy capture of anything, including separators.
    Wildcard,
}

#[derive(Debug, Clone)]
enum Matcher {
    Tokens(Vec<Token>),
    Raw(Regex),
}

/// A compiled route pattern.
///
/// # Examples
///
/// ```
/// use sendero::pattern::RoutePattern;
///
/// let pattern = RoutePattern::compile("/cats/:id");
/// let params = pattern.matches("/cats/bob").unwrap();
/// assert_eq!(params.get("id"), Some("bob"));
/// assert!(pattern.matches("/dogs/bob").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct RoutePattern {
    spec: String,
    matcher: Matcher,
}

impl RoutePattern {
    /// Compiles a path spec into a pattern.
    ///
    /// `:name` introduces a named parameter (`name` is a run of `\w`
    /// characters; a bare `:` stays literal) and `*` a wildcard capture
    /// named [`WILDCARD`]. Everything else matches verbatim.
    pub fn compile(spec: impl Into<String>) -> Self {
        let spec = spec.into();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = spec.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ':' if chars.peek().is_some_and(|c| c.is_alphanumeric() || *c == '_') => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Param(name));
                }
                '*' => {
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(Token::Wildcard);
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Self {
            spec,
            matcher: Matcher::Tokens(tokens),
        }
    }

    /// Compiles a raw regular expression as the pattern.
    ///
    /// The expression is anchored to the whole path. Named capture groups
    /// become captures, in capture order; unnamed groups are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidRaw`] when the expression does not
    /// compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use sendero::pattern::RoutePattern;
    ///
    /// let pattern = RoutePattern::raw(r"/posts/(?P<year>\d{4})/(?P<slug>[^/]+)").unwrap();
    /// let params = pattern.matches("/posts/2024/hello").unwrap();
    /// assert_eq!(params.get("year"), Some("2024"));
    /// assert_eq!(params.get("slug"), Some("hello"));
    /// ```
    pub fn raw(pattern: &str) -> Result<Self, PatternError> {
        let regex = Regex::new(&format!(r"\A(?:{pattern})\z"))?;
        Ok(Self {
            spec: pattern.to_owned(),
            matcher: Matcher::Raw(regex),
        })
    }

    /// Returns the spec this pattern was compiled from.
    pub fn spec(&self) -> &str {
        &self.spec
    }

    /// Matches `path` against this pattern.
    ///
    /// The empty path is normalized to `/` first. On success the extracted
    /// captures are returned in capture order; on failure the result is
    /// `None`.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let path = if path.is_empty() { "/" } else { path };

        match &self.matcher {
            Matcher::Tokens(tokens) => {
                let mut captures = Vec::new();
                if match_at(tokens, path, &mut captures) {
                    let mut params = Params::new();
                    for (name, value) in captures {
                        params.push(name, value);
                    }
                    Some(params)
                } else {
                    None
                }
            }
            Matcher::Raw(regex) => {
                let caps = regex.captures(path)?;
                let mut params = Params::new();
                for name in regex.capture_names().flatten() {
                    if let Some(m) = caps.name(name) {
                        params.push(name, m.as_str());
                    }
                }
                Some(params)
            }
        }
    }
}

/// Anything a route registration accepts as its pattern: a spec string
/// (compiled on the spot) or an already-compiled [`RoutePattern`] — the way
/// raw patterns reach a route.
pub trait IntoPattern {
    /// Produce the compiled pattern.
    fn into_pattern(self) -> RoutePattern;
}

impl IntoPattern for RoutePattern {
    fn into_pattern(self) -> RoutePattern {
        self
    }
}

impl IntoPattern for &str {
    fn into_pattern(self) -> RoutePattern {
        RoutePattern::compile(self)
    }
}

impl IntoPattern for String {
    fn into_pattern(self) -> RoutePattern {
        RoutePattern::compile(self)
    }
}

// Matches `tokens` against the whole of `path`, appending captures to
// `captures`. On failure the captures vector is left as it was found.
//
// Params and wildcards are greedy: the longest candidate capture is tried
// first and shrunk until the remaining tokens match the remaining path.
fn match_at(tokens: &[Token], path: &str, captures: &mut Vec<(String, String)>) -> bool {
    let Some((token, rest)) = tokens.split_first() else {
        return path.is_empty();
    };

    match token {
        Token::Literal(lit) => match path.strip_prefix(lit.as_str()) {
            Some(tail) => match_at(rest, tail, captures),
            None => false,
        },
        Token::Param(name) => {
            let run = param_run(path);
            if run == 0 {
                return false;
            }
            let mark = captures.len();
            for take in boundaries(path, run, 1).rev() {
                captures.push((name.clone(), path[..take].to_owned()));
                if match_at(rest, &path[take..], captures) {
                    return true;
                }
                captures.truncate(mark);
            }
            false
        }
        Token::Wildcard => {
            let mark = captures.len();
            for take in boundaries(path, path.len(), 0).rev() {
                captures.push((WILDCARD.to_owned(), path[..take].to_owned()));
                if match_at(rest, &path[take..], captures) {
                    return true;
                }
                captures.truncate(mark);
            }
            false
        }
    }
}

// Byte length of the maximal prefix of `path` free of `/`, `?`, and `#`.
fn param_run(path: &str) -> usize {
    path.find(['/', '?', '#']).unwrap_or(path.len())
}

// Char-boundary offsets of `path` within `(min..=limit)`, ascending.
fn boundaries(
    path: &str,
    limit: usize,
    min: usize,
) -> impl DoubleEndedIterator<Item = usize> + '_ {
    (min..=limit).filter(move |&i| path.is_char_boundary(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── compile + literal specs ───────────────────────────────────────────

    #[test]
    fn literal_spec_matches_exactly() {
        let p = RoutePattern::compile("/cats");
        assert!(p.matches("/cats").is_some());
        assert!(p.matches("/dogs").is_none());
        assert!(p.matches("/cats/extra").is_none());
    }

    #[test]
    fn root_spec_matches_root_only() {
        let p = RoutePattern::compile("/");
        assert!(p.matches("/").is_some());
        assert!(p.matches("/cats").is_none());
    }

    #[test]
    fn empty_path_normalizes_to_root() {
        let p = RoutePattern::compile("/");
        assert!(p.matches("").is_some());
    }

    #[test]
    fn trailing_slash_is_strict_both_ways() {
        let with = RoutePattern::compile("/cats/");
        assert!(with.matches("/cats/").is_some());
        assert!(with.matches("/cats").is_none());

        let without = RoutePattern::compile("/cats");
        assert!(without.matches("/cats/").is_none());
    }

    // ── named params ──────────────────────────────────────────────────────

    #[test]
    fn param_captures_value() {
        let p = RoutePattern::compile("/cats/:id");
        let params = p.matches("/cats/bob").unwrap();
        assert_eq!(params.get("id"), Some("bob"));
        assert!(p.matches("/dogs/bob").is_none());
    }

    #[test]
    fn param_does_not_cross_separator() {
        let p = RoutePattern::compile("/cats/:id");
        assert!(p.matches("/cats/bob/toys").is_none());
    }

    #[test]
    fn param_requires_at_least_one_char() {
        let p = RoutePattern::compile("/cats/:id");
        assert!(p.matches("/cats/").is_none());
    }

    #[test]
    fn multiple_params_capture_in_order() {
        let p = RoutePattern::compile("/cats/:id/toys/:toy");
        let params = p.matches("/cats/bob/toys/mouse").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("id", "bob"), ("toy", "mouse")]);
    }

    #[test]
    fn param_backtracks_for_literal_suffix() {
        // greedy capture must give back "`.txt`" for the literal to match
        let p = RoutePattern::compile("/files/:name.txt");
        let params = p.matches("/files/notes.txt").unwrap();
        assert_eq!(params.get("name"), Some("notes"));
        assert!(p.matches("/files/notes.pdf").is_none());
    }

    #[test]
    fn two_params_in_one_segment() {
        let p = RoutePattern::compile("/files/:name.:ext");
        let params = p.matches("/files/report.final.pdf").unwrap();
        // the first param is greedy, the second gets the shortest tail
        assert_eq!(params.get("name"), Some("report.final"));
        assert_eq!(params.get("ext"), Some("pdf"));
    }

    #[test]
    fn colon_without_a_name_stays_literal() {
        // `:` is only a parameter marker when a word character follows
        let p = RoutePattern::compile("/files:/archive");
        assert!(p.matches("/files:/archive").is_some());
        assert!(p.matches("/filesX/archive").is_none());
    }

    // ── wildcards ─────────────────────────────────────────────────────────

    #[test]
    fn wildcard_is_greedy_across_separators() {
        let p = RoutePattern::compile("/files/*");
        let params = p.matches("/files/docs/readme.txt").unwrap();
        assert_eq!(params.get(WILDCARD), Some("docs/readme.txt"));
    }

    #[test]
    fn wildcard_may_capture_empty() {
        let p = RoutePattern::compile("/files/*");
        let params = p.matches("/files/").unwrap();
        assert_eq!(params.get(WILDCARD), Some(""));
    }

    #[test]
    fn wildcard_respects_prefix() {
        let p = RoutePattern::compile("/files/*");
        assert!(p.matches("/other/readme.txt").is_none());
    }

    #[test]
    fn repeated_wildcards_capture_separately() {
        let p = RoutePattern::compile("/say/*/to/*");
        let params = p.matches("/say/hello/to/world").unwrap();
        let all: Vec<_> = params.get_all(WILDCARD).collect();
        assert_eq!(all, vec!["hello", "world"]);
    }

    #[test]
    fn wildcard_then_literal_backtracks() {
        let p = RoutePattern::compile("/download/*.tar.gz");
        let params = p.matches("/download/builds/v1.tar.gz").unwrap();
        assert_eq!(params.get(WILDCARD), Some("builds/v1"));
    }

    // ── raw patterns ──────────────────────────────────────────────────────

    #[test]
    fn raw_pattern_is_anchored() {
        let p = RoutePattern::raw(r"/posts/(?P<id>\d+)").unwrap();
        assert!(p.matches("/posts/42").is_some());
        assert!(p.matches("/posts/42/comments").is_none());
        assert!(p.matches("/v2/posts/42").is_none());
    }

    #[test]
    fn raw_pattern_named_groups_become_params() {
        let p = RoutePattern::raw(r"/(?P<a>[a-z]+)-(?P<b>[a-z]+)").unwrap();
        let params = p.matches("/foo-bar").unwrap();
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "foo"), ("b", "bar")]);
    }

    #[test]
    fn raw_pattern_rejects_bad_regex() {
        assert!(RoutePattern::raw(r"/posts/(unclosed").is_err());
    }

    #[test]
    fn match_failure_is_none_not_error() {
        let p = RoutePattern::compile("/cats/:id");
        assert!(p.matches("/").is_none());
    }
}
