//! Segment-scoped glob matching of filesystem entries against exclusion patterns.
//!
//! Patterns are resolved relative to a root. A candidate matches a pattern when,
//! relative to the root, it has exactly as many components as the pattern and
//! every component matches the corresponding pattern segment. Wildcards never
//! cross a `/`, so `foo*` excludes `<root>/foobar` but not `<root>/x/foobar`.
//!
//! Supported syntax per segment: `*`, `?`, `[abc]`, `[a-z]`, `[!x]` / `[^x]`.
//! An unterminated `[` is matched literally.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
struct Segment {
    chars: Vec<char>,
    literal: bool,
}

impl Segment {
    fn new(s: &str) -> Self {
        let literal = !s.contains(['*', '?', '[']);
        Self {
            chars: s.chars().collect(),
            literal,
        }
    }

    fn matches(&self, name: &str) -> bool {
        if self.literal {
            return self.chars.iter().copied().eq(name.chars());
        }
        let name: Vec<char> = name.chars().collect();
        glob_segment(&self.chars, &name)
    }
}

/// Matches entries below `root` against a fixed set of relative patterns.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    root: PathBuf,
    patterns: Vec<Vec<Segment>>,
}

impl PathMatcher {
    /// Build a matcher for `patterns` relative to `root`.
    /// Callers are expected to pass relative patterns; `.` components are dropped,
    /// and an empty pattern denotes the root itself.
    pub fn new<I, P>(root: impl Into<PathBuf>, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                normal_components(p.as_ref())
                    .map(|s| Segment::new(&s))
                    .collect()
            })
            .collect();
        Self {
            root: root.into(),
            patterns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when `candidate` (a full path) matches any pattern.
    /// Paths outside the root never match.
    pub fn is_match(&self, candidate: &Path) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let Ok(rel) = candidate.strip_prefix(&self.root) else {
            return false;
        };
        let names: Vec<Cow<'_, str>> = normal_components(rel).collect();
        self.patterns.iter().any(|pat| {
            pat.len() == names.len() && pat.iter().zip(&names).all(|(seg, name)| seg.matches(name))
        })
    }
}

fn normal_components(p: &Path) -> impl Iterator<Item = Cow<'_, str>> {
    p.components().filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy()),
        _ => None,
    })
}

/// fnmatch-style matching of a single path segment.
fn glob_segment(pattern: &[char], name: &[char]) -> bool {
    let (mut p, mut n) = (0usize, 0usize);
    // position of the last `*` and the name index it is currently absorbing up to
    let mut star: Option<(usize, usize)> = None;

    while n < name.len() {
        let step = match pattern.get(p) {
            Some('*') => {
                star = Some((p, n));
                p += 1;
                continue;
            }
            Some('?') => Some(p + 1),
            Some('[') => match match_class(pattern, p, name[n]) {
                Some((true, end)) => Some(end),
                Some((false, _)) => None,
                None => (name[n] == '[').then_some(p + 1),
            },
            Some(&c) => (c == name[n]).then_some(p + 1),
            None => None,
        };
        match step {
            Some(next) => {
                p = next;
                n += 1;
            }
            None => match star {
                Some((sp, sn)) => {
                    p = sp + 1;
                    n = sn + 1;
                    star = Some((sp, sn + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Evaluate the bracket expression starting at `start` against `c`.
/// Returns (matched, index after the closing `]`), or None when unterminated.
fn match_class(pattern: &[char], start: usize, c: char) -> Option<(bool, usize)> {
    let mut i = start + 1;
    let negate = matches!(pattern.get(i), Some('!') | Some('^'));
    if negate {
        i += 1;
    }
    let mut matched = false;
    let mut first = true;
    loop {
        let lo = *pattern.get(i)?;
        if lo == ']' && !first {
            break;
        }
        first = false;
        match (pattern.get(i + 1), pattern.get(i + 2)) {
            (Some('-'), Some(&hi)) if hi != ']' => {
                if lo <= c && c <= hi {
                    matched = true;
                }
                i += 3;
            }
            _ => {
                if lo == c {
                    matched = true;
                }
                i += 1;
            }
        }
    }
    Some((matched != negate, i + 1))
}
