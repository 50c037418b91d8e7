//! Version constraint engine
//!
//! Checks whether a version string satisfies a range expression such as
//! `^1.2`, `>=1.0 <2.0` or `~2.1 || ^3.0`. Every entry point here is total:
//! malformed input never panics and never errors, it simply does not
//! satisfy anything.
//!
//! Comparator syntax is parsed with the `semver` crate. Matching is done
//! here because module constraints pad partial versions (`<=1.2` means
//! `<=1.2.0`) and handle pre-releases differently from cargo: any version
//! may match, ordered by semver, except that an exclusive upper bound
//! without a pre-release tag (`<2.0`, and the implied bound of `^1.0` or
//! `~1.9`) also excludes the pre-releases of that bound.

use semver::{Comparator, Op, Version};

/// Stability tag of a release without a pre-release suffix
pub const STABLE: &str = "stable";

/// Check whether `version` satisfies `constraint`
///
/// Returns `false` when either side fails to parse.
pub fn satisfies(version: &str, constraint: &str) -> bool {
    let Some(version) = parse_version(version) else {
        return false;
    };

    let constraint = constraint.trim();
    if constraint.is_empty() {
        return false;
    }

    // Any alternative matching is enough; an unparseable alternative is
    // treated as not matching rather than poisoning the others.
    constraint
        .split("||")
        .any(|alternative| match parse_conjunction(alternative) {
            Some(terms) => terms.iter().all(|term| term.matches(&version)),
            None => false,
        })
}

/// Check whether version `a` is strictly newer than version `b`
pub fn is_newer_than(a: &str, b: &str) -> bool {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

/// Infer the stability tag of a version string
///
/// `1.2.0-Beta.2` yields `beta.2`; a version without `-` is `stable`.
pub fn stability(version: &str) -> String {
    match version.split_once('-') {
        Some((_, tag)) => tag.to_lowercase(),
        None => STABLE.to_string(),
    }
}

/// Parse a loosely written version into a full semver version
///
/// Accepts a leading `v` and one to three numeric components
/// (`1`, `1.8`, `v1.8.0-rc.1`).
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    let split_at = version.find(['-', '+']).unwrap_or(version.len());
    let (core, suffix) = version.split_at(split_at);

    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).ok()
}

/// A single comparator, optionally negated (`!=`)
enum Term {
    Match(Comparator),
    Not(Comparator),
}

impl Term {
    fn matches(&self, v: &Version) -> bool {
        match self {
            Term::Match(c) => comparator_matches(c, v),
            Term::Not(c) => !comparator_matches(c, v),
        }
    }
}

/// Parse one `||` alternative into terms that must all hold
fn parse_conjunction(alternative: &str) -> Option<Vec<Term>> {
    let normalized = alternative.replace(',', " ");
    let mut tokens = normalized.split_whitespace();
    let mut terms = Vec::new();

    while let Some(token) = tokens.next() {
        // ">= 1.0" is written with a space between operator and version
        let token = if token.chars().all(is_operator_char) {
            let version = tokens.next()?;
            format!("{}{}", token, version)
        } else {
            token.to_string()
        };

        if token == "*" {
            continue;
        }
        terms.push(parse_term(&token)?);
    }

    if terms.is_empty() && !alternative.contains('*') {
        return None;
    }
    Some(terms)
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '>' | '<' | '=' | '!' | '^' | '~')
}

/// Parse a single term, normalising the operators semver does not know
fn parse_term(token: &str) -> Option<Term> {
    if let Some(rest) = token.strip_prefix("!=") {
        return parse_comparator("=", rest).map(Term::Not);
    }
    let (op, version) = split_operator(token);
    parse_comparator(op, version).map(Term::Match)
}

fn parse_comparator(op: &str, version: &str) -> Option<Comparator> {
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);
    if version.is_empty() {
        return None;
    }

    let core = version.split(['-', '+']).next().unwrap_or(version);
    let op = match op {
        "==" => "=",
        // A bare version is an exact pin, not cargo's implicit caret
        "" if !core.contains(['*', 'x', 'X']) => "=",
        other => other,
    };

    Comparator::parse(&format!("{}{}", op, version)).ok()
}

fn split_operator(token: &str) -> (&str, &str) {
    let end = token
        .char_indices()
        .find(|(_, c)| !is_operator_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    token.split_at(end)
}

fn comparator_matches(c: &Comparator, v: &Version) -> bool {
    let lower = Version {
        major: c.major,
        minor: c.minor.unwrap_or(0),
        patch: c.patch.unwrap_or(0),
        pre: c.pre.clone(),
        build: semver::BuildMetadata::EMPTY,
    };
    let triple = (v.major, v.minor, v.patch);

    match c.op {
        Op::Exact | Op::Wildcard => {
            v.major == c.major
                && c.minor.map_or(true, |m| v.minor == m)
                && c.patch.map_or(true, |p| v.patch == p)
                && (c.patch.is_none() || v.pre == c.pre)
        }
        Op::Greater => *v > lower,
        Op::GreaterEq => *v >= lower,
        Op::Less => {
            // <2.0 excludes 2.0.0-beta.1
            if c.pre.is_empty() {
                triple < (lower.major, lower.minor, lower.patch)
            } else {
                *v < lower
            }
        }
        Op::LessEq => *v <= lower,
        Op::Tilde => {
            let upper = match c.minor {
                Some(minor) => (c.major, minor.saturating_add(1), 0),
                None => (c.major.saturating_add(1), 0, 0),
            };
            *v >= lower && triple < upper
        }
        Op::Caret => {
            let upper = match (c.major, c.minor, c.patch) {
                (major, _, _) if major > 0 => (major.saturating_add(1), 0, 0),
                (0, None, _) => (1, 0, 0),
                (0, Some(minor), _) if minor > 0 => (0, minor.saturating_add(1), 0),
                (0, Some(_), None) => (0, 1, 0),
                (0, Some(_), Some(patch)) => (0, 0, patch.saturating_add(1)),
                _ => return false,
            };
            *v >= lower && triple < upper
        }
        _ => false,
    }
}
