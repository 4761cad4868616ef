//! Version parsing, constraint matching and "latest matching" resolution.
//!
//! Versions are lenient on input (a leading `v`, one to three numeric
//! segments) and normalized onto [`semver::Version`]. Constraints follow the
//! registry convention: comma-separated clauses, each an optional operator
//! followed by a version.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease, Version};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version")]
    Empty,
    #[error("malformed version '{0}'")]
    Malformed(String),
    #[error("malformed constraint clause '{0}'")]
    MalformedClause(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no versions available")]
    Empty,
    #[error("versions must be sorted in ascending order; found {previous} before {next}")]
    Unsorted { previous: Version, next: Version },
    #[error("no version matches '{constraint}'")]
    NoMatch { constraint: String },
}

/// A parsed version plus how many numeric segments were written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LenientVersion {
    version: Version,
    segments: usize,
}

fn parse_lenient(input: &str) -> Result<LenientVersion, VersionParseError> {
    let trimmed = input.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(VersionParseError::Empty);
    }
    let malformed = || VersionParseError::Malformed(input.to_string());

    let (rest, build) = match trimmed.split_once('+') {
        Some((rest, build)) => (rest, BuildMetadata::new(build).map_err(|_| malformed())?),
        None => (trimmed, BuildMetadata::EMPTY),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Prerelease::new(pre).map_err(|_| malformed())?),
        None => (rest, Prerelease::EMPTY),
    };

    let numbers = core
        .split('.')
        .map(|segment| {
            if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            segment.parse::<u64>().map_err(|_| malformed())
        })
        .collect::<Result<Vec<_>, _>>()?;
    if numbers.is_empty() || numbers.len() > 3 {
        return Err(malformed());
    }

    Ok(LenientVersion {
        version: Version {
            major: numbers[0],
            minor: numbers.get(1).copied().unwrap_or(0),
            patch: numbers.get(2).copied().unwrap_or(0),
            pre,
            build,
        },
        segments: numbers.len(),
    })
}

/// Parse `1`, `1.2`, `v1.2.3`, `1.2.3-beta.1+build` into a full version.
pub fn parse_version(input: &str) -> Result<Version, VersionParseError> {
    parse_lenient(input).map(|parsed| parsed.version)
}

/// Compare ignoring build metadata.
fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

fn same_release(a: &Version, b: &Version) -> bool {
    (a.major, a.minor, a.patch) == (b.major, b.minor, b.patch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Pessimistic,
}

impl Operator {
    /// Longest tokens first so `>=` is not read as `>`.
    const TOKENS: [(&'static str, Operator); 7] = [
        ("~>", Operator::Pessimistic),
        (">=", Operator::GreaterOrEqual),
        ("<=", Operator::LessOrEqual),
        ("!=", Operator::NotEqual),
        (">", Operator::Greater),
        ("<", Operator::Less),
        ("=", Operator::Equal),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    operator: Operator,
    target: LenientVersion,
}

impl Clause {
    fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let (operator, rest) = Operator::TOKENS
            .iter()
            .find_map(|(token, operator)| trimmed.strip_prefix(token).map(|rest| (*operator, rest)))
            .unwrap_or((Operator::Equal, trimmed));
        let target = parse_lenient(rest).map_err(|_| VersionParseError::MalformedClause(input.trim().to_string()))?;
        Ok(Self { operator, target })
    }

    fn matches(&self, version: &Version) -> bool {
        let target = &self.target.version;
        if !prerelease_allowed(version, target) {
            return false;
        }
        let ordering = precedence(version, target);
        match self.operator {
            Operator::Equal => ordering == Ordering::Equal,
            Operator::NotEqual => ordering != Ordering::Equal,
            Operator::Greater => ordering == Ordering::Greater,
            Operator::GreaterOrEqual => ordering != Ordering::Less,
            Operator::Less => ordering == Ordering::Less,
            Operator::LessOrEqual => ordering != Ordering::Greater,
            Operator::Pessimistic => self.matches_pessimistic(version, ordering),
        }
    }

    /// `~> 1.2` allows `>= 1.2, < 2.0`; `~> 1.2.3` allows `>= 1.2.3, < 1.3.0`.
    fn matches_pessimistic(&self, version: &Version, ordering: Ordering) -> bool {
        let target = &self.target.version;
        if target.pre.is_empty() != version.pre.is_empty() || ordering == Ordering::Less {
            return false;
        }
        let version_segments = [version.major, version.minor, version.patch];
        let target_segments = [target.major, target.minor, target.patch];
        let pinned = self.target.segments.saturating_sub(1);
        version_segments[..pinned] == target_segments[..pinned]
    }
}

/// A pre-release only satisfies a clause naming a pre-release of the same release.
fn prerelease_allowed(version: &Version, target: &Version) -> bool {
    match (version.pre.is_empty(), target.pre.is_empty()) {
        (false, false) => same_release(version, target),
        (false, true) => false,
        _ => true,
    }
}

/// A set of clauses that must all hold, e.g. `>= 1.0.0, < 2.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    raw: String,
    clauses: Vec<Clause>,
}

impl VersionConstraint {
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        if input.trim().is_empty() {
            return Err(VersionParseError::Empty);
        }
        let clauses = input.split(',').map(Clause::parse).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: input.trim().to_string(),
            clauses,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::parse(input)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// The exact version named by `input`, if it names one rather than a constraint.
///
/// Returns the text with a leading `v` stripped, which is what the registry
/// expects in download paths.
pub fn exact_version(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    parse_lenient(trimmed).ok()?;
    Some(trimmed.strip_prefix('v').unwrap_or(trimmed))
}

/// Highest version in `versions` that satisfies `constraint`.
///
/// `versions` must be ascending; unsorted input is rejected rather than
/// re-sorted. Without a constraint the last (highest) element is returned.
pub fn resolve_version(versions: &[Version], constraint: Option<&VersionConstraint>) -> Result<Version, ResolveError> {
    let Some(last) = versions.last() else {
        return Err(ResolveError::Empty);
    };
    if let Some(pair) = versions.windows(2).find(|pair| pair[0] > pair[1]) {
        return Err(ResolveError::Unsorted {
            previous: pair[0].clone(),
            next: pair[1].clone(),
        });
    }

    let Some(constraint) = constraint else {
        return Ok(last.clone());
    };

    let mut best = None;
    for version in versions {
        if constraint.matches(version) {
            best = Some(version);
        }
    }
    best.cloned().ok_or_else(|| ResolveError::NoMatch {
        constraint: constraint.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(input: &str) -> Version {
        parse_version(input).unwrap()
    }

    fn versions(inputs: &[&str]) -> Vec<Version> {
        inputs.iter().map(|input| v(input)).collect()
    }

    fn constraint(input: &str) -> VersionConstraint {
        VersionConstraint::parse(input).unwrap()
    }

    #[test]
    fn parses_lenient_versions() {
        assert_eq!(v("1"), Version::new(1, 0, 0));
        assert_eq!(v("v1.2"), Version::new(1, 2, 0));
        assert_eq!(v(" 3.6.2 "), Version::new(3, 6, 2));
        let pre = v("2.0.0-beta.1+build.5");
        assert_eq!(pre.pre.as_str(), "beta.1");
        assert_eq!(pre.build.as_str(), "build.5");
    }

    #[test]
    fn rejects_malformed_versions() {
        for input in ["", "v", "1.2.3.4", "1..2", "x.y", "1.2.a", "-1"] {
            assert!(parse_version(input).is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn range_constraint_picks_highest_inside() {
        let available = versions(&["0.9.0", "1.0.0", "1.5.0", "2.0.0"]);
        let resolved = resolve_version(&available, Some(&constraint(">=1.0.0,<2.0.0"))).unwrap();
        assert_eq!(resolved, v("1.5.0"));
    }

    #[test]
    fn no_constraint_returns_maximum() {
        let available = versions(&["0.1.0", "0.2.0", "1.0.0"]);
        assert_eq!(resolve_version(&available, None).unwrap(), v("1.0.0"));
    }

    #[test]
    fn resolved_version_is_the_greatest_match() {
        let available = versions(&["1.0.0", "1.1.0", "1.2.0", "1.3.0", "2.0.0"]);
        let c = constraint("!= 1.3.0, < 2");
        let resolved = resolve_version(&available, Some(&c)).unwrap();
        assert!(c.matches(&resolved));
        assert!(available.iter().filter(|version| **version > resolved).all(|version| !c.matches(version)));
        assert_eq!(resolved, v("1.2.0"));
    }

    #[test]
    fn unsorted_input_is_a_precondition_violation() {
        let available = versions(&["1.0.0", "0.9.0"]);
        assert!(matches!(resolve_version(&available, None), Err(ResolveError::Unsorted { .. })));
        assert!(matches!(
            resolve_version(&available, Some(&constraint(">= 0"))),
            Err(ResolveError::Unsorted { .. })
        ));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(resolve_version(&[], None), Err(ResolveError::Empty));
        assert_eq!(resolve_version(&[], Some(&constraint("1.0.0"))), Err(ResolveError::Empty));
    }

    #[test]
    fn no_match_names_the_constraint() {
        let available = versions(&["1.0.0"]);
        let err = resolve_version(&available, Some(&constraint(">= 5"))).unwrap_err();
        assert_eq!(err, ResolveError::NoMatch {
            constraint: ">= 5".to_string()
        });
    }

    #[test]
    fn pessimistic_pins_all_but_last_segment() {
        let two = constraint("~> 1.2");
        assert!(two.matches(&v("1.2.0")));
        assert!(two.matches(&v("1.9.9")));
        assert!(!two.matches(&v("2.0.0")));
        assert!(!two.matches(&v("1.1.9")));

        let three = constraint("~> 1.2.3");
        assert!(three.matches(&v("1.2.9")));
        assert!(!three.matches(&v("1.3.0")));
        assert!(!three.matches(&v("1.2.2")));

        let one = constraint("~> 1");
        assert!(one.matches(&v("7.0.0")));
    }

    #[test]
    fn operators_compare_as_expected() {
        let version = v("1.5.0");
        assert!(constraint("1.5.0").matches(&version));
        assert!(constraint("= v1.5").matches(&version));
        assert!(!constraint("!= 1.5.0").matches(&version));
        assert!(constraint("> 1.4").matches(&version));
        assert!(constraint("<= 1.5.0").matches(&version));
        assert!(!constraint("< 1.5.0").matches(&version));
    }

    #[test]
    fn prereleases_need_an_explicit_prerelease_clause() {
        let beta = v("2.0.0-beta.2");
        assert!(!constraint(">= 1.0.0").matches(&beta));
        assert!(constraint(">= 2.0.0-beta.1").matches(&beta));
        assert!(!constraint(">= 1.9.0-beta.1").matches(&beta));
        assert!(constraint(">= 2.0.0-beta.1").matches(&v("2.1.0")));
        assert!(!constraint("~> 2.0.0-beta.1").matches(&v("2.0.0")));
    }

    #[test]
    fn malformed_constraints_are_rejected() {
        for input in ["", ">= ", "~> one", "1.0,,2.0", "=> 1.0"] {
            assert!(VersionConstraint::parse(input).is_err(), "{input} should not parse");
        }
    }

    #[test]
    fn exact_versions_strip_leading_v() {
        assert_eq!(exact_version("v3.6.2"), Some("3.6.2"));
        assert_eq!(exact_version("1.2"), Some("1.2"));
        assert_eq!(exact_version(">= 1.0"), None);
        assert_eq!(exact_version("~> 2"), None);
        assert_eq!(exact_version(""), None);
    }
}
