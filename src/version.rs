//! Semantic version handling for releases.
//!
//! Parsing is delegated to the `semver` crate. On top of it this module adds
//! the increment keywords (`patch` ... `prerelease`) with node-style increment
//! rules, and prerelease-inclusive ordering and range checks.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Comparator, Op, Prerelease};

use crate::domain::Increment;
use crate::error::{LionpError, Result};

/// Every increment keyword, in prompt order.
pub const SEMVER_INCREMENTS: [Increment; 7] = Increment::ALL;

/// Increment keywords that always yield a prerelease.
pub const PRERELEASE_INCREMENTS: [Increment; 4] = [
    Increment::Prepatch,
    Increment::Preminor,
    Increment::Premajor,
    Increment::Prerelease,
];

/// Oldest git supported by the release flow
pub const GIT_VERSION_RANGE: &str = ">=2.11.0";

/// Oldest npm supported by the release flow
pub const NPM_VERSION_RANGE: &str = ">=7.19.0";

/// A validated semantic version.
///
/// Immutable: increments return a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    inner: semver::Version,
}

impl Version {
    /// Parse a strict semver string (`major.minor.patch[-pre][+build]`).
    pub fn parse(version: &str) -> Result<Self> {
        semver::Version::parse(version)
            .map(|inner| Version { inner })
            .map_err(|_| LionpError::InvalidVersion {
                version: version.to_string(),
            })
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.inner
    }

    /// True iff the version carries a prerelease component.
    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    /// Apply an increment keyword.
    ///
    /// Follows npm's rules: a prerelease is first "finished" before a numeric
    /// component moves (`1.0.0-beta` + major = `1.0.0`), and the `pre*`
    /// keywords append or bump a numeric prerelease suffix starting at `0`.
    /// Build metadata is dropped.
    pub fn increment(&self, increment: Increment) -> Result<Version> {
        let mut next = self.inner.clone();
        next.build = BuildMetadata::EMPTY;
        let had_pre = !next.pre.is_empty();

        match increment {
            Increment::Major => {
                if next.minor != 0 || next.patch != 0 || !had_pre {
                    next.major = bump(next.major)?;
                }
                next.minor = 0;
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Minor => {
                if next.patch != 0 || !had_pre {
                    next.minor = bump(next.minor)?;
                }
                next.patch = 0;
                next.pre = Prerelease::EMPTY;
            }
            Increment::Patch => {
                if !had_pre {
                    next.patch = bump(next.patch)?;
                }
                next.pre = Prerelease::EMPTY;
            }
            Increment::Premajor => {
                next.major = bump(next.major)?;
                next.minor = 0;
                next.patch = 0;
                next.pre = bump_prerelease(&Prerelease::EMPTY)?;
            }
            Increment::Preminor => {
                next.minor = bump(next.minor)?;
                next.patch = 0;
                next.pre = bump_prerelease(&Prerelease::EMPTY)?;
            }
            Increment::Prepatch => {
                next.patch = bump(next.patch)?;
                next.pre = bump_prerelease(&Prerelease::EMPTY)?;
            }
            Increment::Prerelease => {
                if !had_pre {
                    next.patch = bump(next.patch)?;
                }
                next.pre = bump_prerelease(&next.pre)?;
            }
        }

        Ok(Version { inner: next })
    }

    /// Resolve user input against this version.
    ///
    /// A keyword yields the incremented version; a valid semver string is
    /// returned as is. Anything else is an `InvalidIncrement` error.
    pub fn new_version_from(&self, input: &str) -> Result<Version> {
        if let Ok(increment) = input.parse::<Increment>() {
            return self.increment(increment);
        }

        Version::parse(input).map_err(|_| LionpError::InvalidIncrement {
            input: input.to_string(),
            allowed: Increment::keyword_list(),
        })
    }

    /// True iff `other` sorts at or below this version.
    ///
    /// Used as "the proposed version is not an upgrade" guard, so
    /// `1.0.0`.is_lower_than_or_equal_to(`1.0.0-beta`) is true.
    pub fn is_lower_than_or_equal_to(&self, other: &Version) -> bool {
        cmp_precedence(&other.inner, &self.inner) != Ordering::Greater
    }

    /// True iff `other` sorts at or above this version.
    pub fn is_greater_than_or_equal_to(&self, other: &Version) -> bool {
        cmp_precedence(&other.inner, &self.inner) != Ordering::Less
    }

    /// Range check with prereleases always included.
    pub fn satisfies(&self, range: &str) -> Result<bool> {
        let alternatives = parse_range(range)?;
        Ok(alternatives
            .iter()
            .any(|set| set.iter().all(|interval| interval.contains(&self.inner))))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl FromStr for Version {
    type Err = LionpError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Fails with `InvalidVersion` unless `version` is strict semver.
pub fn validate(version: &str) -> Result<()> {
    Version::parse(version).map(|_| ())
}

/// Accepts exactly the increment keywords and valid semver strings.
pub fn is_valid_input(input: &str) -> bool {
    input.parse::<Increment>().is_ok() || Version::parse(input).is_ok()
}

/// False for anything that does not parse.
pub fn is_prerelease(version: &str) -> bool {
    Version::parse(version)
        .map(|v| v.is_prerelease())
        .unwrap_or(false)
}

/// Going from `current` to `new` touches a prerelease, so `latest` is the wrong
/// default dist-tag.
pub fn needs_dist_tag(current: &str, new: &str) -> bool {
    is_prerelease(new) || is_prerelease(current)
}

/// Prerelease version or one of the `pre*` keywords.
pub fn is_prerelease_or_increment(input: &str) -> bool {
    is_prerelease(input)
        || input
            .parse::<Increment>()
            .map(|increment| increment.is_prerelease())
            .unwrap_or(false)
}

pub fn get_new_version_from(current: &str, input: &str) -> Result<String> {
    let current = Version::parse(current)?;
    if input.parse::<Increment>().is_err() {
        // explicit versions are handed back verbatim
        Version::parse(input).map_err(|_| LionpError::InvalidIncrement {
            input: input.to_string(),
            allowed: Increment::keyword_list(),
        })?;
        return Ok(input.to_string());
    }
    current.new_version_from(input).map(|v| v.to_string())
}

pub fn is_lower_than_or_equal_to(current: &str, other: &str) -> Result<bool> {
    Ok(Version::parse(current)?.is_lower_than_or_equal_to(&Version::parse(other)?))
}

pub fn is_greater_than_or_equal_to(current: &str, other: &str) -> Result<bool> {
    Ok(Version::parse(current)?.is_greater_than_or_equal_to(&Version::parse(other)?))
}

pub fn satisfies(version: &str, range: &str) -> Result<bool> {
    Version::parse(version)?.satisfies(range)
}

/// Check an installed tool version against the supported range.
pub fn verify_requirement_satisfied(dependency: &str, version: &str, range: &str) -> Result<()> {
    if !satisfies(version, range)? {
        return Err(LionpError::precondition(format!(
            "Please upgrade to {}{}",
            dependency, range
        )));
    }
    Ok(())
}

fn bump(component: u64) -> Result<u64> {
    component.checked_add(1).ok_or_else(|| LionpError::InvalidVersion {
        version: format!("component {} cannot be incremented", component),
    })
}

fn bump_prerelease(pre: &Prerelease) -> Result<Prerelease> {
    let mut identifiers: Vec<String> = if pre.is_empty() {
        Vec::new()
    } else {
        pre.as_str().split('.').map(str::to_string).collect()
    };

    let last_numeric = identifiers
        .iter()
        .rposition(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()));

    match last_numeric {
        Some(index) => {
            let value: u64 = identifiers[index]
                .parse()
                .map_err(|_| LionpError::InvalidVersion {
                    version: pre.to_string(),
                })?;
            identifiers[index] = bump(value)?.to_string();
        }
        None => identifiers.push("0".to_string()),
    }

    let joined = identifiers.join(".");
    Prerelease::new(&joined).map_err(|_| LionpError::InvalidVersion { version: joined })
}

fn cmp_precedence(a: &semver::Version, b: &semver::Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

#[derive(Debug, Clone)]
struct Bound {
    version: semver::Version,
    inclusive: bool,
}

/// One comparator desugared into lower/upper bounds.
#[derive(Debug, Clone, Default)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Interval {
    fn any() -> Self {
        Interval::default()
    }

    fn at_least(version: semver::Version) -> Self {
        Interval {
            lower: Some(Bound {
                version,
                inclusive: true,
            }),
            upper: None,
        }
    }

    fn above(version: semver::Version) -> Self {
        Interval {
            lower: Some(Bound {
                version,
                inclusive: false,
            }),
            upper: None,
        }
    }

    fn below(version: semver::Version) -> Self {
        Interval {
            lower: None,
            upper: Some(Bound {
                version,
                inclusive: false,
            }),
        }
    }

    fn at_most(version: semver::Version) -> Self {
        Interval {
            lower: None,
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    fn between(lower: semver::Version, upper: semver::Version) -> Self {
        Interval {
            lower: Some(Bound {
                version: lower,
                inclusive: true,
            }),
            upper: Some(Bound {
                version: upper,
                inclusive: false,
            }),
        }
    }

    fn contains(&self, version: &semver::Version) -> bool {
        let above_lower = match &self.lower {
            Some(bound) => match cmp_precedence(version, &bound.version) {
                Ordering::Greater => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Less => false,
            },
            None => true,
        };
        let below_upper = match &self.upper {
            Some(bound) => match cmp_precedence(version, &bound.version) {
                Ordering::Less => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Greater => false,
            },
            None => true,
        };
        above_lower && below_upper
    }
}

fn release(major: u64, minor: u64, patch: u64) -> semver::Version {
    semver::Version::new(major, minor, patch)
}

/// `major.minor.patch-0`: the lowest version sharing that release triple.
fn floor(major: u64, minor: u64, patch: u64) -> semver::Version {
    let mut version = release(major, minor, patch);
    version.pre = Prerelease::new("0").unwrap_or(Prerelease::EMPTY);
    version
}

fn comparator_version(comparator: &Comparator) -> semver::Version {
    let mut version = release(
        comparator.major,
        comparator.minor.unwrap_or(0),
        comparator.patch.unwrap_or(0),
    );
    version.pre = comparator.pre.clone();
    version
}

/// Exclusive upper bound of the partial version `comparator` (`1.2` -> `1.3.0-0`).
fn partial_ceiling(comparator: &Comparator) -> semver::Version {
    match comparator.minor {
        Some(minor) => floor(comparator.major, minor.saturating_add(1), 0),
        None => floor(comparator.major.saturating_add(1), 0, 0),
    }
}

fn comparator_interval(comparator: &Comparator) -> Result<Interval> {
    let full = comparator.minor.is_some() && comparator.patch.is_some();
    let exact = comparator_version(comparator);
    let major = comparator.major;
    let minor = comparator.minor.unwrap_or(0);
    // partial versions admit the prereleases of their first release
    let lowest = if full {
        exact.clone()
    } else {
        floor(major, minor, 0)
    };

    let interval = match comparator.op {
        Op::Exact if full => Interval {
            lower: Some(Bound {
                version: exact.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version: exact,
                inclusive: true,
            }),
        },
        Op::Exact | Op::Wildcard => {
            Interval::between(floor(major, minor, 0), partial_ceiling(comparator))
        }
        Op::Greater if full => Interval::above(exact),
        Op::Greater => Interval::at_least(partial_ceiling(comparator)),
        Op::GreaterEq if full => Interval::at_least(exact),
        Op::GreaterEq => Interval::at_least(floor(major, minor, 0)),
        Op::Less if full => Interval::below(exact),
        Op::Less => Interval::below(floor(major, minor, 0)),
        Op::LessEq if full => Interval::at_most(exact),
        Op::LessEq => Interval::below(partial_ceiling(comparator)),
        Op::Tilde => {
            let ceiling = match comparator.minor {
                Some(minor) => floor(major, minor.saturating_add(1), 0),
                None => floor(major.saturating_add(1), 0, 0),
            };
            Interval::between(lowest, ceiling)
        }
        Op::Caret => {
            let ceiling = match (major, comparator.minor, comparator.patch) {
                (0, Some(0), Some(patch)) => floor(0, 0, patch.saturating_add(1)),
                (0, Some(minor), _) => floor(0, minor.saturating_add(1), 0),
                _ => floor(major.saturating_add(1), 0, 0),
            };
            Interval::between(lowest, ceiling)
        }
        _ => {
            return Err(LionpError::config(format!(
                "Unsupported version range operator in `{}`",
                comparator
            )))
        }
    };

    Ok(interval)
}

fn parse_comparator(token: &str) -> Result<Interval> {
    if matches!(token, "*" | "x" | "X") {
        return Ok(Interval::any());
    }

    let starts_bare = token.chars().next().is_some_and(|c| c.is_ascii_digit());
    let has_wildcard = token.contains(['x', 'X', '*']);
    // a bare version means an exact match, not cargo's implicit caret
    let normalized = if starts_bare && !has_wildcard {
        format!("={}", token)
    } else {
        token.to_string()
    };

    let comparator = Comparator::from_str(&normalized).map_err(|e| {
        LionpError::config(format!("Invalid version range `{}`: {}", token, e))
    })?;
    comparator_interval(&comparator)
}

fn parse_range(range: &str) -> Result<Vec<Vec<Interval>>> {
    range
        .split("||")
        .map(|alternative| {
            let tokens: Vec<&str> = alternative.split_whitespace().collect();
            let mut intervals = Vec::new();
            let mut pending_op = String::new();

            let mut i = 0;
            while i < tokens.len() {
                let token = tokens[i];
                if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
                    // operator separated from its version: ">= 1.2.3"
                    pending_op.push_str(token);
                    i += 1;
                    continue;
                }
                // hyphen range: "1.2.3 - 2.3"
                if pending_op.is_empty() && tokens.get(i + 1) == Some(&"-") {
                    let upper = tokens.get(i + 2).ok_or_else(|| {
                        LionpError::config(format!("Invalid version range `{}`", range))
                    })?;
                    intervals.push(parse_comparator(&format!(">={}", token))?);
                    intervals.push(parse_comparator(&format!("<={}", upper))?);
                    i += 3;
                    continue;
                }
                let joined = format!("{}{}", pending_op, token);
                pending_op.clear();
                intervals.push(parse_comparator(&joined)?);
                i += 1;
            }

            if !pending_op.is_empty() {
                return Err(LionpError::config(format!(
                    "Invalid version range `{}`",
                    range
                )));
            }
            if intervals.is_empty() {
                intervals.push(Interval::any());
            }
            Ok(intervals)
        })
        .collect()
}
