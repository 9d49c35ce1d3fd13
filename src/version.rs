//! Semantic version parsing and the update decision.
//!
//! Versions use the strict `<digits>.<digits>.<digits>` grammar: no sign,
//! no whitespace, no pre-release or build suffix. Anything else is a
//! [`ParseError`], never a partial parse.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use crate::error::ParseError;

/// A parsed `major.minor.patch` triple, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemVer {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SemVer {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for component in s.split('.') {
            if count == parts.len() {
                return Err(ParseError::ComponentCount);
            }
            parts[count] = parse_component(component)?;
            count += 1;
        }
        if count != parts.len() {
            return Err(ParseError::ComponentCount);
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

fn parse_component(component: &str) -> Result<u32, ParseError> {
    if component.is_empty() {
        return Err(ParseError::EmptyComponent);
    }
    component.bytes().try_fold(0u32, |acc, b| {
        if !b.is_ascii_digit() {
            return Err(ParseError::InvalidCharacter);
        }
        acc.checked_mul(10)
            .and_then(|v| v.checked_add(u32::from(b - b'0')))
            .ok_or(ParseError::Overflow)
    })
}

impl FromStr for SemVer {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Format check applied to the persisted version: exactly two `.` and
/// ASCII digits everywhere else. Looser than [`SemVer::parse`] (it allows
/// empty components such as `"1..2"`), matching what the NVM region has
/// always accepted.
pub fn is_valid_version_format(s: &str) -> bool {
    let mut dots = 0;
    for b in s.bytes() {
        match b {
            b'.' => dots += 1,
            b'0'..=b'9' => {}
            _ => return false,
        }
    }
    dots == 2
}

// ───────────────────────────────────────────────────────────────
// Update decision
// ───────────────────────────────────────────────────────────────

/// Why a candidate was (or was not) accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    /// No version is recorded on the device; any candidate is accepted.
    FirstInstall,
    /// Candidate is strictly newer than the running version.
    Newer { current: SemVer, candidate: SemVer },
    /// Candidate is equal to or older than the running version.
    NotNewer { current: SemVer, candidate: SemVer },
    /// The recorded version cannot be parsed. Updating is refused so a
    /// corrupted record can never trigger an unvetted flash.
    CurrentInvalid(ParseError),
    /// The advertised version cannot be parsed.
    CandidateInvalid(ParseError),
}

impl UpdateDecision {
    pub fn is_required(&self) -> bool {
        matches!(self, Self::FirstInstall | Self::Newer { .. })
    }
}

impl fmt::Display for UpdateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstInstall => write!(f, "no current version, update required"),
            Self::Newer { current, candidate } => {
                write!(f, "{candidate} supersedes {current}, update required")
            }
            Self::NotNewer { current, candidate } => {
                write!(f, "{candidate} does not supersede {current}")
            }
            Self::CurrentInvalid(e) => write!(f, "parse current version error: {e}"),
            Self::CandidateInvalid(e) => write!(f, "parse latest version error: {e}"),
        }
    }
}

/// Compare the running version against an advertised candidate.
pub fn update_decision(current: &str, candidate: &str) -> UpdateDecision {
    if current.is_empty() {
        return UpdateDecision::FirstInstall;
    }
    let current = match SemVer::parse(current) {
        Ok(v) => v,
        Err(e) => return UpdateDecision::CurrentInvalid(e),
    };
    let candidate = match SemVer::parse(candidate) {
        Ok(v) => v,
        Err(e) => return UpdateDecision::CandidateInvalid(e),
    };
    match candidate.cmp(&current) {
        Ordering::Greater => UpdateDecision::Newer { current, candidate },
        Ordering::Equal | Ordering::Less => UpdateDecision::NotNewer { current, candidate },
    }
}

/// `true` iff `candidate` should be installed over `current`.
pub fn is_update_required(current: &str, candidate: &str) -> bool {
    update_decision(current, candidate).is_required()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_triples() {
        assert_eq!(SemVer::parse("1.2.3"), Ok(SemVer::new(1, 2, 3)));
        assert_eq!(SemVer::parse("0.0.0"), Ok(SemVer::new(0, 0, 0)));
        assert_eq!(SemVer::parse("10.20.300"), Ok(SemVer::new(10, 20, 300)));
        assert_eq!("007.1.0".parse::<SemVer>(), Ok(SemVer::new(7, 1, 0)));
    }

    #[test]
    fn rejects_malformed_strings() {
        assert_eq!(SemVer::parse(""), Err(ParseError::Empty));
        assert_eq!(SemVer::parse("1.2"), Err(ParseError::ComponentCount));
        assert_eq!(SemVer::parse("1.2.3.4"), Err(ParseError::ComponentCount));
        assert_eq!(SemVer::parse("1.a.3"), Err(ParseError::InvalidCharacter));
        assert_eq!(SemVer::parse("1.2.3a"), Err(ParseError::InvalidCharacter));
        assert_eq!(SemVer::parse(" 1.2.3"), Err(ParseError::InvalidCharacter));
        assert_eq!(SemVer::parse("+1.2.3"), Err(ParseError::InvalidCharacter));
        assert_eq!(SemVer::parse("1..3"), Err(ParseError::EmptyComponent));
        assert_eq!(SemVer::parse(".1.2"), Err(ParseError::EmptyComponent));
        assert_eq!(SemVer::parse("1.2."), Err(ParseError::EmptyComponent));
    }

    #[test]
    fn rejects_component_overflow() {
        assert_eq!(SemVer::parse("4294967295.0.0"), Ok(SemVer::new(u32::MAX, 0, 0)));
        assert_eq!(SemVer::parse("4294967296.0.0"), Err(ParseError::Overflow));
    }

    #[test]
    fn display_round_trips() {
        let v = SemVer::new(3, 14, 15);
        assert_eq!(v.to_string(), "3.14.15");
        assert_eq!(SemVer::parse(&v.to_string()), Ok(v));
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(SemVer::new(1, 0, 0) > SemVer::new(0, 99, 99));
        assert!(SemVer::new(1, 2, 0) > SemVer::new(1, 1, 9));
        assert!(SemVer::new(1, 2, 4) > SemVer::new(1, 2, 3));
    }

    #[test]
    fn format_validator() {
        assert!(is_valid_version_format("1.2.3"));
        assert!(is_valid_version_format("1..3"));
        assert!(!is_valid_version_format(""));
        assert!(!is_valid_version_format("1.2"));
        assert!(!is_valid_version_format("1.2.3.4"));
        assert!(!is_valid_version_format("v1.2.3"));
    }

    #[test]
    fn newer_candidate_requires_update() {
        assert!(is_update_required("1.2.3", "1.2.4"));
        assert!(is_update_required("1.2.3", "1.3.0"));
        assert!(is_update_required("1.2.3", "2.0.0"));
    }

    #[test]
    fn equal_or_older_candidate_does_not() {
        assert!(!is_update_required("1.2.3", "1.2.3"));
        assert!(!is_update_required("1.2.3", "1.2.2"));
        assert!(!is_update_required("2.0.0", "1.9.9"));
    }

    #[test]
    fn empty_current_always_updates() {
        assert_eq!(update_decision("", "0.0.1"), UpdateDecision::FirstInstall);
        assert!(is_update_required("", "9.9.9"));
    }

    #[test]
    fn unparsable_current_never_updates() {
        assert_eq!(
            update_decision("garbage", "9.9.9"),
            UpdateDecision::CurrentInvalid(ParseError::InvalidCharacter)
        );
        assert!(!is_update_required("1.2", "9.9.9"));
    }

    #[test]
    fn unparsable_candidate_never_updates() {
        assert_eq!(
            update_decision("1.0.0", "2.0"),
            UpdateDecision::CandidateInvalid(ParseError::ComponentCount)
        );
    }
}
