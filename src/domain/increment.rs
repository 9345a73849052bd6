use std::fmt;
use std::str::FromStr;

/// Relative version bump keyword accepted in place of an explicit version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Increment {
    Patch,
    Minor,
    Major,
    Prepatch,
    Preminor,
    Premajor,
    Prerelease,
}

impl Increment {
    /// All keywords, in the order they are offered to the user.
    pub const ALL: [Increment; 7] = [
        Increment::Patch,
        Increment::Minor,
        Increment::Major,
        Increment::Prepatch,
        Increment::Preminor,
        Increment::Premajor,
        Increment::Prerelease,
    ];

    /// Keyword as typed on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Increment::Patch => "patch",
            Increment::Minor => "minor",
            Increment::Major => "major",
            Increment::Prepatch => "prepatch",
            Increment::Preminor => "preminor",
            Increment::Premajor => "premajor",
            Increment::Prerelease => "prerelease",
        }
    }

    /// Whether bumping with this keyword always produces a prerelease
    pub fn is_prerelease(&self) -> bool {
        matches!(
            self,
            Increment::Prepatch | Increment::Preminor | Increment::Premajor | Increment::Prerelease
        )
    }

    /// Comma separated keyword list used in error messages
    pub fn keyword_list() -> String {
        Increment::ALL
            .iter()
            .map(Increment::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Increment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Increment::ALL
            .iter()
            .copied()
            .find(|increment| increment.as_str() == s)
            .ok_or(())
    }
}
