use std::fmt;

/// Prefix npm puts in front of version tags when nothing else is configured
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// A release tag, e.g. `v1.2.3`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
}

impl Tag {
    /// Create a new tag from a string
    pub fn new(name: impl Into<String>) -> Self {
        Tag { name: name.into() }
    }

    /// Tag for a version using the package manager's tag-version-prefix
    pub fn for_version(prefix: &str, version: &str) -> Self {
        Tag {
            name: format!("{}{}", prefix, version),
        }
    }

    /// Strip the tag-version-prefix ("v1.2.3" -> "1.2.3").
    ///
    /// Tags that do not carry the prefix are returned whole.
    pub fn version_part(&self, prefix: &str) -> &str {
        self.name.strip_prefix(prefix).unwrap_or(&self.name)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new() {
        let tag = Tag::new("v1.2.3");
        assert_eq!(tag.name, "v1.2.3");
    }

    #[test]
    fn test_tag_for_version() {
        assert_eq!(Tag::for_version("v", "1.2.3").name, "v1.2.3");
        assert_eq!(Tag::for_version("", "1.2.3").to_string(), "1.2.3");
        assert_eq!(Tag::for_version("release-", "2.0.0-0").name, "release-2.0.0-0");
    }

    #[test]
    fn test_tag_version_part() {
        assert_eq!(Tag::new("v1.2.3").version_part("v"), "1.2.3");
        assert_eq!(Tag::new("release-1.2.3").version_part("release-"), "1.2.3");
    }

    #[test]
    fn test_version_part_without_prefix() {
        assert_eq!(Tag::new("1.2.3").version_part("v"), "1.2.3");
    }
}
