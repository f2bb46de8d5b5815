use std::fmt;

use super::error::InvalidStem;

const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']', '{', '}'];

/// Filename without its extension; joins a video file to its thumbnail.
///
/// Always non-empty, a single path component, and free of glob
/// metacharacters, so it can be joined to a storage directory safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetStem(String);

impl AssetStem {
    pub fn parse(stem: &str) -> Result<Self, InvalidStem> {
        if stem.is_empty() {
            return Err(InvalidStem::new(stem, "stem is empty"));
        }
        if stem == "." || stem == ".." {
            return Err(InvalidStem::new(stem, "stem is a relative path segment"));
        }
        if stem.contains(['/', '\\']) {
            return Err(InvalidStem::new(stem, "stem contains a path separator"));
        }
        if stem.contains(GLOB_METACHARACTERS) {
            return Err(InvalidStem::new(stem, "stem contains a glob metacharacter"));
        }
        if stem.chars().any(char::is_control) {
            return Err(InvalidStem::new(stem, "stem contains a control character"));
        }
        Ok(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `{stem}.{ext}`
    pub fn file_name(&self, ext: &str) -> String {
        format!("{}.{}", self.0, ext)
    }
}

impl fmt::Display for AssetStem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips the final extension from a playback path segment.
///
/// Only the last `.ext` is removed, so `a.b.mp4` yields `a.b`. A leading dot
/// or a "extension" containing a separator is not treated as an extension.
pub fn stem_from_segment(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(i) if i > 0 && !segment[i + 1..].contains(['/', '\\']) => &segment[..i],
        _ => segment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_provider_ids() {
        for id in ["abc123", "dQw4w9WgXcQ", "a-b_c", "clip.part1"] {
            assert_eq!(AssetStem::parse(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn test_parse_rejects_traversal_and_patterns() {
        for bad in ["", ".", "..", "../etc", "/etc/passwd", "a\\b", "abc*", "a?c", "[ab]", "{a,b}", "a\0b"] {
            let err = AssetStem::parse(bad).unwrap_err();
            assert_eq!(err.stem, bad);
        }
    }

    #[test]
    fn test_file_name() {
        let stem = AssetStem::parse("abc123").unwrap();
        assert_eq!(stem.file_name("mp4"), "abc123.mp4");
        assert_eq!(stem.to_string(), "abc123");
    }

    #[test]
    fn test_stem_from_segment() {
        assert_eq!(stem_from_segment("abc123.mp4"), "abc123");
        assert_eq!(stem_from_segment("abc123"), "abc123");
        assert_eq!(stem_from_segment("a.b.mp4"), "a.b");
        assert_eq!(stem_from_segment("../etc"), "../etc");
        assert_eq!(stem_from_segment(".."), ".");
        assert_eq!(stem_from_segment(".hidden"), ".hidden");
        assert_eq!(stem_from_segment(""), "");
    }
}
