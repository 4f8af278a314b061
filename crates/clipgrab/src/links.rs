//! YouTube link recognition.
//!
//! Clipboard text is searched for the four link shapes YouTube hands out:
//! watch pages, `youtu.be` short links, Shorts and playlists. Patterns are
//! tried in a fixed order and the first one that matches anywhere in the text
//! wins, so at most one link is taken from each clipboard change.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// The shape of a recognised link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// `youtube.com/watch?v=<id>`
    Watch,
    /// `youtu.be/<id>`
    Short,
    /// `youtube.com/shorts/<id>`
    Shorts,
    /// `youtube.com/playlist?list=<id>`
    Playlist,
}

impl LinkKind {
    /// Parse a kind from its display name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "watch" => Some(Self::Watch),
            "short" => Some(Self::Short),
            "shorts" => Some(Self::Shorts),
            "playlist" => Some(Self::Playlist),
            _ => None,
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Watch => write!(f, "watch"),
            Self::Short => write!(f, "short"),
            Self::Shorts => write!(f, "shorts"),
            Self::Playlist => write!(f, "playlist"),
        }
    }
}

/// A YouTube link found in some text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YoutubeLink {
    /// The link, always with a scheme.
    pub url: String,
    /// Which pattern recognised it.
    pub kind: LinkKind,
}

/// A compiled link pattern.
#[derive(Debug)]
pub struct LinkPattern {
    /// The kind of link this pattern recognises.
    pub kind: LinkKind,

    /// The compiled, case-insensitive regex.
    regex: Regex,
}

impl LinkPattern {
    /// Create a new link pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(kind: LinkKind, pattern: &str) -> Self {
        Self {
            kind,
            regex: RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("Invalid regex pattern"),
        }
    }

    /// Find the first occurrence of this pattern in `text`.
    #[must_use]
    pub fn find<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

/// Get the built-in link patterns in match priority order.
#[must_use]
pub fn builtin_patterns() -> Vec<LinkPattern> {
    vec![
        LinkPattern::new(
            LinkKind::Watch,
            r"(https?://)?(www\.)?(youtube\.com/watch\?v=[\w-]+)",
        ),
        LinkPattern::new(LinkKind::Short, r"(https?://)?(www\.)?(youtu\.be/[\w-]+)"),
        LinkPattern::new(
            LinkKind::Shorts,
            r"(https?://)?(www\.)?(youtube\.com/shorts/[\w-]+)",
        ),
        LinkPattern::new(
            LinkKind::Playlist,
            r"(https?://)?(www\.)?(youtube\.com/playlist\?list=[\w-]+)",
        ),
    ]
}

/// Finds YouTube links in arbitrary text.
#[derive(Debug)]
pub struct LinkMatcher {
    patterns: Vec<LinkPattern>,
}

impl LinkMatcher {
    /// Create a matcher using the built-in patterns.
    #[must_use]
    pub fn new() -> Self {
        Self {
            patterns: builtin_patterns(),
        }
    }

    /// Find the first YouTube link in `text`.
    ///
    /// Patterns are tried in priority order; the first that matches anywhere
    /// in the text decides the result. A match without a scheme gets
    /// `https://` prepended.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<YoutubeLink> {
        if text.is_empty() {
            return None;
        }

        self.patterns.iter().find_map(|pattern| {
            pattern.find(text).map(|matched| YoutubeLink {
                url: with_scheme(matched),
                kind: pattern.kind,
            })
        })
    }

    /// Check whether `text` contains a YouTube link.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

impl Default for LinkMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix `https://` unless the text already starts with `http`.
fn with_scheme(matched: &str) -> String {
    let has_scheme = matched
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("http"));
    if has_scheme {
        matched.to_string()
    } else {
        format!("https://{matched}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find(text: &str) -> Option<YoutubeLink> {
        LinkMatcher::new().find(text)
    }

    #[test]
    fn test_watch_link() {
        let link = find("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(link.kind, LinkKind::Watch);
        assert_eq!(link.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
    }

    #[test]
    fn test_short_link() {
        let link = find("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(link.kind, LinkKind::Short);
        assert_eq!(link.url, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_shorts_link() {
        let link = find("https://www.youtube.com/shorts/abc_DEF-123").unwrap();
        assert_eq!(link.kind, LinkKind::Shorts);
        assert_eq!(link.url, "https://www.youtube.com/shorts/abc_DEF-123");
    }

    #[test]
    fn test_playlist_link() {
        let link = find("https://www.youtube.com/playlist?list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG")
            .unwrap();
        assert_eq!(link.kind, LinkKind::Playlist);
        assert!(link.url.ends_with("list=PLx0sYbCqOb8TBPRdmBHs5Iftvv9TPboYG"));
    }

    #[test]
    fn test_missing_scheme_gets_https() {
        let link = find("youtube.com/watch?v=abc123").unwrap();
        assert_eq!(link.url, "https://youtube.com/watch?v=abc123");

        let link = find("www.youtu.be/xyz").unwrap();
        assert_eq!(link.url, "https://www.youtu.be/xyz");
    }

    #[test]
    fn test_http_scheme_kept() {
        let link = find("http://youtube.com/watch?v=abc").unwrap();
        assert_eq!(link.url, "http://youtube.com/watch?v=abc");
    }

    #[test]
    fn test_case_insensitive() {
        let link = find("HTTPS://WWW.YOUTUBE.COM/WATCH?V=AbC").unwrap();
        assert_eq!(link.kind, LinkKind::Watch);
        assert_eq!(link.url, "HTTPS://WWW.YOUTUBE.COM/WATCH?V=AbC");
    }

    #[test]
    fn test_link_embedded_in_text() {
        let link = find("check this out: https://youtu.be/abc123?t=42 so good").unwrap();
        assert_eq!(link.url, "https://youtu.be/abc123");
    }

    #[test]
    fn test_extra_query_parameters_are_dropped() {
        let link = find("https://www.youtube.com/watch?v=abc123&list=PL1&index=2").unwrap();
        assert_eq!(link.kind, LinkKind::Watch);
        assert_eq!(link.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_priority_watch_over_short() {
        // Both shapes present: watch links are checked first
        let link = find("https://youtu.be/first and https://youtube.com/watch?v=second").unwrap();
        assert_eq!(link.kind, LinkKind::Watch);
        assert_eq!(link.url, "https://youtube.com/watch?v=second");
    }

    #[test]
    fn test_mobile_subdomain_matches_suffix() {
        let link = find("https://m.youtube.com/watch?v=abc").unwrap();
        assert_eq!(link.url, "https://youtube.com/watch?v=abc");
    }

    #[test]
    fn test_no_match() {
        assert!(find("").is_none());
        assert!(find("just some text").is_none());
        assert!(find("https://vimeo.com/12345").is_none());
        assert!(find("https://www.youtube.com/").is_none());
        assert!(find("https://www.youtube.com/watch?v=").is_none());
        assert!(!LinkMatcher::new().is_match("https://example.com/watch?v=abc"));
    }

    #[test]
    fn test_builtin_patterns_order() {
        let kinds: Vec<_> = builtin_patterns().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                LinkKind::Watch,
                LinkKind::Short,
                LinkKind::Shorts,
                LinkKind::Playlist
            ]
        );
    }

    #[test]
    fn test_link_kind_display_round_trips_names() {
        for kind in [
            LinkKind::Watch,
            LinkKind::Short,
            LinkKind::Shorts,
            LinkKind::Playlist,
        ] {
            assert_eq!(LinkKind::from_name(&kind.to_string()), Some(kind));
        }
        assert_eq!(LinkKind::from_name("channel"), None);
    }
}
