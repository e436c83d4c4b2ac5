// Page observer
// Fetches the player page and extracts the currently playing track through an
// ordered chain of fallback strategies.

use anyhow::{Context, Result};
use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};

use crate::text_cleanup::TextCleaner;

/// A track detected on the page. Immutable once emitted.
///
/// Identity for "is this the same track" purposes is the (artist, title)
/// pair, compared by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    /// Duration in seconds, when the page exposes it
    pub duration: Option<u64>,
    /// Epoch seconds at detection time
    pub timestamp: i64,
}

impl Track {
    pub fn same_identity(&self, other: &Track) -> bool {
        self.artist == other.artist && self.title == other.title
    }
}

/// What one observation pass sees on the page.
///
/// Site-specific selectors live in [`PageSource`]; the extraction strategies
/// below only ever look at this neutral snapshot.
#[derive(Debug, Default, Clone)]
pub struct PageSnapshot {
    /// The track line, typically "Artist - Title"
    pub headline: Option<String>,
    /// Secondary headings; on Poolsuite these hold SoundCloud uploader names
    pub bylines: Vec<String>,
    /// `og:title` meta content
    pub meta_title: Option<String>,
    /// Flattened page text, for last-resort pattern scans
    pub body_text: String,
}

/// One rule for reading (artist, title) out of a snapshot.
pub trait ExtractStrategy {
    fn name(&self) -> &'static str;
    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)>;
}

/// SoundCloud premiere prefixes stripped from parsed artist names.
const PREMIERE_PREFIXES: [&str; 4] = ["PREMIERE: ", "PREMIERE : ", "PREMIERE:", "PREMIERE :"];

/// Byline fragments that mark station branding rather than an uploader.
const BYLINE_SKIP_PATTERNS: [&str; 12] = [
    "poolsuite",
    "fm",
    "radio",
    "now playing",
    "current track",
    "loading",
    "buffering",
    "playlist",
    "next",
    "previous",
    "channel",
    "default",
];

/// Parses a headline of the form "Artist - Title".
struct DashHeadline;

impl ExtractStrategy for DashHeadline {
    fn name(&self) -> &'static str {
        "dash-headline"
    }

    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)> {
        let headline = page.headline.as_deref()?;
        let dash = headline.find(" - ")?;

        let mut artist = headline[..dash].trim().to_string();
        let title = headline[dash + 3..].trim().to_string();

        for prefix in PREMIERE_PREFIXES {
            if let Some(stripped) = artist.strip_prefix(prefix) {
                artist = stripped.trim().to_string();
                break;
            }
        }

        if artist.is_empty() || title.is_empty() {
            return None;
        }
        Some((artist, title))
    }
}

/// Headline as title, first plausible byline as artist.
struct BylineArtist;

impl ExtractStrategy for BylineArtist {
    fn name(&self) -> &'static str {
        "byline-artist"
    }

    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)> {
        let title = page.headline.as_deref()?;
        let artist = page.bylines.iter().find(|byline| {
            let lowered = byline.to_lowercase();
            byline.len() > 1
                && !BYLINE_SKIP_PATTERNS
                    .iter()
                    .any(|pattern| lowered.contains(pattern))
        })?;

        Some((artist.clone(), title.to_string()))
    }
}

/// Headline used as both artist and title.
///
/// The remote API rejects empty artists; reusing the title beats dropping the
/// play entirely.
struct HeadlineOnly;

impl ExtractStrategy for HeadlineOnly {
    fn name(&self) -> &'static str {
        "headline-only"
    }

    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)> {
        let headline = page.headline.as_deref()?;
        Some((headline.to_string(), headline.to_string()))
    }
}

/// "Artist – Title" parsed out of the `og:title` meta tag.
struct MetaTitle {
    pattern: Regex,
}

impl MetaTitle {
    fn new() -> Self {
        Self {
            pattern: Regex::new(r"^(.+?)\s*[-–—]\s*(.+)$").unwrap(),
        }
    }
}

impl ExtractStrategy for MetaTitle {
    fn name(&self) -> &'static str {
        "meta-title"
    }

    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)> {
        let meta = page.meta_title.as_deref()?;
        let caps = self.pattern.captures(meta)?;
        Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
    }
}

/// Last resort: "Now Playing: Artist - Title" style fragments in page text.
struct NowPlayingText {
    patterns: Vec<Regex>,
}

impl NowPlayingText {
    fn new() -> Self {
        let patterns = [
            r"(?i)Now Playing[:\s]+(.+?)\s+[-–—]\s+(.+)",
            r"(?i)Currently Playing[:\s]+(.+?)\s+[-–—]\s+(.+)",
            r"♪\s*(.+?)\s+[-–—]\s+(.+)",
        ]
        .iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect();
        Self { patterns }
    }
}

impl ExtractStrategy for NowPlayingText {
    fn name(&self) -> &'static str {
        "now-playing-text"
    }

    fn try_extract(&self, page: &PageSnapshot) -> Option<(String, String)> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.captures(&page.body_text) {
                return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
            }
        }
        None
    }
}

/// The ordered fallback chain, applied to each snapshot.
pub struct TrackExtractor {
    strategies: Vec<Box<dyn ExtractStrategy>>,
    cleaner: TextCleaner,
}

impl TrackExtractor {
    /// The default chain. Headline strategies come first; meta and body-text
    /// scans only matter when the page shows no headline at all.
    pub fn new(cleaner: TextCleaner) -> Self {
        Self {
            strategies: vec![
                Box::new(DashHeadline),
                Box::new(BylineArtist),
                Box::new(HeadlineOnly),
                Box::new(MetaTitle::new()),
                Box::new(NowPlayingText::new()),
            ],
            cleaner,
        }
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractStrategy>>,
        cleaner: TextCleaner,
    ) -> Self {
        Self { strategies, cleaner }
    }

    /// Runs the chain and returns the first acceptable track.
    pub fn extract(&self, page: &PageSnapshot) -> Option<Track> {
        for strategy in &self.strategies {
            let Some((artist, title)) = strategy.try_extract(page) else {
                continue;
            };

            let artist = self.cleaner.clean(&artist);
            let title = self.cleaner.clean(&title);
            if artist.is_empty() || title.is_empty() {
                continue;
            }

            log::debug!("Extracted '{artist} - {title}' via {}", strategy.name());
            return Some(Track {
                title,
                artist,
                album: None,
                duration: None,
                timestamp: Utc::now().timestamp(),
            });
        }
        None
    }
}

/// Fetches the player page over HTTP and reduces it to a [`PageSnapshot`].
pub struct PageSource {
    url: String,
}

impl PageSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn fetch(&self) -> Result<PageSnapshot> {
        let html = attohttpc::get(&self.url)
            .send()
            .and_then(|response| response.text())
            .with_context(|| format!("Failed to fetch {}", self.url))?;

        Ok(PageSnapshot::from_html(&html))
    }
}

impl PageSnapshot {
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        let headline_selector = Selector::parse("h3").unwrap();
        let byline_selector = Selector::parse("h2").unwrap();
        let meta_selector = Selector::parse(r#"meta[property="og:title"]"#).unwrap();

        let headline = document
            .select(&headline_selector)
            .map(element_text)
            .find(|text| !text.is_empty());

        let bylines = document
            .select(&byline_selector)
            .map(element_text)
            .filter(|text| !text.is_empty())
            .collect();

        let meta_title = document
            .select(&meta_selector)
            .next()
            .and_then(|element| element.value().attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty());

        let body_text = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            headline,
            bylines,
            meta_title,
            body_text,
        }
    }
}

fn element_text(element: scraper::ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
