use std::sync::Arc;

use pitchfork_core::error::AppError;
use pitchfork_core::models::{RawContent, Review};
use pitchfork_core::traits::Extractor;
use scraper::{ElementRef, Html, Selector};

/// Paragraph closers rewritten as newlines in the review body.
const MAX_PARAGRAPH_BREAKS: usize = 10;

struct ReviewSelectors {
    artist: Selector,
    album: Selector,
    label_meta: Selector,
    review_meta: Selector,
    score: Selector,
    body: Selector,
}

/// Parse a CSS selector, mapping failures into [`AppError`].
pub(crate) fn parse_selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css)
        .map_err(|e| AppError::ExtractionError(format!("Invalid selector '{css}': {e:?}")))
}

/// Builds a [`Review`] from a review page.
///
/// Selectors are compiled once and shared between clones, so each spawned
/// task gets a cheap handle and no mutable state.
#[derive(Clone)]
pub struct ReviewExtractor {
    selectors: Arc<ReviewSelectors>,
}

impl ReviewExtractor {
    pub fn new() -> Result<Self, AppError> {
        let selectors = ReviewSelectors {
            artist: parse_selector(".info h1 a")?,
            album: parse_selector(".info h2")?,
            label_meta: parse_selector(".info h3")?,
            review_meta: parse_selector(".info h4")?,
            score: parse_selector(".score")?,
            body: parse_selector(".object-detail .editorial")?,
        };

        Ok(Self {
            selectors: Arc::new(selectors),
        })
    }
}

impl Extractor for ReviewExtractor {
    type Record = Review;

    fn extract(&self, content: &RawContent) -> Result<Review, AppError> {
        if content.is_empty() {
            return Err(AppError::ExtractionError(format!(
                "Empty document from {}",
                content.url
            )));
        }

        let document = Html::parse_document(&content.body);
        let s = &self.selectors;

        let artist = first_text(&document, &s.artist);
        let album = first_text(&document, &s.album);
        let (label, year) = split_metadata(&first_text(&document, &s.label_meta));
        let (byline, review_date) = split_metadata(&first_text(&document, &s.review_meta));
        let author = byline.strip_prefix("By ").unwrap_or(byline.as_str()).trim().to_string();

        let score_text = first_text(&document, &s.score);
        let score: f64 = score_text.parse().map_err(|e| {
            AppError::ExtractionError(format!(
                "Invalid score '{score_text}' at {}: {e}",
                content.url
            ))
        })?;

        let review = document
            .select(&s.body)
            .next()
            .map(|el| render_body(&el.inner_html()))
            .unwrap_or_default();

        Ok(Review {
            artist,
            album,
            label,
            year,
            review_date,
            author,
            review,
            url: content.url.clone(),
            score,
        })
    }
}

/// Trimmed text of the first element matching `selector`, or empty.
pub(crate) fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Split `"first; second; ..."` into its first two trimmed segments.
///
/// A missing second segment yields an empty string.
pub fn split_metadata(text: &str) -> (String, String) {
    let mut segments = text.trim().split(';');
    let first = segments.next().unwrap_or_default().trim().to_string();
    let second = segments.next().unwrap_or_default().trim().to_string();
    (first, second)
}

/// Turn review markup into plain text, one paragraph per line.
pub fn render_body(markup: &str) -> String {
    strip_paragraph_openers(&markup.replacen("</p>", "\n", MAX_PARAGRAPH_BREAKS))
}

fn strip_paragraph_openers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(idx) = rest.find("<p") {
        let after = &rest[idx + 2..];
        let is_tag = after.starts_with('>') || after.starts_with(char::is_whitespace);
        if is_tag {
            if let Some(end) = after.find('>') {
                out.push_str(&rest[..idx]);
                rest = &after[end + 1..];
                continue;
            }
        }
        out.push_str(&rest[..idx + 2]);
        rest = after;
    }

    out.push_str(rest);
    out
}
