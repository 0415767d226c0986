//! Link discovery on index pages.
//!
//! Review listings (by day or by search) become [`Location`]s for the
//! aggregation pipeline. The news listing is parsed directly into
//! [`NewsArticle`]s since there is nothing further to fetch per item.

use pitchfork_core::error::AppError;
use pitchfork_core::models::{Location, NewsArticle};
use pitchfork_core::traits::{Fetcher, LocationSource};
use scraper::Html;
use url::Url;

use crate::extractor::{element_text, parse_selector};

/// Highest review day index the front page carries.
pub const MAX_REVIEW_DAY: u32 = 5;

/// Most news articles the news page lists.
pub const MAX_NEWS_COUNT: usize = 10;

/// Which review listing to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewQuery {
    /// Reviews published `day - 1` days ago; `day` is 1-based.
    Day(u32),
    /// Album reviews matching a free-text query.
    Search(String),
}

impl ReviewQuery {
    /// Reviews from `days_ago` days back (0 = today).
    pub fn days_ago(days_ago: u32) -> Result<Self, AppError> {
        let day = days_ago.saturating_add(1);
        if day > MAX_REVIEW_DAY {
            return Err(AppError::InvalidRequest(format!(
                "Reviews are only available for the last {MAX_REVIEW_DAY} days (got {days_ago} days ago)"
            )));
        }
        Ok(ReviewQuery::Day(day))
    }

    pub fn search(query: &str) -> Result<Self, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidRequest("Search query is empty".into()));
        }
        Ok(ReviewQuery::Search(query.to_string()))
    }

    /// Location of the index page listing this query's reviews.
    pub fn index_location(&self) -> Location {
        match self {
            ReviewQuery::Day(_) => Location::new("/"),
            ReviewQuery::Search(query) => {
                let params = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("query", query)
                    .append_pair("filters", "album_reviews")
                    .finish();
                Location::new(format!("/search/?{params}"))
            }
        }
    }
}

/// [`LocationSource`] backed by a review index page.
#[derive(Clone)]
pub struct ReviewIndex<F> {
    fetcher: F,
    query: ReviewQuery,
}

impl<F: Fetcher> ReviewIndex<F> {
    pub fn new(fetcher: F, query: ReviewQuery) -> Self {
        Self { fetcher, query }
    }
}

impl<F: Fetcher> LocationSource for ReviewIndex<F> {
    async fn locations(&self) -> Result<Vec<Location>, AppError> {
        let page = self.fetcher.fetch(&self.query.index_location()).await?;

        let links = match &self.query {
            ReviewQuery::Day(day) => parse_review_day_links(&page.body, *day)?,
            ReviewQuery::Search(_) => parse_search_links(&page.body)?,
        };
        tracing::info!(url = %page.url, count = links.len(), "Discovered review links");

        Ok(links)
    }
}

/// Review links listed under `#review-day-{day}` on the front page.
pub fn parse_review_day_links(html: &str, day: u32) -> Result<Vec<Location>, AppError> {
    let selector = parse_selector(&format!("#review-day-{day} .review-list a"))?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(Location::from)
        .collect())
}

/// Review links in the album-review group (the second `.search-group`).
pub fn parse_search_links(html: &str) -> Result<Vec<Location>, AppError> {
    let group = parse_selector(".search-group")?;
    let anchor = parse_selector("a")?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&group)
        .nth(1)
        .map(|group| {
            group
                .select(&anchor)
                .filter_map(|a| a.value().attr("href"))
                .map(Location::from)
                .collect()
        })
        .unwrap_or_default())
}

/// First `count` headlines of the news listing, links resolved against `page_url`.
pub fn parse_news(html: &str, page_url: &Url, count: usize) -> Result<Vec<NewsArticle>, AppError> {
    let item = parse_selector("#main .object-list .player-target")?;
    let headline = parse_selector(".info h1 a")?;
    let document = Html::parse_document(html);

    Ok(document
        .select(&item)
        .take(count)
        .map(|entry| {
            let link = entry.select(&headline).next();
            let title = link.as_ref().map(element_text).unwrap_or_default();
            let href = link.and_then(|a| a.value().attr("href")).unwrap_or_default();
            let url = page_url
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string());
            NewsArticle { title, url }
        })
        .collect())
}

/// Reads the news listing.
#[derive(Clone)]
pub struct NewsIndex<F> {
    fetcher: F,
}

impl<F: Fetcher> NewsIndex<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// The latest `count` news articles (at most [`MAX_NEWS_COUNT`]).
    pub async fn latest(&self, count: usize) -> Result<Vec<NewsArticle>, AppError> {
        if count > MAX_NEWS_COUNT {
            return Err(AppError::InvalidRequest(format!(
                "Only the last {MAX_NEWS_COUNT} news articles are available (asked for {count})"
            )));
        }

        let page = self.fetcher.fetch(&Location::new("/news")).await?;
        let page_url = Url::parse(&page.url)
            .map_err(|e| AppError::HttpError(format!("Invalid page URL '{}': {e}", page.url)))?;

        let articles = parse_news(&page.body, &page_url, count)?;
        tracing::info!(count = articles.len(), "Parsed news articles");

        Ok(articles)
    }
}
