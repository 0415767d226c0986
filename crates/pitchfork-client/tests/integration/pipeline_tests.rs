use std::time::Duration;

use pitchfork_client::{NewsIndex, ReviewExtractor, ReviewIndex, ReviewQuery};
use pitchfork_core::testutil::RecordingReporter;
use pitchfork_core::traits::Fetcher;
use pitchfork_core::{AggregateOutcome, Aggregator, AppError, Location, Review};

use crate::integration::common::{Page, TestSite, front_page, review_page};

async fn run_reviews(site: &TestSite, query: ReviewQuery) -> AggregateOutcome<Review> {
    let fetcher = site.fetcher();
    let source = ReviewIndex::new(fetcher.clone(), query);
    let aggregator = Aggregator::new(fetcher, ReviewExtractor::new().unwrap());

    tokio::time::timeout(Duration::from_secs(10), aggregator.aggregate(&source))
        .await
        .expect("aggregation stalled")
}

#[tokio::test]
async fn fetcher_resolves_location_against_base_url() {
    let site = TestSite::start(vec![("/reviews/albums/1/", Page::ok("<html>hi</html>"))]).await;

    let content = site
        .fetcher()
        .fetch(&Location::new("/reviews/albums/1/"))
        .await
        .unwrap();

    assert_eq!(content.url, format!("{}/reviews/albums/1/", site.base_url));
    assert_eq!(content.body, "<html>hi</html>");
}

#[tokio::test]
async fn fetcher_maps_bad_status_to_http_error() {
    let site = TestSite::start(vec![]).await;

    let err = site.fetcher().fetch(&Location::new("/missing/")).await.unwrap_err();

    assert!(matches!(err, AppError::HttpError(ref msg) if msg.contains("HTTP 404")));
}

#[tokio::test]
async fn todays_reviews_are_all_collected() {
    let links = ["/reviews/albums/1/", "/reviews/albums/2/", "/reviews/albums/3/"];
    let site = TestSite::start(vec![
        ("/", Page::ok(front_page(1, &links))),
        ("/reviews/albums/1/", Page::ok(review_page("Boris", "Pink", "Southern Lord; 2005", "8.4"))),
        ("/reviews/albums/2/", Page::ok(review_page("Mudhoney", "Superfuzz", "Sub Pop", "9.0"))),
        ("/reviews/albums/3/", Page::ok(review_page("Slint", "Spiderland", "Touch and Go; 1991", "10.0"))),
    ])
    .await;

    let outcome = run_reviews(&site, ReviewQuery::days_ago(0).unwrap()).await;

    assert!(outcome.error.is_none(), "unexpected error: {:?}", outcome.error);
    let mut artists: Vec<_> = outcome.records.iter().map(|r| r.artist.as_str()).collect();
    artists.sort();
    assert_eq!(artists, vec!["Boris", "Mudhoney", "Slint"]);

    let mudhoney = outcome
        .records
        .iter()
        .find(|r| r.artist == "Mudhoney")
        .unwrap();
    assert_eq!(mudhoney.label, "Sub Pop");
    assert_eq!(mudhoney.year, "");
    assert_eq!(mudhoney.author, "Jane Doe");
    assert_eq!(mudhoney.review, "Great.\nLoud.\n");
    assert_eq!(mudhoney.url, format!("{}/reviews/albums/2/", site.base_url));
}

#[tokio::test]
async fn failing_reviews_do_not_abort_siblings() {
    let links = [
        "/reviews/albums/1/",
        "/reviews/albums/2/",
        "/reviews/albums/3/",
        "/reviews/albums/4/",
    ];
    let site = TestSite::start(vec![
        ("/", Page::ok(front_page(2, &links))),
        ("/reviews/albums/1/", Page::ok(review_page("Boris", "Pink", "Southern Lord; 2005", "8.4"))),
        ("/reviews/albums/2/", Page::ok(review_page("Broken", "Score", "Label; 2001", "TBD"))),
        ("/reviews/albums/3/", Page::status(500)),
        ("/reviews/albums/4/", Page::ok(review_page("Slint", "Spiderland", "Touch and Go; 1991", "10.0"))),
    ])
    .await;

    let outcome = run_reviews(&site, ReviewQuery::days_ago(1).unwrap()).await;

    assert_eq!(outcome.records.len(), 2);
    let error = outcome.error.expect("failures should surface");
    assert!(error.is_extraction_error() || error.is_fetch_error());

    // Every link was still fetched exactly once.
    let hits = site.hits();
    for link in links {
        assert_eq!(hits.iter().filter(|h| *h == link).count(), 1, "{link}");
    }
}

#[tokio::test]
async fn unreachable_index_dispatches_nothing() {
    let site = TestSite::start(vec![("/", Page::status(500))]).await;
    let fetcher = site.fetcher();
    let source = ReviewIndex::new(fetcher.clone(), ReviewQuery::days_ago(0).unwrap());
    let aggregator = Aggregator::new(fetcher, ReviewExtractor::new().unwrap());
    let reporter = RecordingReporter::default();

    let outcome = aggregator.aggregate_with(&source, &reporter).await;

    assert!(outcome.records.is_empty());
    assert!(matches!(outcome.error, Some(AppError::Enumeration(_))));
    assert_eq!(reporter.dispatched(), 0);
    assert_eq!(site.hits(), vec!["/".to_string()]);
}

#[tokio::test]
async fn search_collects_album_review_group() {
    let search_page = r#"<html><body>
        <div class="search-group"><a href="/artists/1-boris/">Boris</a></div>
        <div class="search-group"><a href="/reviews/albums/1/">Pink</a></div>
    </body></html>"#;
    let site = TestSite::start(vec![
        ("/search/?query=boris&filters=album_reviews", Page::ok(search_page)),
        ("/reviews/albums/1/", Page::ok(review_page("Boris", "Pink", "Southern Lord; 2005", "8.4"))),
    ])
    .await;

    let outcome = run_reviews(&site, ReviewQuery::search("boris").unwrap()).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].album, "Pink");
    assert_eq!(outcome.records[0].score, 8.4);
}

#[tokio::test]
async fn news_listing_resolves_links() {
    let news_page = r#"<html><body><div id="main"><ul class="object-list">
        <li class="player-target"><div class="info"><h1><a href="/news/1-tour/">Tour dates</a></h1></div></li>
    </ul></div></body></html>"#;
    let site = TestSite::start(vec![("/news", Page::ok(news_page))]).await;

    let articles = NewsIndex::new(site.fetcher()).latest(5).await.unwrap();

    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "Tour dates");
    assert_eq!(articles[0].url, format!("{}/news/1-tour/", site.base_url));
}
