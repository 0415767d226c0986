use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use pitchfork_client::{ReqwestFetcher, SiteConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned response.
#[derive(Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
        }
    }
}

#[derive(Clone)]
struct SiteState {
    pages: Arc<HashMap<String, Page>>,
    hits: Arc<Mutex<Vec<String>>>,
}

/// Local site serving canned pages by request target.
pub struct TestSite {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl TestSite {
    pub async fn start(pages: Vec<(&str, Page)>) -> Self {
        let state = SiteState {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(target, page)| (target.to_string(), page))
                    .collect(),
            ),
            hits: Arc::new(Mutex::new(Vec::new())),
        };
        let hits = state.hits.clone();

        let app = Router::new().fallback(serve_page).with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            hits,
            handle,
        }
    }

    /// Request targets served so far.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn fetcher(&self) -> ReqwestFetcher {
        let config = SiteConfig::new(&self.base_url)
            .expect("valid test base URL")
            .with_timeout(Duration::from_secs(5));
        ReqwestFetcher::new(config).expect("Failed to build fetcher")
    }
}

impl Drop for TestSite {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_page(State(state): State<SiteState>, uri: Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    state.hits.lock().unwrap().push(target.clone());

    match state.pages.get(&target) {
        Some(page) => {
            let status =
                StatusCode::from_u16(page.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Html(page.body.clone())).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Front page listing `links` under review day `day`.
pub fn front_page(day: u32, links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">review</a></li>"#))
        .collect();
    format!(
        r#"<html><body><div id="review-day-{day}"><ul class="review-list">{items}</ul></div></body></html>"#
    )
}

/// A review page with the usual `.info` block.
pub fn review_page(artist: &str, album: &str, label_meta: &str, score: &str) -> String {
    format!(
        r#"<html><body>
          <div class="info">
            <h1><a href="/artists/x/">{artist}</a></h1>
            <h2>{album}</h2>
            <h3>{label_meta}</h3>
            <h4>By Jane Doe; August 1, 2005</h4>
            <span class="score">{score}</span>
          </div>
          <div class="object-detail"><div class="editorial"><p>Great.</p><p>Loud.</p></div></div>
        </body></html>"#
    )
}
