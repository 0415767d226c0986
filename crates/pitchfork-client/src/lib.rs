pub mod config;
pub mod extractor;
pub mod fetcher;
pub mod index;

pub use config::SiteConfig;
pub use extractor::ReviewExtractor;
pub use fetcher::ReqwestFetcher;
pub use index::{NewsIndex, ReviewIndex, ReviewQuery};
