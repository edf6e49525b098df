pub mod adapter;
pub mod queue;

pub use adapter::{ScrapedPosting, ScraperAdapter};
pub use queue::IngestionQueue;
