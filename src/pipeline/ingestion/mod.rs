//! Listing ingestion: pasted text or a URL in, typed `PropertyRecord` out.

pub mod coerce;
pub mod evidence;
pub mod fetch;
pub mod orchestrator;
pub mod prompt;

pub use fetch::{is_url, FetchError, HttpProxyFetcher, PageFetcher};
pub use orchestrator::{ExtractionResult, InputSource, PropertyExtractor};
