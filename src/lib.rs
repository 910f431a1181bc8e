//! STUDYPORTALS COURSE SCRAPER
//!
//! Walks the two-level discipline taxonomy, pulls every course listing page by
//! page and fans the resulting stream into flushed JSON batches plus a pair of
//! course/discipline lookup tables.

mod error;
mod macros;
pub mod process;
pub mod search;
pub mod sink;
pub mod stream;
pub mod taxonomy;

pub use error::{Error, Result};

use std::path::PathBuf;

/// Everything the pipeline needs to know about the outside world. Defaults
/// point at the live Studyportals endpoints; tests swap in their own.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root discipline listing page (HTML).
    pub disciplines_url: String,
    /// Facet-count endpoint (JSON).
    pub facets_url: String,
    /// Course search endpoint (JSON).
    pub search_url: String,
    /// Where batches and lookup tables land. Must exist before the run starts.
    pub out_dir: PathBuf,
    /// Courses buffered per (discipline, level) before a batch hits disk.
    pub flush_threshold: usize,
    /// Search results per page. The server always serves 10, nothing we can do
    /// about it; override only against a mock endpoint.
    pub page_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disciplines_url: "https://www.bachelorsportal.com/disciplines/".into(),
            facets_url: "https://search-facets.prtl.co".into(),
            search_url: "https://search.prtl.co/2018-07-23/".into(),
            out_dir: PathBuf::from("data/raw"),
            flush_threshold: 1000,
            page_size: 10,
        }
    }
}
