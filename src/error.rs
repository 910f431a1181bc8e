use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request failed: {0}")]
    Retrieval(#[from] reqwest::Error),

    #[error("The section you are trying to scrape is missing. Section: {0}")]
    ParseMissingSection(String),

    #[error("Couldn't build a selector: {0}")]
    ParseBadSelector(String),

    #[error("Couldn't extract a discipline id from href: {0}")]
    ParseDisciplineId(String),

    #[error("Course object is missing a usable `{0}` field.")]
    MalformedCourse(&'static str),

    #[error("Output path {0} does not exist")]
    MissingDestination(PathBuf),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
