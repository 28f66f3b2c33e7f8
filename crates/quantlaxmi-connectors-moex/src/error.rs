//! ISS retrieval and decoding failures.

#[derive(Debug, thiserror::Error)]
pub enum IssError {
    #[error("ISS request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ISS returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    #[error("ISS response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ISS response has no '{0}' section")]
    MissingSection(String),

    #[error("ISS section '{section}' has no '{column}' column")]
    MissingColumn { section: String, column: String },

    #[error("ISS section '{section}' row {row}: bad {column} value {value}")]
    BadCell {
        section: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("Instrument universe is empty")]
    EmptyUniverse,
}

pub type IssResult<T> = Result<T, IssError>;
