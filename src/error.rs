//! Error handling for the ARRIS exporter crate.

/// A specialized `Result` type for exporter operations.
pub type Result<T> = std::result::Result<T, ExporterError>;

/// The main error type for exporter operations.
#[derive(Debug, thiserror::Error)]
pub enum ExporterError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The modem page could not be retrieved
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The retrieved document is not usable HTML
    #[error("Document error: {0}")]
    Html(String),

    /// A single table cell could not be parsed
    #[error("Failed to parse {field} from {input:?}")]
    Parse { field: &'static str, input: String },

    /// An expected table or row is missing from the document
    #[error("Structural anchor not found: {0}")]
    Anchor(String),

    /// Metrics registry operation failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Extractor chain index was out of range
    #[error("Extractor index {index} out of range (len {len})")]
    Chain { index: usize, len: usize },

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExporterError {
    /// Create a new fetch error
    pub fn fetch_error(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a new document error
    pub fn html_error(msg: impl Into<String>) -> Self {
        Self::Html(msg.into())
    }

    /// Create a new cell parse error
    pub fn parse_error(field: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            field,
            input: input.into(),
        }
    }

    /// Create a new structural anchor error
    pub fn anchor_error(msg: impl Into<String>) -> Self {
        Self::Anchor(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Transport and document errors skip a poll cycle; everything else is a bug or bad config.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Html(_))
    }
}

impl From<reqwest::Error> for ExporterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(err.to_string())
    }
}
