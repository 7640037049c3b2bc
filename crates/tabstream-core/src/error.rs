use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid format: {0}")]
    InvalidFormat(&'static str),
    #[error("workbook error: {0}")]
    Workbook(String),
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<TabError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl TabError {
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}
