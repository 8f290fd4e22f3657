#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export text is empty")]
    EmptyInput,

    #[error("export contains no data records")]
    NoRecords,

    #[error("structural violation: {0}")]
    Structure(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;
