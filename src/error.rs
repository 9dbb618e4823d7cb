use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("\"{0}\" is not a valid direction. Allowed directions include: u, d, l, r.")]
    InvalidDirection(String),

    #[error("catalog error: {0}")]
    Catalog(#[source] serde_json::Error),

    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
