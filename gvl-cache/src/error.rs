use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GvlError {
    #[error("an I/O error occurred: {0}")]
    GenericIo(#[from] std::io::Error),

    #[error("database error: {0}")]
    DatabaseError(#[from] libsql::Error),

    #[error("http client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("unexpected http status {0} from vendor list endpoint")]
    UnexpectedStatus(StatusCode),

    #[error("deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("response body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("stored value under '{key}' has an unexpected type")]
    CorruptValue { key: String },

    #[error("stored version {stored:?} does not match document version {document}")]
    VersionMismatch { stored: Option<String>, document: u64 },

    #[error("download was superseded by an unload or clear")]
    Superseded,

    #[error("download task ended without reporting an outcome")]
    Interrupted,
}
