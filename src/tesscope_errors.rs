use thiserror::Error;

#[derive(Error, Debug)]
pub enum TesscopeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("TIC ID not found in the catalog: {0}")]
    UnresolvedCatalogId(String),

    #[error("Invalid object name: {0}")]
    InvalidObjectName(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON decoding error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}

impl TesscopeError {
    /// Wrap a transport failure, keeping connect timeouts apart from other failures.
    ///
    /// Arguments
    /// -----------------
    /// * `service`: name of the remote service, used in the message.
    /// * `err`: the error returned by the HTTP client.
    ///
    /// Return
    /// ----------
    /// * [`TesscopeError::ConnectTimeout`] for a connect or request timeout,
    ///   [`TesscopeError::QueryError`] otherwise.
    pub fn from_transport(service: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || (err.is_connect() && err.to_string().contains("timed out")) {
            TesscopeError::ConnectTimeout(service.to_string())
        } else {
            TesscopeError::QueryError(format!("{service}: {err}"))
        }
    }

    /// True when resubmitting the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            TesscopeError::ConnectTimeout(_) => true,
            TesscopeError::ReqwestError(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    /// Message shown to the end user, tailored for the errors they can act on.
    pub fn user_message(&self) -> String {
        match self {
            TesscopeError::InvalidInput(msg) => msg.clone(),
            TesscopeError::UnresolvedCatalogId(_) => "Error: Invalid TIC ID.".to_string(),
            TesscopeError::InvalidObjectName(_) => "Error: Invalid object name.".to_string(),
            TesscopeError::ConnectTimeout(_) => {
                "The connection to the MAST API timed out. Please try again later.".to_string()
            }
            other => format!("Error: {other}"),
        }
    }
}

impl PartialEq for TesscopeError {
    fn eq(&self, other: &Self) -> bool {
        use TesscopeError::*;
        match (self, other) {
            (InvalidInput(a), InvalidInput(b)) => a == b,
            (UnresolvedCatalogId(a), UnresolvedCatalogId(b)) => a == b,
            (InvalidObjectName(a), InvalidObjectName(b)) => a == b,
            (QueryError(a), QueryError(b)) => a == b,
            (ConnectTimeout(a), ConnectTimeout(b)) => a == b,
            (MalformedRecord(a), MalformedRecord(b)) => a == b,

            // foreign errors are not comparable: same variant is enough
            (ReqwestError(_), ReqwestError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (IoError(_), IoError(_)) => true,

            _ => false,
        }
    }
}
