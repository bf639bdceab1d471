/// Raw vendor list document as received from the endpoint.
pub const DOCUMENT_KEY: &str = "gvl_cache";

/// `vendorListVersion` of the stored document, as a decimal string.
pub const VERSION_KEY: &str = "gvl_version";

/// Epoch milliseconds of the download that produced the stored document.
pub const TIMESTAMP_KEY: &str = "gvl_timestamp";

pub const ALL_KEYS: [&str; 3] = [DOCUMENT_KEY, VERSION_KEY, TIMESTAMP_KEY];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Text(String),
    Integer(i64),
}

impl StoredValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}
