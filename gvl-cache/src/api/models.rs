use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

/// The vendor list document as served by the endpoint.
///
/// Vendors are kept as raw JSON; they are decoded one by one on lookup so a
/// single malformed vendor never invalidates the whole list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorListDocument {
    pub vendor_list_version: u64,

    #[serde(default)]
    pub vendors: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}
