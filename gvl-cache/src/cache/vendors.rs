use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Metadata of a single vendor, decoded leniently from the vendor list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorRecord {
    pub id: u32,
    pub name: String,
    pub purposes: Vec<u32>,
    #[serde(rename = "legIntPurposes")]
    pub legitimate_interest_purposes: Vec<u32>,
    pub special_features: Vec<u32>,
    pub special_purposes: Vec<u32>,
    pub description: Option<String>,
    pub cookie_max_age_seconds: i64,
    pub uses_cookies: bool,
    pub uses_non_cookie_access: bool,
    pub policy_url: Option<String>,
}

impl VendorRecord {
    /// Decode a vendor entry. Only a value that is not an object is rejected,
    /// individual fields fall back to their defaults.
    pub fn from_json(id: u32, value: &Value) -> Option<Self> {
        let Some(object) = value.as_object() else {
            tracing::debug!("Vendor {} is not a JSON object, ignoring it", id);
            return None;
        };

        let name = match object.get("name").and_then(Value::as_str) {
            Some(name) => name.to_owned(),
            None => {
                tracing::debug!("Vendor {} has no name", id);
                format!("Vendor {id}")
            }
        };

        Some(Self {
            id,
            name,
            purposes: id_list(id, object, "purposes"),
            legitimate_interest_purposes: id_list(id, object, "legIntPurposes"),
            special_features: id_list(id, object, "specialFeatures"),
            special_purposes: id_list(id, object, "specialPurposes"),
            description: object
                .get("description")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
            cookie_max_age_seconds: object
                .get("cookieMaxAgeSeconds")
                .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
                .unwrap_or(0),
            uses_cookies: flag(object, "usesCookies"),
            uses_non_cookie_access: flag(object, "usesNonCookieAccess"),
            policy_url: object
                .get("policyUrl")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned),
        })
    }
}

fn id_list(vendor_id: u32, object: &Map<String, Value>, field: &str) -> Vec<u32> {
    let Some(value) = object.get(field) else {
        return Vec::new();
    };

    let Some(items) = value.as_array() else {
        tracing::debug!("Vendor {}: '{}' is not an array", vendor_id, field);
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let id = item.as_u64().and_then(|v| u32::try_from(v).ok());
            if id.is_none() {
                tracing::debug!("Vendor {}: skipping invalid id {} in '{}'", vendor_id, item, field);
            }
            id
        })
        .collect()
}

fn flag(object: &Map<String, Value>, field: &str) -> bool {
    object.get(field).and_then(Value::as_bool).unwrap_or(false)
}

/// A vendor as indexed for lookups.
///
/// `declared_name` is only set when the vendor list carries a string name,
/// name lookups never report the `Vendor <id>` placeholder of the record.
#[derive(Debug, Clone)]
pub(crate) struct IndexedVendor {
    pub(crate) declared_name: Option<String>,
    pub(crate) record: VendorRecord,
}

pub(crate) type VendorView = HashMap<u32, IndexedVendor>;

pub(crate) fn build_view(vendors: &Map<String, Value>) -> VendorView {
    vendors
        .iter()
        .filter_map(|(key, value)| {
            let Ok(id) = key.parse::<u32>() else {
                tracing::debug!("Ignoring vendor with non-numeric key '{}'", key);
                return None;
            };

            let record = VendorRecord::from_json(id, value)?;
            let declared_name = value
                .get("name")
                .and_then(Value::as_str)
                .map(ToOwned::to_owned);

            Some((
                id,
                IndexedVendor {
                    declared_name,
                    record,
                },
            ))
        })
        .collect()
}
