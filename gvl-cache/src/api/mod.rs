mod models;
pub use models::*;

use crate::config::GvlConfig;
use crate::error::GvlError;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use std::sync::Arc;

/// Outbound HTTP capability used to retrieve the vendor list.
///
/// Only transport failures are errors here, any received status is returned
/// to the caller as part of the [`FetchResponse`].
pub trait HttpFetch: Send + Sync + 'static {
    fn get(&self, url: Url) -> impl Future<Output = Result<FetchResponse, GvlError>> + Send;
}

impl<F: HttpFetch> HttpFetch for Arc<F> {
    fn get(&self, url: Url) -> impl Future<Output = Result<FetchResponse, GvlError>> + Send {
        (**self).get(url)
    }
}

#[derive(Debug, Clone)]
pub struct VendorListApi {
    client: Client,
}

impl VendorListApi {
    /// Prepare the API client.
    pub fn new(config: &GvlConfig) -> Result<Self, GvlError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .redirect(Policy::limited(10))
            .hickory_dns(true)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self { client })
    }
}

impl HttpFetch for VendorListApi {
    #[tracing::instrument(skip_all, fields(url = url.as_str()))]
    async fn get(&self, url: Url) -> Result<FetchResponse, GvlError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        let body = response.bytes().await?.to_vec();
        tracing::trace!("Received {} bytes with status {}", body.len(), status);

        Ok(FetchResponse { status, body })
    }
}

/// Build the request URL for the vendor list, optionally pinned to a version.
pub fn vendor_list_url(endpoint: &Url, version: Option<&str>) -> Url {
    let mut url = endpoint.clone();

    if let Some(version) = version {
        url.query_pairs_mut().append_pair("version", version);
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://vendor-list.consensu.org/v3/vendor-list.json").unwrap()
    }

    #[test]
    fn url_without_version_is_the_endpoint() {
        assert_eq!(vendor_list_url(&endpoint(), None), endpoint());
    }

    #[test]
    fn url_with_version_appends_query() {
        let url = vendor_list_url(&endpoint(), Some("42"));
        assert_eq!(
            url.as_str(),
            "https://vendor-list.consensu.org/v3/vendor-list.json?version=42"
        );
    }

    #[test]
    fn url_keeps_existing_query() {
        let base = Url::parse("https://example.com/gvl.json?lang=fr").unwrap();
        let url = vendor_list_url(&base, Some("7"));
        assert_eq!(url.as_str(), "https://example.com/gvl.json?lang=fr&version=7");
    }

    #[test]
    fn document_without_vendors_is_empty() {
        let document: VendorListDocument =
            serde_json::from_str(r#"{"vendorListVersion":3}"#).unwrap();
        assert_eq!(document.vendor_list_version, 3);
        assert!(document.vendors.is_empty());
    }

    #[test]
    fn document_requires_version() {
        let result = serde_json::from_str::<VendorListDocument>(r#"{"vendors":{}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn document_ignores_unknown_fields() {
        let document: VendorListDocument = serde_json::from_str(
            r#"{"gvlSpecificationVersion":3,"vendorListVersion":9,"tcfPolicyVersion":5,"vendors":{"1":{"name":"Acme"}}}"#,
        )
        .unwrap();
        assert_eq!(document.vendor_list_version, 9);
        assert_eq!(document.vendors.len(), 1);
    }
}
