//! HTTP client for the provisioning service.

use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use wpfleet_common::{
    AddDomainRequest, CreateSiteRequest, CreateSiteResponse, DeleteSiteResponse, SiteList,
    SiteSummary,
};

use crate::errors::GatewayError;

/// One provisioner endpoint with its bearer key. Cheap to build per request,
/// so settings changes apply immediately.
#[derive(Debug, Clone)]
pub struct ProvisionerClient {
    http: reqwest::Client,
    base: Url,
    api_key: String,
}

impl ProvisionerClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        let base =
            Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            http,
            base,
            api_key: api_key.to_string(),
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        tracing::debug!(%method, %url, "calling provisioner");

        let mut req = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(text);
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn create_site(&self, req: &CreateSiteRequest) -> Result<CreateSiteResponse, GatewayError> {
        self.call(Method::POST, &["create-wordpress"], Some(req)).await
    }

    /// Returns the provisioner's response body untouched.
    pub async fn add_domain(&self, req: &AddDomainRequest) -> Result<serde_json::Value, GatewayError> {
        self.call(Method::POST, &["add-domain"], Some(req)).await
    }

    pub async fn list_sites(&self) -> Result<SiteList, GatewayError> {
        self.call::<(), _>(Method::GET, &["list-sites"], None).await
    }

    pub async fn status(&self, site_id: &str) -> Result<SiteSummary, GatewayError> {
        self.call::<(), _>(Method::GET, &["status", site_id], None).await
    }

    pub async fn delete_site(&self, site_id: &str) -> Result<DeleteSiteResponse, GatewayError> {
        self.call::<(), _>(Method::DELETE, &["delete-wordpress", site_id], None)
            .await
    }
}
