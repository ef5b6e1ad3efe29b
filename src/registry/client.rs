use crate::config::Config;
use crate::core::{EsmError, EsmResult};
use crate::package::request::PackageRequest;
use crate::registry::document::{PackageDocument, ResolvedVersion};
use reqwest::{Client, StatusCode};

/// Client for an npm-compatible registry
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.registry_url)
    }

    /// Underlying HTTP client, shared with the archive fetcher
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Document URL for a package; scoped names encode their `/` as `%2F`
    pub fn package_url(&self, name: &str) -> String {
        match name.strip_prefix('@') {
            Some(scoped) => format!("{}/@{}", self.base_url, urlencoding::encode(scoped)),
            None => format!("{}/{}", self.base_url, urlencoding::encode(name)),
        }
    }

    /// Fetch the full package document
    pub async fn fetch_document(&self, name: &str) -> EsmResult<PackageDocument> {
        let url = self.package_url(name);
        tracing::debug!(%url, "fetching package document");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| EsmError::RegistryUnreachable(format!("{}: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(EsmError::PackageNotFound(name.to_string()));
        }
        if !response.status().is_success() {
            return Err(EsmError::RegistryUnreachable(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        // A body cut off mid-transfer is a transport failure; one that
        // arrives whole but does not decode is the registry's content
        let body = response
            .bytes()
            .await
            .map_err(|e| EsmError::RegistryUnreachable(format!("{}: {}", url, e)))?;

        serde_json::from_slice::<PackageDocument>(&body).map_err(|e| {
            EsmError::MalformedDocument {
                name: name.to_string(),
                reason: format!("{} ({})", e, url),
            }
        })
    }

    /// Resolve a request to a concrete version and its tarball
    pub async fn resolve(&self, request: &PackageRequest) -> EsmResult<ResolvedVersion> {
        let document = self.fetch_document(&request.name).await?;
        let resolved = document.resolve(&request.name, &request.version)?;
        tracing::info!(
            package = %resolved.name,
            selector = %request.version,
            version = %resolved.version,
            "resolved version"
        );
        Ok(resolved)
    }
}
