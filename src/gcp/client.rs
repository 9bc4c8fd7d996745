//! GCP Client
//!
//! Main client for interacting with the Dataflow API, combining authentication
//! and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use anyhow::{Context, Result};
use serde_json::Value;
use url::Url;

/// Production Dataflow endpoint
pub const DEFAULT_DATAFLOW_ENDPOINT: &str = "https://dataflow.googleapis.com";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    endpoint: Url,
}

impl GcpClient {
    /// Create a new client using ambient credentials
    pub async fn new(endpoint: Option<&str>) -> Result<Self> {
        let credentials = GcpCredentials::new()
            .await
            .context("Failed to initialize GCP credentials")?;

        Self::with_credentials(credentials, endpoint)
    }

    /// Create a client from explicit credentials
    pub fn with_credentials(credentials: GcpCredentials, endpoint: Option<&str>) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint.unwrap_or(DEFAULT_DATAFLOW_ENDPOINT))?;
        let http = GcpHttpClient::new()?;

        Ok(Self {
            credentials,
            http,
            endpoint,
        })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a PUT request to a GCP API
    pub async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        let token = self.credentials.get_token().await?;
        self.http.put(url, &token, body).await
    }

    // =========================================================================
    // Dataflow API helpers
    // =========================================================================

    /// Build a Dataflow v1b3 project-scoped URL
    pub fn dataflow_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/v1b3/projects/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            urlencoding::encode(project),
            path
        )
    }

    /// URL for launching a job from a classic template
    pub fn dataflow_templates_url(&self, project: &str) -> String {
        self.dataflow_url(project, "templates")
    }

    /// URL for a single job
    pub fn dataflow_job_url(&self, project: &str, job_id: &str) -> String {
        self.dataflow_url(project, &format!("jobs/{}", urlencoding::encode(job_id)))
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("Invalid Dataflow endpoint: {}", raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!("Dataflow endpoint must be http(s): {}", raw);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> GcpClient {
        GcpClient::with_credentials(GcpCredentials::from_static_token("t"), Some(endpoint)).unwrap()
    }

    #[test]
    fn test_default_endpoint_urls() {
        let c = GcpClient::with_credentials(GcpCredentials::from_static_token("t"), None).unwrap();
        assert_eq!(
            c.dataflow_templates_url("my-project"),
            "https://dataflow.googleapis.com/v1b3/projects/my-project/templates"
        );
        assert_eq!(
            c.dataflow_job_url("my-project", "2024-job-1"),
            "https://dataflow.googleapis.com/v1b3/projects/my-project/jobs/2024-job-1"
        );
    }

    #[test]
    fn test_custom_endpoint_and_encoding() {
        let c = client("http://127.0.0.1:8080/");
        assert_eq!(
            c.dataflow_job_url("my-project", "a/b"),
            "http://127.0.0.1:8080/v1b3/projects/my-project/jobs/a%2Fb"
        );
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let err = GcpClient::with_credentials(GcpCredentials::from_static_token("t"), Some("ftp://x"));
        assert!(err.is_err());
        let err = GcpClient::with_credentials(GcpCredentials::from_static_token("t"), Some("not a url"));
        assert!(err.is_err());
    }
}
