//! Typed surface over the InfluxDB v2 HTTP API.
//!
//! Only the calls the sink needs: health probe, organization and bucket
//! lookup/create, and the line-protocol write endpoint. Everything else
//! about the wire protocol belongs to the backend.

use std::io::Write as _;
use std::time::Duration;

use flate2::write::GzEncoder;
use flate2::Compression;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pointsink_types::Precision;

use crate::{Config, SinkError};

/// Retention of the longest duration the API's rule type admits,
/// i.e. "expire never".
pub(crate) const EXPIRE_NEVER_SECONDS: i64 = i32::MAX as i64;

/// Thin client for the handful of v2 API calls the sink performs.
#[derive(Debug)]
pub(crate) struct InfluxApi {
    http: Client,
    base: String,
    token: String,
    gzip: bool,
}

impl InfluxApi {
    /// Build the HTTP client. No network call happens here.
    pub(crate) fn new(config: &Config, gzip: bool, timeout: Duration) -> Result<Self, SinkError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            gzip,
        })
    }

    /// Probe `/health`. Anything other than a passing report is an error.
    pub(crate) async fn health(&self) -> Result<(), SinkError> {
        let response = self
            .http
            .get(format!("{}/health", self.base))
            .header("Authorization", self.auth())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SinkError::Unhealthy(format!(
                "endpoint returned status {}",
                response.status()
            )));
        }

        let report: HealthCheck = response
            .json()
            .await
            .map_err(|e| SinkError::Unhealthy(e.to_string()))?;

        if report.status != "pass" {
            return Err(SinkError::Unhealthy(
                report.message.unwrap_or(report.status),
            ));
        }

        debug!("health probe passed");
        Ok(())
    }

    /// Look up an organization by name.
    pub(crate) async fn find_org(&self, name: &str) -> Result<Option<Organization>, SinkError> {
        let response = self
            .http
            .get(format!("{}/api/v2/orgs", self.base))
            .header("Authorization", self.auth())
            .query(&[("org", name)])
            .send()
            .await?;

        // The orgs listing 404s when the filter matches nothing.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response).await?;

        let list: OrganizationList = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(list.orgs.into_iter().find(|o| o.name == name))
    }

    /// Create an organization. Returns `None` when the name already exists,
    /// so a lost creation race reads as success for the caller.
    pub(crate) async fn create_org(&self, name: &str) -> Result<Option<Organization>, SinkError> {
        let response = self
            .http
            .post(format!("{}/api/v2/orgs", self.base))
            .header("Authorization", self.auth())
            .json(&CreateOrg { name })
            .send()
            .await?;

        if already_exists(response.status()) {
            return Ok(None);
        }
        let response = check(response).await?;

        let org: Organization = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(Some(org))
    }

    /// Look up a bucket by name within an organization.
    pub(crate) async fn find_bucket(
        &self,
        org_id: &str,
        name: &str,
    ) -> Result<Option<Bucket>, SinkError> {
        let response = self
            .http
            .get(format!("{}/api/v2/buckets", self.base))
            .header("Authorization", self.auth())
            .query(&[("orgID", org_id), ("name", name)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response).await?;

        let list: BucketList = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(list.buckets.into_iter().find(|b| b.name == name))
    }

    /// Create a bucket with an "expire never" retention rule. Returns
    /// `None` when the name already exists within the organization.
    pub(crate) async fn create_bucket(
        &self,
        org_id: &str,
        name: &str,
    ) -> Result<Option<Bucket>, SinkError> {
        let body = CreateBucket {
            org_id,
            name,
            retention_rules: vec![RetentionRule {
                rule_type: "expire".to_string(),
                every_seconds: EXPIRE_NEVER_SECONDS,
            }],
        };

        let response = self
            .http
            .post(format!("{}/api/v2/buckets", self.base))
            .header("Authorization", self.auth())
            .json(&body)
            .send()
            .await?;

        if already_exists(response.status()) {
            return Ok(None);
        }
        let response = check(response).await?;

        let bucket: Bucket = response
            .json()
            .await
            .map_err(|e| SinkError::Http(e.to_string()))?;
        Ok(Some(bucket))
    }

    /// Write a line-protocol body, gzip-compressed when enabled.
    pub(crate) async fn write(
        &self,
        org: &str,
        bucket: &str,
        precision: Precision,
        body: String,
    ) -> Result<(), SinkError> {
        let request = self
            .http
            .post(format!("{}/api/v2/write", self.base))
            .header("Authorization", self.auth())
            .header("Content-Type", "text/plain; charset=utf-8")
            .query(&[
                ("org", org),
                ("bucket", bucket),
                ("precision", precision.as_str()),
            ]);

        let request = if self.gzip {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(body.as_bytes())
                .map_err(|e| SinkError::Compress(e.to_string()))?;
            let compressed = encoder
                .finish()
                .map_err(|e| SinkError::Compress(e.to_string()))?;
            request.header("Content-Encoding", "gzip").body(compressed)
        } else {
            request.body(body)
        };

        let response = request.send().await?;
        check(response).await?;
        Ok(())
    }

    fn auth(&self) -> String {
        format!("Token {}", self.token)
    }
}

/// Map a non-success response into the error taxonomy.
async fn check(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SinkError::Auth("invalid credentials".to_string()));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SinkError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

/// The API reports a duplicate name as a conflict or an unprocessable
/// entity, depending on the resource.
fn already_exists(status: StatusCode) -> bool {
    status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY
}

#[derive(Debug, Deserialize)]
struct HealthCheck {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// An organization as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Organization {
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationList {
    #[serde(default)]
    orgs: Vec<Organization>,
}

/// A bucket as reported by the API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Bucket {
    #[allow(dead_code)]
    pub(crate) id: String,
    pub(crate) name: String,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize)]
struct CreateOrg<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateBucket<'a> {
    #[serde(rename = "orgID")]
    org_id: &'a str,
    name: &'a str,
    #[serde(rename = "retentionRules")]
    retention_rules: Vec<RetentionRule>,
}

#[derive(Debug, Serialize)]
struct RetentionRule {
    #[serde(rename = "type")]
    rule_type: String,
    #[serde(rename = "everySeconds")]
    every_seconds: i64,
}
