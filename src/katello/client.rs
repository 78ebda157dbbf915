//! HTTP client for the Katello API
//!
//! One `reqwest::Client` is built per run and reused for every request so
//! concurrent repository fetches share its connection pool. All requests use
//! basic auth; all non-2xx responses are mapped into
//! [`SatelliteError::Remote`] with the server's `displayMessage` when the
//! body carries one.
//!
//! Server-side search is substring-based, so the `find_*` accessors filter
//! the result list by exact label equality before returning a match.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::core::config::SatelliteConfig;
use crate::core::error::SatelliteError;
use crate::katello::entities::{
    ContentView, ContentViewVersion, LifecycleEnvironment, Organization, PromoteRequest,
    PublishRequest, PublishResponse, Repository, SearchResults,
};

/// The slice of the API the orchestration layer calls.
///
/// Kept separate from the resolution accessors so tests can substitute a
/// scripted implementation.
#[async_trait]
pub trait KatelloApi: Send + Sync {
    async fn repository(&self, id: u64) -> Result<Repository, SatelliteError>;

    async fn content_view(&self, id: u64) -> Result<ContentView, SatelliteError>;

    async fn content_view_version(&self, id: u64) -> Result<ContentViewVersion, SatelliteError>;

    async fn publish_content_view(
        &self,
        content_view_id: u64,
        request: &PublishRequest,
    ) -> Result<PublishResponse, SatelliteError>;

    async fn promote_version(
        &self,
        version_id: u64,
        request: &PromoteRequest,
    ) -> Result<(), SatelliteError>;
}

pub struct KatelloClient {
    http: reqwest::Client,
    config: SatelliteConfig,
}

impl KatelloClient {
    pub fn new(config: SatelliteConfig) -> Result<Self, SatelliteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { http, config })
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/katello/api{}",
            self.config.url.trim_end_matches('/'),
            endpoint
        )
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, SatelliteError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, SatelliteError> {
        let url = self.url(endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .basic_auth(
                &self.config.username,
                Some(self.config.password.expose_secret()),
            )
            .json(body)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SatelliteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(remote_error(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }

    /// Resolve an organization by exact label
    pub async fn find_organization(
        &self,
        label: &str,
    ) -> Result<Organization, SatelliteError> {
        let found: SearchResults<Organization> =
            self.get(&format!("/organizations?search={label}")).await?;

        exact_match(found.results, label, |org| &org.label).ok_or_else(|| {
            SatelliteError::OrganizationNotFound {
                label: label.to_string(),
            }
        })
    }

    /// Resolve a content view by exact label within an organization
    pub async fn find_content_view(
        &self,
        org_id: u64,
        label: &str,
    ) -> Result<ContentView, SatelliteError> {
        let found: SearchResults<ContentView> = self
            .get(&format!("/organizations/{org_id}/content_views?search={label}"))
            .await?;

        exact_match(found.results, label, |cv| &cv.label).ok_or_else(|| {
            SatelliteError::ContentViewNotFound {
                label: label.to_string(),
            }
        })
    }

    /// Resolve a lifecycle environment by exact label within an organization
    pub async fn find_environment(
        &self,
        org_id: u64,
        label: &str,
    ) -> Result<LifecycleEnvironment, SatelliteError> {
        let found: SearchResults<LifecycleEnvironment> = self
            .get(&format!("/organizations/{org_id}/environments?search={label}"))
            .await?;

        exact_match(found.results, label, |env| &env.label).ok_or_else(|| {
            SatelliteError::EnvironmentNotFound {
                label: label.to_string(),
            }
        })
    }
}

#[async_trait]
impl KatelloApi for KatelloClient {
    async fn repository(&self, id: u64) -> Result<Repository, SatelliteError> {
        self.get(&format!("/repositories/{id}")).await
    }

    async fn content_view(&self, id: u64) -> Result<ContentView, SatelliteError> {
        self.get(&format!("/content_views/{id}")).await
    }

    async fn content_view_version(&self, id: u64) -> Result<ContentViewVersion, SatelliteError> {
        self.get(&format!("/content_view_versions/{id}")).await
    }

    async fn publish_content_view(
        &self,
        content_view_id: u64,
        request: &PublishRequest,
    ) -> Result<PublishResponse, SatelliteError> {
        self.post(&format!("/content_views/{content_view_id}/publish"), request)
            .await
    }

    async fn promote_version(
        &self,
        version_id: u64,
        request: &PromoteRequest,
    ) -> Result<(), SatelliteError> {
        // The promote response is another async task ref; completion is
        // tracked through the version's last_event, so the body is dropped.
        let _: serde_json::Value = self
            .post(&format!("/content_view_versions/{version_id}/promote"), request)
            .await?;
        Ok(())
    }
}

/// Server search is fuzzy; require exact label equality on the results
fn exact_match<T, F>(results: Vec<T>, label: &str, key: F) -> Option<T>
where
    F: Fn(&T) -> &str,
{
    results.into_iter().find(|item| key(item) == label)
}

/// Build a [`SatelliteError::Remote`] from a non-2xx response body,
/// preferring the JSON `displayMessage` field when present
fn remote_error(status: u16, body: &str) -> SatelliteError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("displayMessage")?.as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    SatelliteError::Remote { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_filters_fuzzy_results() {
        // A search for "le_prod" also returns "le_prod_old" on the server side
        let results = vec![
            Organization {
                id: 1,
                label: "le_prod_old".to_string(),
            },
            Organization {
                id: 2,
                label: "le_prod".to_string(),
            },
        ];

        let found = exact_match(results, "le_prod", |org| &org.label).unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn test_exact_match_rejects_substring_only_results() {
        let results = vec![Organization {
            id: 1,
            label: "le_prod_old".to_string(),
        }];

        assert!(exact_match(results, "le_prod", |org| &org.label).is_none());
    }

    #[test]
    fn test_remote_error_prefers_display_message() {
        let error = remote_error(
            422,
            r#"{"displayMessage": "Version 5.12 has already been taken", "errors": {}}"#,
        );

        match error {
            SatelliteError::Remote { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Version 5.12 has already been taken");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_remote_error_falls_back_to_raw_body() {
        let error = remote_error(502, "Bad Gateway\n");

        match error {
            SatelliteError::Remote { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
