//! Shared HTTP plumbing for every report source.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::credential::Credential;
use crate::error::SourceError;

/// Query for endpoints that take no parameters.
pub const NO_QUERY: &[(&str, &str)] = &[];

/// Authenticated JSON client bound to one source base URL.
///
/// Every request carries the configured [`Credential`] and the client-wide
/// timeout. Requests are never retried here: a connectivity failure fails the
/// run and the next scheduled run tries again.
pub struct SourceHttp {
    client: Client,
    base_url: Url,
    credential: Credential,
}

impl SourceHttp {
    /// Creates a client for `base_url` with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// - [`SourceError::InvalidBaseUrl`] if `base_url` is not an absolute
    ///   http(s) URL.
    /// - [`SourceError::ClientSetup`] if the underlying `reqwest::Client`
    ///   cannot be constructed.
    pub fn new(
        base_url: &str,
        credential: Credential,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()
            .map_err(SourceError::ClientSetup)?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url)?,
            credential,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `path` (relative, no leading slash needed) against the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::InvalidBaseUrl`] if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| SourceError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: format!("cannot join \"{path}\": {e}"),
            })
    }

    /// GETs `path` with `query` encoded as URL parameters and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// - [`SourceError::Authentication`] on HTTP 401, 403, or an Azure-style
    ///   203 sign-in page.
    /// - [`SourceError::Connectivity`] on timeout, connection failure, or a
    ///   body that cannot be read.
    /// - [`SourceError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`SourceError::Deserialize`] if the body does not match `T`.
    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, SourceError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint(path)?;
        let request = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query);
        let request = self.credential.apply(request);

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Connectivity {
                url: url.to_string(),
                source: e,
            })?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SourceError::Authentication {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        // Azure DevOps answers a rejected PAT with 203 and an HTML sign-in page.
        if status == StatusCode::NON_AUTHORITATIVE_INFORMATION {
            return Err(SourceError::Authentication {
                url: url.to_string(),
                reason: "redirected to interactive sign-in".to_owned(),
            });
        }

        if !status.is_success() {
            return Err(SourceError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Connectivity {
                url: url.to_string(),
                source: e,
            })?;

        serde_json::from_str::<T>(&body).map_err(|e| SourceError::Deserialize {
            context: format!("GET {}", url.path()),
            source: e,
        })
    }
}

impl std::fmt::Debug for SourceHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceHttp")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

/// Ensures the base URL is absolute http(s) and ends with exactly one slash,
/// so relative joins append to the path instead of replacing its last segment.
fn normalize_base_url(raw: &str) -> Result<Url, SourceError> {
    let trimmed = raw.trim();
    let normalized = format!("{}/", trimmed.trim_end_matches('/'));
    let url = Url::parse(&normalized).map_err(|e| SourceError::InvalidBaseUrl {
        url: raw.to_owned(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SourceError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: format!("unsupported scheme \"{}\"", url.scheme()),
        });
    }

    if url.query().is_some() {
        return Err(SourceError::InvalidBaseUrl {
            url: raw.to_owned(),
            reason: "base URL must not carry a query string".to_owned(),
        });
    }

    Ok(url)
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
