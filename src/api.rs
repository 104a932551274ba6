//! Lock service operations.
//!
//! The service exposes everything as GET requests under a versioned base
//! path; even the mutating operations are retrieval requests carrying their
//! arguments as path segments. Responses are passed through for display;
//! the client only looks at the HTTP status and, where it needs them, the
//! `Token`/`ExpiresAt` fields of the body.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::client;
use crate::error::Error;
use crate::trace;

pub const DEFAULT_ENDPOINT: &str = "https://api.testandset.com";

const API_VERSION: &str = "v1";

/// The four logical operations against the remote service. The HTTP
/// implementation is [`Api`]; tests substitute scripted fakes.
pub trait MutexService {
    /// Try to take the named mutex once. `owner` is a visibility hint only
    /// and is attached to the request iff the caller supplied one.
    fn acquire(&self, name: &str, owner: Option<&str>) -> Result<AcquireOutcome, Error>;

    /// Fetch the service's representation of the mutex, whatever it is.
    fn inspect(&self, name: &str) -> Result<String, Error>;

    /// Extend the expiry of a held mutex.
    fn refresh(&self, name: &str, token: &str) -> Result<RefreshOutcome, Error>;

    /// Give the mutex back. Returns the service's response text; the caller
    /// decides what to do with a failure.
    fn release(&self, name: &str, token: &str) -> Result<String, Error>;
}

/// Payload of a successful acquire or refresh call. The raw body is kept
/// untouched so `json` output can print exactly what the service sent;
/// the typed fields are only extracted on demand.
#[derive(Debug, Clone)]
pub struct LockResult {
    pub raw: String,
}

impl LockResult {
    /// Parses the `Token`/`ExpiresAt` fields out of the body. A body that
    /// does not parse, or parses to an empty token, is unusable for refresh
    /// and release.
    pub fn answer(&self) -> Result<LockAnswer, Error> {
        let answer: LockAnswer =
            serde_json::from_str(&self.raw).map_err(|_| Error::MalformedResponse)?;
        if answer.token.is_empty() {
            return Err(Error::MalformedResponse);
        }
        Ok(answer)
    }
}

/// Wire fields of a lock/refresh response body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LockAnswer {
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "ExpiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum AcquireOutcome {
    Acquired(LockResult),
    /// Someone else holds the mutex. Not an error by itself; the acquisition
    /// controller decides whether to poll or give up.
    Contended,
}

pub enum RefreshOutcome {
    Refreshed(LockResult),
    /// The service refused the refresh; the body is kept for the
    /// single-shot `refresh` command, which prints it regardless.
    Denied(String),
}

/// HTTP implementation of [`MutexService`].
#[derive(Debug, Clone)]
pub struct Api {
    endpoint: String,
}

impl Api {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.endpoint, API_VERSION, path)
    }

    fn get(&self, path: &str) -> Result<(reqwest::StatusCode, String), Error> {
        let url = self.url(path);
        trace::trace(&format!("Calling {url}"));
        let response = client::CLIENT.get(url.as_str()).send()?;
        let status = response.status();
        let body = response.text()?;
        Ok((status, body))
    }
}

impl MutexService for Api {
    fn acquire(&self, name: &str, owner: Option<&str>) -> Result<AcquireOutcome, Error> {
        let path = match owner {
            Some(owner) => format!("mutex/{name}/lock?owner={owner}"),
            None => format!("mutex/{name}/lock"),
        };
        let (status, body) = self.get(&path)?;
        if status.is_success() {
            Ok(AcquireOutcome::Acquired(LockResult { raw: body }))
        } else {
            Ok(AcquireOutcome::Contended)
        }
    }

    fn inspect(&self, name: &str) -> Result<String, Error> {
        let (_status, body) = self.get(&format!("mutex/{name}"))?;
        Ok(body)
    }

    fn refresh(&self, name: &str, token: &str) -> Result<RefreshOutcome, Error> {
        let (status, body) = self.get(&format!("mutex/{name}/refresh/{token}"))?;
        if status.is_success() {
            Ok(RefreshOutcome::Refreshed(LockResult { raw: body }))
        } else {
            Ok(RefreshOutcome::Denied(body))
        }
    }

    fn release(&self, name: &str, token: &str) -> Result<String, Error> {
        let (_status, body) = self.get(&format!("mutex/{name}/unlock/{token}"))?;
        Ok(body)
    }
}
