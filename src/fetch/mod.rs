//! Minimal HTTP plumbing shared by the external service clients.
//!
//! [`HttpClient`] is the seam: the real [`BasicClient`] wraps `reqwest` with a
//! fixed timeout, and [`auth::UrlParam`] layers an API key on top of it.

mod basic;
pub mod auth;

pub use basic::BasicClient;

use async_trait::async_trait;
use reqwest::{Request, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{DashboardError, Result};

/// Sends one prepared request. Wrappers such as [`auth::UrlParam`] decorate
/// the request before handing it to the inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Issues a GET for `url` with the given query pairs and decodes the JSON body.
///
/// Non-2xx statuses are reported as [`DashboardError::Request`].
pub async fn fetch_json<C, T>(client: &C, url: &str, query: &[(&str, String)]) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let mut url = reqwest::Url::parse(url)
        .map_err(|e| DashboardError::ServiceUnavailable(format!("invalid service URL `{url}`: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        for (name, value) in query {
            pairs.append_pair(name, value);
        }
    }

    debug!(path = url.path(), "Sending GET request");
    let req = Request::new(reqwest::Method::GET, url);
    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.json::<T>().await?)
}
