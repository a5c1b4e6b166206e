use std::fmt;

use async_trait::async_trait;
use reqwest::Url;

use crate::fetch::HttpClient;

/// Query parameter Google Maps web services read the key from.
pub const GOOGLE_KEY_PARAM: &str = "key";

/// Wraps an [`HttpClient`] and appends `param=<key>` to every request URL.
pub struct UrlParam<C> {
    inner: C,
    param: &'static str,
    key: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param: &'static str, key: String) -> Self {
        Self { inner, param, key }
    }

    pub fn google(inner: C, key: String) -> Self {
        Self::new(inner, GOOGLE_KEY_PARAM, key)
    }

    fn apply(&self, url: &mut Url) {
        url.query_pairs_mut().append_pair(self.param, &self.key);
    }
}

// Keeps the key out of logs and panic messages.
impl<C> fmt::Debug for UrlParam<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlParam")
            .field("param", &self.param)
            .field("key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.apply(req.url_mut());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_appended_after_existing_query() {
        let client = UrlParam::google((), "secret-123".to_string());
        let mut url = Url::parse("https://maps.example/geocode/json?address=Perth").unwrap();
        client.apply(&mut url);
        assert_eq!(url.query(), Some("address=Perth&key=secret-123"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = UrlParam::google((), "secret-123".to_string());
        let printed = format!("{client:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("secret-123"));
    }
}
