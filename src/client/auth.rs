use std::fmt;

use reqwest::RequestBuilder;

/// Adds credentials (or any other header) to outgoing list and watch
/// requests.
pub trait RequestDecorator: Send + Sync + 'static {
    fn decorate(
        &self,
        request: RequestBuilder,
    ) -> RequestBuilder;
}

/// Sends requests as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl RequestDecorator for NoAuth {
    fn decorate(
        &self,
        request: RequestBuilder,
    ) -> RequestBuilder {
        request
    }
}

/// `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

impl RequestDecorator for BearerToken {
    fn decorate(
        &self,
        request: RequestBuilder,
    ) -> RequestBuilder {
        request.bearer_auth(&self.0)
    }
}
