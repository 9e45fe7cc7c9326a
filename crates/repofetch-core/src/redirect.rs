//! Redirect following, bounded by a hop counter.
//!
//! Every hop is re-routed from scratch: a redirect may move between a swap
//! peer and the open internet. Each hop is a fresh connection with a fresh
//! timeout budget. There is no loop detection; the hop bound is the only limit.

use url::Url;

use crate::error::FetchError;
use crate::route::{Method, Response, RouteResolver};
use crate::sink::BodySink;

/// Redirects followed before the last response is returned as-is (Firefox's default).
pub const MAX_REDIRECTS: u32 = 20;

pub struct RedirectFollower<'a> {
    resolver: RouteResolver<'a>,
}

/// Final response of a chain plus how many redirects led to it.
#[derive(Debug)]
pub struct FollowedResponse {
    pub response: Response,
    pub hops: u32,
}

impl FollowedResponse {
    /// Still redirecting after the hop bound.
    pub fn exhausted(&self) -> bool {
        self.response.is_redirect()
    }
}

impl<'a> RedirectFollower<'a> {
    pub fn new(resolver: RouteResolver<'a>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &RouteResolver<'a> {
        &self.resolver
    }

    /// Issue `method` against `start`, following 3xx `Location`s. `extra`
    /// headers (e.g. `Range`) are sent on every hop. Only the body of a final
    /// 2xx response reaches `sink`.
    pub fn execute<'s>(
        &self,
        start: &Url,
        method: Method,
        extra: &[(String, String)],
        mut sink: Option<&mut (dyn BodySink + 's)>,
    ) -> Result<FollowedResponse, FetchError> {
        let mut url = start.clone();
        let mut hops = 0u32;
        loop {
            let decision = self.resolver.decide(&url, extra);
            let conn = self.resolver.open(&decision, method)?;
            let response = conn.perform(sink.as_deref_mut())?;

            if !response.is_redirect() || hops >= MAX_REDIRECTS {
                if response.is_redirect() {
                    tracing::warn!(
                        hops,
                        status = response.status,
                        "redirect limit reached; returning last response"
                    );
                }
                return Ok(FollowedResponse { response, hops });
            }

            url = next_hop(&url, &response)?;
            hops += 1;
            tracing::debug!(hop = hops, status = response.status, "following redirect");
        }
    }
}

/// Resolve a `Location` header against the URL that produced it.
fn next_hop(current: &Url, response: &Response) -> Result<Url, FetchError> {
    let location = response
        .location()
        .ok_or_else(|| FetchError::malformed("", format!("HTTP {} without Location", response.status)))?;
    let next = current
        .join(location)
        .map_err(|e| FetchError::malformed(location, e))?;
    match next.scheme() {
        "http" | "https" => Ok(next),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}
