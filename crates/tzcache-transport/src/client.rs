//! HTTP client for the timezone service.
//!
//! Construction performs discovery: the configured location is probed
//! with `?action=capabilities`, following at most
//! [`MAX_DISCOVERY_REDIRECTS`] redirects (the query string of a
//! `Location` target is stripped). Redirect handling is done here, not
//! by reqwest, so the bound and the stripping rule are owned by this
//! loop.

use reqwest::blocking::{Client, Response};
use reqwest::header::{ETAG, IF_NONE_MATCH, LOCATION};
use reqwest::{StatusCode, redirect};
use tracing::{debug, trace, warn};
use url::Url;

use tzcache_core::{AliasTable, TzError, TzId, TzResult};

use crate::config::TransportConfig;
use crate::source::TimeZoneSource;
use crate::types::{Capabilities, TzFetch, TzListResponse};

/// Maximum number of redirects followed during discovery.
pub const MAX_DISCOVERY_REDIRECTS: usize = 10;

/// Blocking HTTP client bound to one discovered service URL.
///
/// Holds only the underlying `reqwest` client (internally
/// synchronized) and immutable discovery results; every call builds a
/// fresh request and consumes its own response, so a shared instance
/// is safe to use from multiple threads.
pub struct TzClient {
    http: Client,
    base: Url,
    capabilities: Option<Capabilities>,
}

impl TzClient {
    /// Discovers the service endpoint and returns a bound client.
    ///
    /// # Errors
    ///
    /// Fails with `DiscoveryFailed` on a non-200 non-redirect probe
    /// status, a redirect without a usable `Location`, or when the
    /// redirect bound is exceeded. A capabilities document that does
    /// not parse is logged and ignored.
    pub fn discover(config: TransportConfig) -> TzResult<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| TzError::network("failed to create HTTP client").with_source(e))?;

        let mut url = config.initial_url()?;
        let mut redirects = 0usize;

        loop {
            let probe = with_query(&url, &[("action", "capabilities")]);
            trace!(url = %probe, "discovery probe");
            let response = http
                .get(probe)
                .send()
                .map_err(|e| TzError::discovery("discovery request failed").with_source(e))?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().map_err(|e| {
                        TzError::discovery("failed to read capabilities").with_source(e)
                    })?;
                    let capabilities = match serde_json::from_str::<Capabilities>(&body) {
                        Ok(caps) => Some(caps),
                        Err(e) => {
                            warn!(url = %url, error = %e, "unparsable capabilities document");
                            None
                        }
                    };
                    debug!(url = %url, redirects = redirects, "timezone service discovered");
                    return Ok(Self {
                        http,
                        base: url,
                        capabilities,
                    });
                }
                StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::TEMPORARY_REDIRECT => {
                    redirects += 1;
                    if redirects > MAX_DISCOVERY_REDIRECTS {
                        return Err(TzError::discovery(format!(
                            "gave up after {MAX_DISCOVERY_REDIRECTS} redirects"
                        )));
                    }
                    let location = response
                        .headers()
                        .get(LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| TzError::discovery("redirect without Location header"))?;
                    let mut target = url.join(location).map_err(|e| {
                        TzError::discovery(format!("bad redirect target {location:?}"))
                            .with_source(e)
                    })?;
                    target.set_query(None);
                    target.set_fragment(None);
                    debug!(from = %url, to = %target, "following discovery redirect");
                    url = target;
                }
                status => {
                    return Err(TzError::discovery(format!(
                        "discovery failed with status {status}"
                    )));
                }
            }
        }
    }

    /// Returns the discovered service URL.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Returns the capabilities captured at discovery, if they parsed.
    pub fn capabilities(&self) -> Option<&Capabilities> {
        self.capabilities.as_ref()
    }

    /// Fetches one timezone definition.
    ///
    /// With an etag the fetch is conditional: 204 means unchanged.
    /// 404 is a typed `Missing`, never conflated with transport
    /// failure.
    pub fn get_timezone(&self, tzid: &TzId, etag: Option<&str>) -> TzResult<TzFetch> {
        let url = with_query(&self.base, &[("action", "get"), ("tzid", tzid.as_str())]);
        trace!(url = %url, tzid = %tzid, conditional = etag.is_some(), "fetching timezone");

        let mut request = self.http.get(url);
        if let Some(etag) = etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        let response = request
            .send()
            .map_err(|e| TzError::network(format!("timezone fetch failed: {tzid}")).with_source(e))?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(TzFetch::NotModified),
            StatusCode::OK => {
                let etag = response
                    .headers()
                    .get(ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                let vtimezone = read_body(response)?;
                Ok(TzFetch::Found { etag, vtimezone })
            }
            StatusCode::NOT_FOUND => {
                debug!(tzid = %tzid, "timezone not known to service");
                Ok(TzFetch::Missing)
            }
            status => Err(self.unexpected_status("get", status)),
        }
    }

    /// Fetches the id list.
    pub fn get_list(&self, changed_since: Option<&str>) -> TzResult<TzListResponse> {
        let mut pairs = vec![("action", "list")];
        if let Some(token) = changed_since {
            pairs.push(("changedsince", token));
        }
        let url = with_query(&self.base, &pairs);
        trace!(url = %url, "fetching timezone list");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| TzError::network("list fetch failed").with_source(e))?;
        if response.status() != StatusCode::OK {
            return Err(self.unexpected_status("list", response.status()));
        }
        let body = read_body(response)?;
        serde_json::from_str(&body)
            .map_err(|e| TzError::invalid_response("unparsable list response").with_source(e))
    }

    /// Fetches the alias table.
    pub fn get_aliases(&self) -> TzResult<AliasTable> {
        let mut url = self.base.clone();
        url.set_query(Some("aliases"));
        trace!(url = %url, "fetching aliases");

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| TzError::network("alias fetch failed").with_source(e))?;
        if response.status() != StatusCode::OK {
            return Err(self.unexpected_status("aliases", response.status()));
        }
        let table = AliasTable::parse(&read_body(response)?);
        debug!(aliases = table.len(), "loaded alias table");
        Ok(table)
    }

    fn unexpected_status(&self, action: &str, status: StatusCode) -> TzError {
        if status.is_server_error() {
            TzError::network(format!("server error on {action}: {status}"))
        } else {
            TzError::invalid_response(format!("unexpected status on {action}: {status}"))
        }
    }
}

impl TimeZoneSource for TzClient {
    fn fetch_timezone(&self, tzid: &TzId, etag: Option<&str>) -> TzResult<TzFetch> {
        self.get_timezone(tzid, etag)
    }

    fn fetch_list(&self, changed_since: Option<&str>) -> TzResult<TzListResponse> {
        self.get_list(changed_since)
    }

    fn fetch_aliases(&self) -> TzResult<AliasTable> {
        self.get_aliases()
    }
}

impl std::fmt::Debug for TzClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TzClient")
            .field("base", &self.base.as_str())
            .field("capabilities", &self.capabilities.is_some())
            .finish_non_exhaustive()
    }
}

/// Returns `base` with the given query pairs (replacing any existing
/// query).
fn with_query(base: &Url, pairs: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, value);
        }
    }
    url
}

fn read_body(response: Response) -> TzResult<String> {
    response
        .text()
        .map_err(|e| TzError::network("failed to read response body").with_source(e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_query_replaces_and_encodes() {
        let base = Url::parse("https://tz.example.com/tzsvr?stale=1").unwrap();
        let url = with_query(&base, &[("action", "get"), ("tzid", "America/New_York")]);
        assert_eq!(
            url.as_str(),
            "https://tz.example.com/tzsvr?action=get&tzid=America%2FNew_York"
        );
    }

    #[test]
    fn with_query_keeps_path() {
        let base = Url::parse("http://127.0.0.1:8080/.well-known/timezone").unwrap();
        let url = with_query(&base, &[("action", "capabilities")]);
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/.well-known/timezone?action=capabilities"
        );
    }
}
