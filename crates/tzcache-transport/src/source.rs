//! The source trait the resolution engine consumes.

use tzcache_core::{AliasTable, TzId, TzResult};

use crate::types::{TzFetch, TzListResponse};

/// A provider of timezone definitions, id lists, and aliases.
///
/// [`TzClient`](crate::TzClient) implements this over HTTP; tests
/// drive the engine with in-memory fakes. Implementations must be
/// shareable across threads; all calls are blocking.
pub trait TimeZoneSource: Send + Sync {
    /// Fetches one timezone definition, conditionally when an etag is
    /// supplied.
    fn fetch_timezone(&self, tzid: &TzId, etag: Option<&str>) -> TzResult<TzFetch>;

    /// Fetches the id list, optionally restricted to changes since the
    /// given sync token.
    fn fetch_list(&self, changed_since: Option<&str>) -> TzResult<TzListResponse>;

    /// Fetches the alias table.
    fn fetch_aliases(&self) -> TzResult<AliasTable>;
}
