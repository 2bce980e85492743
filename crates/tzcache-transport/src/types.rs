//! Wire types for the timezone service API.

use serde::Deserialize;

/// Outcome of one (possibly conditional) timezone fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TzFetch {
    /// The server returned a definition.
    Found {
        /// Validation token for later conditional fetches, verbatim.
        etag: Option<String>,
        /// Raw iCalendar text containing the VTIMEZONE.
        vtimezone: String,
    },
    /// Unchanged since the supplied etag.
    NotModified,
    /// The service has no data for this id.
    Missing,
}

/// Service metadata returned by the capabilities action.
///
/// Captured best-effort at discovery time; every field is optional and
/// an unparsable document is ignored entirely.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Capabilities {
    /// Protocol version advertised by the server.
    pub version: Option<i64>,
    /// Informational block about the server and its data source.
    #[serde(default)]
    pub info: Option<CapabilitiesInfo>,
    /// Actions the server supports.
    #[serde(default)]
    pub actions: Vec<CapabilityAction>,
}

/// The `info` block of a capabilities document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapabilitiesInfo {
    /// Upstream timezone data source.
    #[serde(rename = "primary-source")]
    pub primary_source: Option<String>,
    /// Contact addresses for the server operators.
    #[serde(default)]
    pub contacts: Vec<String>,
}

/// One advertised action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapabilityAction {
    /// Action name (e.g. `get`, `list`).
    pub name: String,
    /// Parameters the action accepts.
    #[serde(default)]
    pub parameters: Vec<CapabilityParameter>,
}

/// One parameter of an advertised action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapabilityParameter {
    /// Parameter name.
    pub name: String,
    /// Whether the parameter is required.
    #[serde(default)]
    pub required: bool,
}

/// JSON body of the list action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TzListResponse {
    /// Opaque token for incremental listing.
    pub synctoken: Option<String>,
    /// The listed timezones.
    #[serde(default)]
    pub timezones: Vec<TzListEntry>,
}

/// One entry of the list response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TzListEntry {
    /// Canonical timezone id.
    pub tzid: String,
    /// Current validation token for the id's definition.
    pub etag: Option<String>,
    /// Last modification timestamp, as published.
    #[serde(rename = "last-modified")]
    pub last_modified: Option<String>,
    /// Aliases pointing at this id.
    #[serde(default)]
    pub aliases: Vec<String>,
}
