//! Fixed User-Agent string for download requests.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/transfer";

/// Default User-Agent for download requests (identifies the tool).
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("transfer/{version} (bulk-file-transfer; +{PROJECT_UA_URL})")
}
