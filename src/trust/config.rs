//! Cluster trust configuration types.
//!
//! Defines the YAML-deserialisable configuration naming which peers count as
//! members of this cluster: a list of trusted node distinguished names
//! (exact or wildcard) and a registered-ID OID that node certificates carry
//! in their Subject Alternative Name extension.
//!
//! # Example YAML
//!
//! ```yaml
//! cluster:
//!   cert_oid: "1.2.3.4.5.5"
//!   nodes_dn:
//!     - "CN=node*,OU=ops,O=example"
//!     - "CN=coordinator,OU=ops,O=example"
//! ```

use serde::{Deserialize, Serialize};

/// Trust OID used when none is configured.
///
/// This is a placeholder, not a registered arc: deployments that rely on the
/// OID check should configure their own value.
pub const DEFAULT_CERT_OID: &str = "1.2.3.4.5.5";

/// Cluster membership trust configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Registered-ID OID that marks a certificate as belonging to a node.
    ///
    /// Compared against the SAN `registeredID` entries of the peer's leaf
    /// certificate.  Defaults to [`DEFAULT_CERT_OID`].
    pub cert_oid: String,

    /// Distinguished names of trusted nodes, in RFC 4514 form.
    ///
    /// Each entry is matched both structurally and as a wildcard pattern
    /// (`*`, `?`, or `/regex/`) against the peer's normalized principal.
    /// Entries that fail to parse are logged and ignored.
    pub nodes_dn: Vec<String>,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            cert_oid: DEFAULT_CERT_OID.to_string(),
            nodes_dn: Vec::new(),
        }
    }
}

impl TrustConfig {
    /// Configuration trusting the given node DNs with the default OID.
    pub fn with_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes_dn: nodes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}
