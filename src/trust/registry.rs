//! Trusted node registry.
//!
//! Compiles the configured node DN list from [`TrustConfig`] into a runtime
//! structure holding, for each entry, the parsed name (for structural
//! equality) and its normalized string compiled as a wildcard pattern.
//!
//! Build once at startup with [`NodeRegistry::from_config`]; afterwards the
//! registry is read-only and can be shared across threads freely.

use tracing::{debug, error, warn};

use crate::trust::config::TrustConfig;
use crate::trust::dn::{self, DistinguishedName};
use crate::trust::wildcard::WildcardPattern;

/// One trusted node entry.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    dn: DistinguishedName,
    pattern: WildcardPattern,
}

impl NodeIdentity {
    /// Parsed distinguished name.
    pub fn dn(&self) -> &DistinguishedName {
        &self.dn
    }

    /// Normalized string, as used for wildcard matching.
    pub fn normalized(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Compiled trusted node list plus the trust OID.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    nodes: Vec<NodeIdentity>,
    cert_oid: String,
}

impl NodeRegistry {
    /// Compile the registry from configuration.
    ///
    /// Entries that fail to parse are logged and skipped; the remaining
    /// entries are still usable.
    pub fn from_config(config: &TrustConfig) -> Self {
        let nodes: Vec<NodeIdentity> = config
            .nodes_dn
            .iter()
            .filter_map(|raw| match dn::normalize(raw) {
                Ok((dn, normalized)) => Some(NodeIdentity {
                    dn,
                    pattern: WildcardPattern::new(&normalized, true),
                }),
                Err(e) => {
                    error!(node_dn = %raw, error = %e, "Unable to parse trusted node DN, skipping");
                    None
                }
            })
            .collect();

        let cert_oid = config.cert_oid.trim().to_owned();
        if cert_oid.is_empty() {
            warn!("Trust OID is empty; SAN registered-ID matching is disabled");
        }

        debug!(
            nodes_dn = ?nodes.iter().map(NodeIdentity::normalized).collect::<Vec<_>>(),
            configured = config.nodes_dn.len(),
            cert_oid = %cert_oid,
            "Normalized trusted node DNs"
        );

        Self { nodes, cert_oid }
    }

    /// Active entries, in configuration order.
    pub fn nodes(&self) -> &[NodeIdentity] {
        &self.nodes
    }

    /// Normalized strings of the active entries.
    pub fn normalized(&self) -> Vec<&str> {
        self.nodes.iter().map(NodeIdentity::normalized).collect()
    }

    /// Returns `true` if `dn` is structurally equal to a trusted entry.
    pub fn contains_dn(&self, dn: &DistinguishedName) -> bool {
        self.nodes.iter().any(|n| n.dn == *dn)
    }

    /// Returns `true` if `normalized` matches a trusted entry's pattern
    /// (case-insensitive).
    pub fn matches_pattern(&self, normalized: &str) -> bool {
        self.nodes.iter().any(|n| n.pattern.matches(normalized))
    }

    /// Registered-ID OID that marks node certificates.
    pub fn cert_oid(&self) -> &str {
        &self.cert_oid
    }

    /// Number of active entries.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when no entry is active.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::config::DEFAULT_CERT_OID;

    fn registry(nodes: &[&str]) -> NodeRegistry {
        NodeRegistry::from_config(&TrustConfig::with_nodes(nodes.iter().copied()))
    }

    #[test]
    fn malformed_entry_is_skipped_and_others_survive() {
        // GIVEN: 3 configured DNs, the middle one malformed
        let reg = registry(&["CN=node1,O=example", "CN=broken,,O=example", "CN=node2,O=example"]);
        // THEN: 2 active entries, in order
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.normalized(), vec!["CN=node1,O=example", "CN=node2,O=example"]);
    }

    #[test]
    fn entries_are_normalized() {
        let reg = registry(&["CN=node1 , OU=ops,  O=example"]);
        assert_eq!(reg.normalized(), vec!["CN=node1,OU=ops,O=example"]);
        assert_eq!(reg.nodes()[0].dn().rdns().len(), 3);
    }

    #[test]
    fn contains_dn_is_structural() {
        let reg = registry(&["CN=node1,OU=ops,O=example"]);
        let same = DistinguishedName::parse("cn=NODE1; ou=ops, o=\"example\"").unwrap();
        let other = DistinguishedName::parse("CN=node2,OU=ops,O=example").unwrap();
        assert!(reg.contains_dn(&same));
        assert!(!reg.contains_dn(&other));
    }

    #[test]
    fn matches_pattern_uses_wildcards() {
        let reg = registry(&["CN=node*,OU=ops"]);
        assert!(reg.matches_pattern("CN=node7,OU=ops"));
        assert!(reg.matches_pattern("cn=NODE7,ou=OPS"));
        assert!(!reg.matches_pattern("CN=client,OU=ops"));
    }

    #[test]
    fn default_oid_applies_when_unconfigured() {
        let reg = NodeRegistry::from_config(&TrustConfig::default());
        assert_eq!(reg.cert_oid(), DEFAULT_CERT_OID);
        assert!(reg.is_empty());
    }

    #[test]
    fn configured_oid_is_trimmed() {
        let cfg = TrustConfig {
            cert_oid: "  1.3.6.1.4.1.99999.7 ".into(),
            nodes_dn: vec![],
        };
        assert_eq!(NodeRegistry::from_config(&cfg).cert_oid(), "1.3.6.1.4.1.99999.7");
    }

    #[test]
    fn registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NodeRegistry>();
    }
}
