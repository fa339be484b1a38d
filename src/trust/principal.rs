//! Peer principal matching against the trusted node registry.

use tracing::{error, trace};

use crate::trust::dn;
use crate::trust::registry::NodeRegistry;

/// Returns `true` if the peer principal identifies a trusted node.
///
/// A principal matches when its parsed name is structurally equal to a
/// trusted entry, or when its normalized string matches a trusted entry's
/// wildcard pattern.  `false` is inconclusive: an absent, empty or
/// unparsable principal is not a failure, the caller moves on to the OID
/// check.
pub fn principal_matches(registry: &NodeRegistry, principal: Option<&str>) -> bool {
    let Some(principal) = principal.filter(|p| !p.is_empty()) else {
        trace!("No peer principal, skipping node DN check");
        return false;
    };

    let (dn, normalized) = match dn::normalize(principal) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(principal = %principal, error = %e, "Unable to parse peer principal");
            return false;
        }
    };

    if registry.contains_dn(&dn) || registry.matches_pattern(&normalized) {
        trace!(
            principal = %normalized,
            nodes_dn = ?registry.normalized(),
            "Treating peer as cluster node: principal matches a trusted node DN"
        );
        true
    } else {
        trace!(
            principal = %normalized,
            nodes_dn = ?registry.normalized(),
            "Peer principal does not match any trusted node DN"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::config::TrustConfig;

    fn registry(nodes: &[&str]) -> NodeRegistry {
        NodeRegistry::from_config(&TrustConfig::with_nodes(nodes.iter().copied()))
    }

    #[test]
    fn absent_principal_is_inconclusive() {
        let reg = registry(&["CN=node1"]);
        assert!(!principal_matches(&reg, None));
    }

    #[test]
    fn empty_principal_is_inconclusive() {
        let reg = registry(&["CN=node1"]);
        assert!(!principal_matches(&reg, Some("")));
    }

    #[test]
    fn identical_dn_matches_regardless_of_formatting() {
        // GIVEN: a trusted DN
        let reg = registry(&["CN=node1,OU=ops,O=example"]);
        // THEN: same name with different spacing / separators / case matches
        assert!(principal_matches(&reg, Some("CN=node1,OU=ops,O=example")));
        assert!(principal_matches(&reg, Some("CN=node1, OU=ops, O=example")));
        assert!(principal_matches(&reg, Some("cn=node1;ou=ops;o=example")));
    }

    #[test]
    fn structural_match_handles_escaping_differences() {
        let reg = registry(&[r"CN=node\, east,O=example"]);
        assert!(principal_matches(&reg, Some(r#"CN="node, east",O=example"#)));
    }

    #[test]
    fn structural_match_handles_multi_value_order() {
        let reg = registry(&["CN=node1+UID=7,O=example"]);
        assert!(principal_matches(&reg, Some("UID=7+CN=node1,O=example")));
    }

    #[test]
    fn wildcard_entry_matches() {
        let reg = registry(&["CN=node*,OU=ops"]);
        assert!(principal_matches(&reg, Some("CN=node7,OU=ops")));
        assert!(principal_matches(&reg, Some("CN=node7, OU=ops")));
    }

    #[test]
    fn non_member_does_not_match() {
        let reg = registry(&["CN=node*,OU=ops,O=example"]);
        assert!(!principal_matches(&reg, Some("CN=client1,OU=users,O=example")));
    }

    #[test]
    fn malformed_principal_is_a_non_match() {
        let reg = registry(&["CN=node*"]);
        assert!(!principal_matches(&reg, Some("CN=node1,,")));
    }

    #[test]
    fn empty_registry_never_matches() {
        let reg = registry(&[]);
        assert!(!principal_matches(&reg, Some("CN=node1")));
    }
}
