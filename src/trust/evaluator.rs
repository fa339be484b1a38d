//! Inter-cluster request evaluation.
//!
//! Decides whether an mTLS peer is another node of this cluster.  A `true`
//! result lets the transport skip request-level authorization, so every
//! uncertain outcome resolves to `false` or to an error.
//!
//! # Evaluation order
//!
//! 1. Peer principal matches a trusted node DN → `true` (OID check skipped).
//! 2. Otherwise the first peer certificate's SAN registered IDs decide.
//!
//! Principal parse failures are absorbed as non-matches.  SAN decoding
//! failures and an empty peer chain are returned as errors; callers must
//! reject the connection and report them separately from a plain `false`.

use rustls::pki_types::CertificateDer;
use tracing::trace;

use crate::trust::config::TrustConfig;
use crate::trust::principal::principal_matches;
use crate::trust::registry::NodeRegistry;
use crate::trust::san::peer_has_trusted_oid;
use crate::{Error, Result};

/// Decides whether a peer connection comes from a cluster node.
pub trait InterClusterRequestEvaluator: Send + Sync {
    /// Evaluate a peer given its extracted principal (may be absent or empty)
    /// and its certificate chain, leaf first.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoPeerCertificate` for an empty chain and
    /// `Error::Certificate` when the leaf certificate or its SAN extension
    /// cannot be decoded.
    fn is_inter_cluster_request(
        &self,
        principal: Option<&str>,
        peer_certs: &[CertificateDer<'_>],
    ) -> Result<bool>;
}

/// Evaluator backed by the trusted node DN list and the trust OID.
#[derive(Debug, Clone)]
pub struct DefaultInterClusterEvaluator {
    registry: NodeRegistry,
}

impl DefaultInterClusterEvaluator {
    /// Build the evaluator, compiling the trusted node list once.
    pub fn new(config: &TrustConfig) -> Self {
        Self {
            registry: NodeRegistry::from_config(config),
        }
    }

    /// The compiled registry.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }
}

impl InterClusterRequestEvaluator for DefaultInterClusterEvaluator {
    fn is_inter_cluster_request(
        &self,
        principal: Option<&str>,
        peer_certs: &[CertificateDer<'_>],
    ) -> Result<bool> {
        if principal_matches(&self.registry, principal) {
            return Ok(true);
        }

        let leaf = peer_certs.first().ok_or(Error::NoPeerCertificate)?;
        let trusted = peer_has_trusted_oid(leaf.as_ref(), self.registry.cert_oid())?;
        trace!(
            trusted,
            cert_oid = %self.registry.cert_oid(),
            "Evaluated peer certificate registered IDs"
        );
        Ok(trusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust::cert_manager::{CertGenerator, NodeCertParams};

    const TRUST_OID: &str = "1.2.3.4.5.5";

    fn evaluator(nodes: &[&str]) -> DefaultInterClusterEvaluator {
        DefaultInterClusterEvaluator::new(&TrustConfig::with_nodes(nodes.iter().copied()))
    }

    fn cert(cn: &str, registered_ids: &[&str]) -> CertificateDer<'static> {
        let params = NodeCertParams {
            cn: cn.into(),
            ou: Some("ops".into()),
            o: Some("example".into()),
            san_dns: vec![format!("{cn}.internal")],
            registered_ids: registered_ids.iter().map(|s| (*s).to_owned()).collect(),
            validity_days: 30,
        };
        CertificateDer::from(CertGenerator::issue_node(&params, None).unwrap().cert_der)
    }

    #[test]
    fn principal_match_short_circuits() {
        // GIVEN: a matching principal and an undecodable certificate
        let eval = evaluator(&["CN=node1,OU=ops,O=example"]);
        let garbage = CertificateDer::from(b"junk".to_vec());
        // THEN: the OID check is never reached
        let result = eval.is_inter_cluster_request(Some("CN=node1,OU=ops,O=example"), &[garbage]);
        assert!(result.unwrap());
    }

    #[test]
    fn principal_match_does_not_need_a_certificate() {
        let eval = evaluator(&["CN=node*,OU=ops"]);
        assert!(eval.is_inter_cluster_request(Some("CN=node7,OU=ops"), &[]).unwrap());
    }

    #[test]
    fn oid_fallback_without_principal() {
        let eval = evaluator(&[]);
        let chain = [cert("worker", &[TRUST_OID])];
        assert!(eval.is_inter_cluster_request(None, &chain).unwrap());
    }

    #[test]
    fn oid_fallback_after_non_matching_principal() {
        let eval = evaluator(&["CN=node*,OU=ops,O=example"]);
        let chain = [cert("worker", &[TRUST_OID])];
        let result = eval.is_inter_cluster_request(Some("CN=worker,OU=ops,O=example"), &chain);
        assert!(result.unwrap());
    }

    #[test]
    fn oid_fallback_after_malformed_principal() {
        let eval = evaluator(&["CN=node1"]);
        let chain = [cert("worker", &[TRUST_OID])];
        assert!(eval.is_inter_cluster_request(Some("not a dn"), &chain).unwrap());
    }

    #[test]
    fn neither_check_passes() {
        let eval = evaluator(&["CN=node*,OU=ops,O=example"]);
        let chain = [cert("client", &["1.3.6.1.4.1.99999.1"])];
        let result = eval.is_inter_cluster_request(Some("CN=client,OU=users,O=example"), &chain);
        assert!(!result.unwrap());
    }

    #[test]
    fn only_leaf_certificate_is_inspected() {
        let eval = evaluator(&[]);
        let chain = [cert("leaf", &[]), cert("intermediate", &[TRUST_OID])];
        assert!(!eval.is_inter_cluster_request(None, &chain).unwrap());
    }

    #[test]
    fn binary_registered_id_alone_is_not_trusted() {
        // GIVEN: a leaf whose only SAN is registered ID 1.2.<2^64>, which
        // has no dotted-text form
        let mut san = vec![0x30, 0x0d, 0x88, 0x0b, 0x2a, 0x82];
        san.extend_from_slice(&[0x80; 8]);
        san.push(0x00);
        let der = CertGenerator::self_signed_with_raw_san("worker", san).unwrap();
        let eval = evaluator(&["CN=node*"]);

        // WHEN: evaluated without a principal
        let result = eval.is_inter_cluster_request(None, &[CertificateDer::from(der.clone())]);

        // THEN: the entry is skipped and the peer is not a node
        assert!(!result.unwrap());

        // AND: a matching principal still admits it
        let chain = [CertificateDer::from(der)];
        assert!(eval.is_inter_cluster_request(Some("CN=node3"), &chain).unwrap());
    }

    #[test]
    fn empty_chain_without_principal_match_is_an_error() {
        let eval = evaluator(&["CN=node1"]);
        let result = eval.is_inter_cluster_request(Some("CN=client"), &[]);
        assert!(matches!(result, Err(Error::NoPeerCertificate)));
    }

    #[test]
    fn undecodable_leaf_is_an_error() {
        let eval = evaluator(&[]);
        let garbage = CertificateDer::from(b"junk".to_vec());
        let result = eval.is_inter_cluster_request(None, &[garbage]);
        assert!(result.unwrap_err().is_certificate_failure());
    }

    #[test]
    fn custom_trust_oid_is_used() {
        let eval = DefaultInterClusterEvaluator::new(&TrustConfig {
            cert_oid: "1.3.6.1.4.1.99999.1".into(),
            nodes_dn: vec![],
        });
        let default_oid = [cert("a", &[TRUST_OID])];
        let custom_oid = [cert("b", &["1.3.6.1.4.1.99999.1"])];
        assert!(!eval.is_inter_cluster_request(None, &default_oid).unwrap());
        assert!(eval.is_inter_cluster_request(None, &custom_oid).unwrap());
    }
}
