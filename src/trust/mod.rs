//! Cluster membership trust for mTLS peers.
//!
//! Decides whether a mutually-authenticated peer is another node of this
//! cluster (and may therefore bypass request-level authorization) rather
//! than an external client.
//!
//! # Architecture
//!
//! ```text
//! TrustConfig ──► NodeRegistry (built once, read-only)
//!                      │
//! principal ──► principal_matches ──► true ─────────────┐
//!                      │ false                          ▼
//! peer chain ──► peer_has_trusted_oid(leaf) ──► InterClusterRequestEvaluator
//! ```
//!
//! # Modules
//!
//! - [`config`] — YAML configuration (`TrustConfig`)
//! - [`dn`] — distinguished name parsing and normalization
//! - [`wildcard`] — `*` / `?` / `/regex/` pattern matching
//! - [`registry`] — compiled trusted node list (`NodeRegistry`)
//! - [`principal`] — peer principal matching
//! - [`san`] — SAN registered-ID extraction
//! - [`evaluator`] — the decision (`DefaultInterClusterEvaluator`)
//! - [`cert_manager`] — PEM loading, subject → principal, certificate generation
//!
//! # Quick start
//!
//! ```yaml
//! cluster:
//!   cert_oid: "1.2.3.4.5.5"
//!   nodes_dn:
//!     - "CN=node*,OU=ops,O=example"
//! ```

pub mod cert_manager;
pub mod config;
pub mod dn;
pub mod evaluator;
pub mod principal;
pub mod registry;
pub mod san;
pub mod wildcard;

pub use cert_manager::{
    CaParams, CertGenerator, GeneratedCert, NodeCertParams, load_certs, principal_from_der,
};
pub use config::{DEFAULT_CERT_OID, TrustConfig};
pub use dn::{DistinguishedName, DnError, canonicalize, normalize};
pub use evaluator::{DefaultInterClusterEvaluator, InterClusterRequestEvaluator};
pub use principal::principal_matches;
pub use registry::{NodeIdentity, NodeRegistry};
pub use san::{GeneralNameKind, SanEntry, SanValue, has_trusted_oid, peer_has_trusted_oid};
pub use wildcard::{WildcardPattern, match_any};
