//! node-trust Library
//!
//! Decides whether an mTLS peer is a member node of the same cluster, based
//! on its certificate identity.
//!
//! # Features
//!
//! - **DN matching**: RFC 4514 parsing, normalization and structural equality
//! - **Wildcards**: trusted node lists may use `*`, `?` or `/regex/` patterns
//! - **SAN registered IDs**: nodes may instead carry a trust OID in their SAN
//! - **Fail-closed**: undecodable certificates surface as errors, never `true`
//!
//! # Example
//!
//! ```
//! use node_trust::trust::{DefaultInterClusterEvaluator, InterClusterRequestEvaluator, TrustConfig};
//!
//! let evaluator = DefaultInterClusterEvaluator::new(&TrustConfig::with_nodes(["CN=node*,OU=ops"]));
//! assert!(evaluator.is_inter_cluster_request(Some("CN=node7, OU=ops"), &[]).unwrap());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod trust;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .map_err(|e| Error::Config(format!("Failed to install tracing subscriber: {e}")))
}
