//! Error types for node-trust

use std::io;

use thiserror::Error;

use crate::trust::dn::DnError;

/// Result type alias for node-trust
pub type Result<T> = std::result::Result<T, Error>;

/// node-trust errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Distinguished name could not be parsed
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(#[from] DnError),

    /// Peer certificate or one of its extensions could not be decoded
    #[error("Certificate error: {0}")]
    Certificate(String),

    /// The peer presented an empty certificate chain
    #[error("No peer certificate presented")]
    NoPeerCertificate,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns `true` for failures that concern the integrity of the peer's
    /// certificate rather than a local problem.
    ///
    /// Callers reject the connection on these and should alert on them
    /// separately from a plain "not a cluster node" outcome.
    #[must_use]
    pub fn is_certificate_failure(&self) -> bool {
        matches!(self, Self::Certificate(_) | Self::NoPeerCertificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_errors_are_flagged_as_certificate_failures() {
        assert!(Error::Certificate("bad SAN".into()).is_certificate_failure());
        assert!(Error::NoPeerCertificate.is_certificate_failure());
    }

    #[test]
    fn config_errors_are_not_certificate_failures() {
        assert!(!Error::Config("missing file".into()).is_certificate_failure());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::Certificate("duplicate extension".into());
        assert_eq!(err.to_string(), "Certificate error: duplicate extension");
    }
}
