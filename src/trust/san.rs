//! Subject Alternative Name registered-ID extraction.
//!
//! Node certificates can be marked as cluster members by a SAN `registeredID`
//! entry carrying a configured OID.  This module decodes the SAN extension
//! once into [`SanEntry`] values and answers whether one of them carries the
//! trust OID.
//!
//! # Limitations
//!
//! A registered ID whose arcs do not fit in 64 bits cannot be rendered in
//! dotted-decimal form.  Such values are surfaced as [`SanValue::Binary`],
//! logged, and never matched.

use std::fmt;

use tracing::{debug, error, trace};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::oid_registry::Oid;
use x509_parser::prelude::FromDer;

use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// SAN entry model
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of a SAN general name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralNameKind {
    /// `otherName` (tag 0)
    OtherName,
    /// `rfc822Name` (tag 1)
    Rfc822Name,
    /// `dNSName` (tag 2)
    DnsName,
    /// `x400Address` (tag 3)
    X400Address,
    /// `directoryName` (tag 4)
    DirectoryName,
    /// `ediPartyName` (tag 5)
    EdiPartyName,
    /// `uniformResourceIdentifier` (tag 6)
    Uri,
    /// `iPAddress` (tag 7)
    IpAddress,
    /// `registeredID` (tag 8)
    RegisteredId,
    /// An entry the parser could not classify.
    Unknown,
}

impl GeneralNameKind {
    /// ASN.1 context tag number of this kind, if known.
    pub fn tag(self) -> Option<u8> {
        match self {
            Self::OtherName => Some(0),
            Self::Rfc822Name => Some(1),
            Self::DnsName => Some(2),
            Self::X400Address => Some(3),
            Self::DirectoryName => Some(4),
            Self::EdiPartyName => Some(5),
            Self::Uri => Some(6),
            Self::IpAddress => Some(7),
            Self::RegisteredId => Some(8),
            Self::Unknown => None,
        }
    }
}

/// Decoded value of a SAN entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanValue {
    /// Value available as text (registered IDs in dotted-decimal form).
    Textual(String),
    /// Raw encoded value that is not decoded further.
    Binary(Vec<u8>),
    /// Value of a kind this module does not inspect.
    Other,
}

/// One SAN general name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanEntry {
    /// General-name kind.
    pub kind: GeneralNameKind,
    /// Decoded value.
    pub value: SanValue,
}

impl SanEntry {
    /// A registered-ID entry with a dotted-decimal value.
    pub fn registered_id(oid: impl Into<String>) -> Self {
        Self {
            kind: GeneralNameKind::RegisteredId,
            value: SanValue::Textual(oid.into()),
        }
    }

    /// Decode one general name.
    pub fn from_general_name(name: &GeneralName<'_>) -> Self {
        let kind = match name {
            GeneralName::OtherName(..) => GeneralNameKind::OtherName,
            GeneralName::RFC822Name(_) => GeneralNameKind::Rfc822Name,
            GeneralName::DNSName(_) => GeneralNameKind::DnsName,
            GeneralName::X400Address(_) => GeneralNameKind::X400Address,
            GeneralName::DirectoryName(_) => GeneralNameKind::DirectoryName,
            GeneralName::EDIPartyName(_) => GeneralNameKind::EdiPartyName,
            GeneralName::URI(_) => GeneralNameKind::Uri,
            GeneralName::IPAddress(_) => GeneralNameKind::IpAddress,
            GeneralName::RegisteredID(oid) => {
                return Self {
                    kind: GeneralNameKind::RegisteredId,
                    value: registered_id_value(oid),
                };
            }
            #[allow(unreachable_patterns)]
            _ => GeneralNameKind::Unknown,
        };
        Self {
            kind,
            value: SanValue::Other,
        }
    }
}

impl fmt::Display for SanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.tag(), &self.value) {
            (Some(tag), SanValue::Textual(v)) => write!(f, "{tag}::{v}"),
            (Some(tag), SanValue::Binary(b)) => write!(f, "{tag}::#{}", hex::encode(b)),
            (Some(tag), SanValue::Other) => write!(f, "{tag}::<not inspected>"),
            (None, _) => f.write_str("?::<unknown>"),
        }
    }
}

/// Dotted-decimal when every arc fits in `u64`, raw content bytes otherwise.
fn registered_id_value(oid: &Oid<'_>) -> SanValue {
    if oid.iter().is_some() {
        SanValue::Textual(oid.to_id_string())
    } else {
        SanValue::Binary(oid.as_bytes().to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Decode the SAN extension of `cert`.
///
/// Returns `Ok(None)` when the certificate has no SAN extension.
///
/// # Errors
///
/// Returns `Error::Certificate` if the extension is present but cannot be
/// decoded, or appears more than once.
pub fn san_entries(cert: &X509Certificate<'_>) -> Result<Option<Vec<SanEntry>>> {
    let san = cert
        .subject_alternative_name()
        .map_err(|e| Error::Certificate(format!("Invalid subject alternative name extension: {e}")))?;

    Ok(san.map(|ext| {
        ext.value
            .general_names
            .iter()
            .map(SanEntry::from_general_name)
            .collect()
    }))
}

/// Returns `true` if a registered-ID entry equals `trust_oid`.
///
/// Only registered-ID entries are inspected.  Binary values are logged and
/// skipped.
pub fn has_trusted_oid(entries: &[SanEntry], trust_oid: &str) -> bool {
    if trust_oid.is_empty() {
        return false;
    }

    let mut candidates = Vec::new();
    for entry in entries {
        if entry.kind != GeneralNameKind::RegisteredId {
            continue;
        }
        match &entry.value {
            SanValue::Textual(oid) => candidates.push(oid.as_str()),
            SanValue::Binary(bytes) => {
                error!(
                    tag = 8,
                    value = %hex::encode(bytes),
                    "Unable to handle registered-ID SAN with binary value (ASN.1 DER not supported here)"
                );
            }
            SanValue::Other => {}
        }
    }

    let trusted = candidates.iter().any(|oid| *oid == trust_oid);
    trace!(candidates = ?candidates, trust_oid = %trust_oid, trusted, "Checked SAN registered IDs");
    trusted
}

/// Parse a DER certificate and check its SAN for `trust_oid`.
///
/// # Errors
///
/// Returns `Error::Certificate` if the certificate or its SAN extension
/// cannot be decoded.
pub fn peer_has_trusted_oid(der: &[u8], trust_oid: &str) -> Result<bool> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::Certificate(format!("Failed to parse peer certificate: {e}")))?;

    match san_entries(&cert)? {
        Some(entries) => Ok(has_trusted_oid(&entries, trust_oid)),
        None => {
            debug!("No subject alternative names found in peer certificate");
            Ok(false)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;
    use crate::trust::cert_manager::{CertGenerator, NodeCertParams};

    const TRUST_OID: &str = "1.2.3.4.5.5";

    /// OID `1.2.<2^64>`: the last arc needs 65 bits.
    const OVERSIZED_OID: &[u8] = &[
        0x2a, 0x82, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00,
    ];

    fn node_cert(dns: &[&str], registered_ids: &[&str]) -> Vec<u8> {
        let params = NodeCertParams {
            cn: "node1".into(),
            ou: Some("ops".into()),
            o: Some("example".into()),
            san_dns: dns.iter().map(|s| (*s).to_owned()).collect(),
            registered_ids: registered_ids.iter().map(|s| (*s).to_owned()).collect(),
            validity_days: 30,
        };
        CertGenerator::issue_node(&params, None).unwrap().cert_der
    }

    // ── decoding ─────────────────────────────────────────────────────────────

    #[test]
    fn registered_id_decodes_to_dotted_text() {
        let der = node_cert(&["node1.internal"], &[TRUST_OID]);
        let (_, cert) = X509Certificate::from_der(&der).unwrap();
        let entries = san_entries(&cert).unwrap().unwrap();
        assert!(entries.contains(&SanEntry::registered_id(TRUST_OID)));
        assert!(entries.iter().any(|e| e.kind == GeneralNameKind::DnsName && e.value == SanValue::Other));
    }

    #[test]
    fn oversized_registered_id_decodes_as_binary() {
        // GIVEN: a registered ID whose arc does not fit in u64
        let name = GeneralName::RegisteredID(Oid::new(Cow::Borrowed(OVERSIZED_OID)));
        // WHEN: decoding
        let entry = SanEntry::from_general_name(&name);
        // THEN: raw bytes are kept, no text rendering attempted
        assert_eq!(entry.kind, GeneralNameKind::RegisteredId);
        assert_eq!(entry.value, SanValue::Binary(OVERSIZED_OID.to_vec()));
    }

    #[test]
    fn non_registered_names_are_not_inspected() {
        let entry = SanEntry::from_general_name(&GeneralName::DNSName("1.2.3.4.5.5"));
        assert_eq!(entry.kind, GeneralNameKind::DnsName);
        assert_eq!(entry.value, SanValue::Other);
    }

    #[test]
    fn kinds_map_to_context_tags() {
        assert_eq!(GeneralNameKind::RegisteredId.tag(), Some(8));
        assert_eq!(GeneralNameKind::DnsName.tag(), Some(2));
        assert_eq!(GeneralNameKind::Unknown.tag(), None);
    }

    #[test]
    fn display_uses_tag_prefix() {
        assert_eq!(SanEntry::registered_id("1.2.3").to_string(), "8::1.2.3");
    }

    // ── has_trusted_oid ──────────────────────────────────────────────────────

    #[test]
    fn exact_registered_id_matches() {
        let entries = [SanEntry::registered_id(TRUST_OID)];
        assert!(has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn prefix_or_extension_of_trust_oid_does_not_match() {
        let entries = [
            SanEntry::registered_id("1.2.3.4.5.55"),
            SanEntry::registered_id("1.2.3.4.5"),
        ];
        assert!(!has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn adjacent_entries_are_not_concatenated() {
        // "8::1.2.3" followed by "8::.4.5.5" must not read as the trust OID
        let entries = [SanEntry::registered_id("1.2.3"), SanEntry::registered_id(".4.5.5")];
        assert!(!has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn binary_registered_id_never_matches() {
        let entries = [SanEntry {
            kind: GeneralNameKind::RegisteredId,
            value: SanValue::Binary(TRUST_OID.as_bytes().to_vec()),
        }];
        assert!(!has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn binary_entry_does_not_hide_a_later_textual_match() {
        let entries = [
            SanEntry {
                kind: GeneralNameKind::RegisteredId,
                value: SanValue::Binary(OVERSIZED_OID.to_vec()),
            },
            SanEntry::registered_id(TRUST_OID),
        ];
        assert!(has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn textual_value_on_other_kind_is_ignored() {
        let entries = [SanEntry {
            kind: GeneralNameKind::Uri,
            value: SanValue::Textual(TRUST_OID.into()),
        }];
        assert!(!has_trusted_oid(&entries, TRUST_OID));
    }

    #[test]
    fn empty_trust_oid_never_matches() {
        let entries = [SanEntry::registered_id("")];
        assert!(!has_trusted_oid(&entries, ""));
    }

    // ── peer_has_trusted_oid ─────────────────────────────────────────────────

    #[test]
    fn certificate_with_trust_oid_is_trusted() {
        let der = node_cert(&["node1.internal"], &[TRUST_OID]);
        assert!(peer_has_trusted_oid(&der, TRUST_OID).unwrap());
    }

    #[test]
    fn certificate_with_other_oid_is_not_trusted() {
        let der = node_cert(&[], &["1.3.6.1.4.1.99999.1"]);
        assert!(!peer_has_trusted_oid(&der, TRUST_OID).unwrap());
    }

    #[test]
    fn certificate_without_san_is_not_trusted() {
        let der = node_cert(&[], &[]);
        assert!(!peer_has_trusted_oid(&der, TRUST_OID).unwrap());
    }

    #[test]
    fn garbage_bytes_are_a_certificate_error() {
        let result = peer_has_trusted_oid(b"not a cert", TRUST_OID);
        assert!(matches!(result, Err(Error::Certificate(_))));
    }

    #[test]
    fn malformed_san_extension_is_a_certificate_error() {
        // GIVEN: a SAN extension whose content is an OCTET STRING, not GeneralNames
        let der = CertGenerator::self_signed_with_raw_san("broken", vec![0x04, 0x01, 0x00]).unwrap();
        // THEN: surfaced as a hard failure, not as "not trusted"
        let result = peer_has_trusted_oid(&der, TRUST_OID);
        assert!(matches!(result, Err(Error::Certificate(_))));
    }
}
