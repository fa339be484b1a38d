//! Certificate management: loading, principal extraction and CLI helpers.
//!
//! Provides:
//! - [`load_certs`] — PEM certificate chain loading
//! - [`principal_from_der`] — render a certificate subject as an RFC 4514 DN
//! - [`CertGenerator`] — `rcgen`-backed CA and node certificate generation for
//!   the `node-trust tls` CLI commands
//!
//! # File format
//!
//! All certificate and key files are expected in **PEM format**.

use std::fs;
use std::path::Path;

use rcgen::{
    BasicConstraints, CertificateParams, CustomExtension, DistinguishedName as RcgenDn, DnType,
    IsCa, Issuer, KeyPair, date_time_ymd,
};
use rustls::pki_types::CertificateDer;
use rustls::pki_types::pem::PemObject;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::trust::dn::{AttributeTypeAndValue, AttributeValue, DistinguishedName, Rdn};
use crate::{Error, Result};

/// `id-ce-subjectAltName` (2.5.29.17)
const OID_SUBJECT_ALT_NAME: &[u64] = &[2, 5, 29, 17];

/// RFC 4514 keywords for subject attribute OIDs; anything else is rendered
/// as a dotted OID.
const ATTRIBUTE_KEYWORDS: &[(&str, &str)] = &[
    ("2.5.4.3", "CN"),
    ("2.5.4.6", "C"),
    ("2.5.4.7", "L"),
    ("2.5.4.8", "ST"),
    ("2.5.4.9", "STREET"),
    ("2.5.4.10", "O"),
    ("2.5.4.11", "OU"),
    ("0.9.2342.19200300.100.1.1", "UID"),
    ("0.9.2342.19200300.100.1.25", "DC"),
];

// ─────────────────────────────────────────────────────────────────────────────
// Public: PEM loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load all certificates from a PEM file, in file order.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be read, and `Error::Config` if it
/// contains no valid PEM certificate blocks.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let pem_data = fs::read(path)?;
    let certs: Vec<CertificateDer<'static>> = CertificateDer::pem_slice_iter(&pem_data)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::Config(format!("Failed to parse certs from '{}': {e}", path.display()))
        })?;

    if certs.is_empty() {
        return Err(Error::Config(format!(
            "No certificates found in '{}'",
            path.display()
        )));
    }

    debug!(path = %path.display(), count = certs.len(), "Loaded certificate chain");
    Ok(certs)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: principal extraction
// ─────────────────────────────────────────────────────────────────────────────

/// Render the subject of a DER certificate as an RFC 4514 string, most
/// specific RDN first (`CN=node1,OU=ops,O=example`).
///
/// This is the principal a TLS layer would hand to the evaluator.  Returns
/// `Ok(None)` for an empty subject, or when an attribute value is not a
/// string type.
///
/// # Errors
///
/// Returns `Error::Certificate` if the certificate cannot be parsed.
pub fn principal_from_der(der: &[u8]) -> Result<Option<String>> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::Certificate(format!("Failed to parse certificate: {e}")))?;

    let mut rdns = Vec::new();
    for rdn in cert.subject().iter() {
        let mut attributes = Vec::new();
        for attr in rdn.iter() {
            let oid = attr.attr_type().to_id_string();
            let Ok(value) = attr.as_str() else {
                debug!(attribute = %oid, "Subject attribute is not a string, no principal derived");
                return Ok(None);
            };
            attributes.push(AttributeTypeAndValue::new(
                attribute_keyword(&oid),
                AttributeValue::Text(value.to_owned()),
            ));
        }
        rdns.push(Rdn::new(attributes));
    }

    // DER order is most general first, which is the order names are stored in.
    let dn = DistinguishedName::from_ldap_order(rdns);
    if dn.is_empty() {
        return Ok(None);
    }
    Ok(Some(dn.normalized()))
}

fn attribute_keyword(oid: &str) -> String {
    ATTRIBUTE_KEYWORDS
        .iter()
        .find(|(o, _)| *o == oid)
        .map_or_else(|| oid.to_owned(), |(_, kw)| (*kw).to_owned())
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: certificate generation (CLI helpers)
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for generating a CA certificate.
#[derive(Debug)]
pub struct CaParams<'a> {
    /// Common Name for the root CA (e.g. `"Cluster Root CA"`).
    pub cn: &'a str,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Parameters for generating a node certificate.
#[derive(Debug, Clone, Default)]
pub struct NodeCertParams {
    /// Common Name.
    pub cn: String,
    /// Organisational Unit (optional).
    pub ou: Option<String>,
    /// Organisation (optional).
    pub o: Option<String>,
    /// DNS Subject Alternative Names.
    pub san_dns: Vec<String>,
    /// Registered-ID Subject Alternative Names, dotted form.
    pub registered_ids: Vec<String>,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Generated certificate and key pair.
#[derive(Debug)]
pub struct GeneratedCert {
    /// PEM-encoded certificate.
    pub cert_pem: String,
    /// DER-encoded certificate.
    pub cert_der: Vec<u8>,
    /// PEM-encoded private key.
    pub key_pem: String,
}

/// Certificate generator backed by `rcgen`.
pub struct CertGenerator;

impl CertGenerator {
    /// Generate a self-signed CA certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or certificate serialisation fails.
    pub fn init_ca(params: &CaParams<'_>) -> Result<GeneratedCert> {
        let key_pair = KeyPair::generate()
            .map_err(|e| Error::Config(format!("Failed to generate CA key: {e}")))?;

        let mut ca_params = CertificateParams::default();
        let mut dn = RcgenDn::new();
        dn.push(DnType::CommonName, params.cn);
        ca_params.distinguished_name = dn;
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.not_after = validity_to_date(params.validity_days)?;

        let ca_cert = ca_params
            .self_signed(&key_pair)
            .map_err(|e| Error::Config(format!("CA cert generation failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: ca_cert.pem(),
            cert_der: ca_cert.der().to_vec(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// Issue a node certificate.
    ///
    /// With `ca = Some((ca_cert_pem, ca_key_pem))` the certificate is signed
    /// by that CA; with `None` it is self-signed.
    ///
    /// # Errors
    ///
    /// Returns an error if a registered ID is not a valid dotted OID, the CA
    /// cannot be parsed, or signing fails.
    pub fn issue_node(params: &NodeCertParams, ca: Option<(&str, &str)>) -> Result<GeneratedCert> {
        let node_key = KeyPair::generate()
            .map_err(|e| Error::Config(format!("Failed to generate node key: {e}")))?;

        let mut node_params = CertificateParams::default();
        // Most general first, so the subject renders as CN=..,OU=..,O=..
        let mut dn = RcgenDn::new();
        if let Some(o) = &params.o {
            dn.push(DnType::OrganizationName, o.as_str());
        }
        if let Some(ou) = &params.ou {
            dn.push(DnType::OrganizationalUnitName, ou.as_str());
        }
        dn.push(DnType::CommonName, params.cn.as_str());
        node_params.distinguished_name = dn;
        node_params.not_after = validity_to_date(params.validity_days)?;

        // rcgen has no registered-ID SAN kind, so the whole extension is
        // written by hand.
        if !params.san_dns.is_empty() || !params.registered_ids.is_empty() {
            let content = encode_subject_alt_names(&params.san_dns, &params.registered_ids)?;
            node_params
                .custom_extensions
                .push(CustomExtension::from_oid_content(OID_SUBJECT_ALT_NAME, content));
        }

        let cert = match ca {
            Some((ca_cert_pem, ca_key_pem)) => {
                let ca_key = KeyPair::from_pem(ca_key_pem)
                    .map_err(|e| Error::Config(format!("Failed to parse CA key: {e}")))?;
                let issuer = Issuer::from_ca_cert_pem(ca_cert_pem, ca_key)
                    .map_err(|e| Error::Config(format!("Failed to parse CA cert: {e}")))?;
                node_params
                    .signed_by(&node_key, &issuer)
                    .map_err(|e| Error::Config(format!("Node cert signing failed: {e}")))?
            }
            None => node_params
                .self_signed(&node_key)
                .map_err(|e| Error::Config(format!("Node cert generation failed: {e}")))?,
        };

        debug!(cn = %params.cn, signed_by_ca = ca.is_some(), "Issued node certificate");

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            cert_der: cert.der().to_vec(),
            key_pem: node_key.serialize_pem(),
        })
    }

    /// Write a [`GeneratedCert`] to disk as `<stem>.crt` and `<stem>.key`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the directory cannot be created or the files
    /// cannot be written.
    pub fn write_to_dir(cert: &GeneratedCert, dir: &Path, stem: &str) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(format!("{stem}.crt")), &cert.cert_pem)?;
        fs::write(dir.join(format!("{stem}.key")), &cert.key_pem)?;
        debug!(dir = %dir.display(), stem, "Wrote certificate and key");
        Ok(())
    }

    /// Read a CA certificate and its private key (both PEM) for
    /// [`CertGenerator::issue_node`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if either file cannot be read.
    pub fn read_ca(cert_path: &Path, key_path: &Path) -> Result<(String, String)> {
        let cert_pem = fs::read_to_string(cert_path)?;
        let key_pem = fs::read_to_string(key_path)?;
        Ok((cert_pem, key_pem))
    }

    /// Self-signed certificate whose SAN extension content is `raw_san`,
    /// verbatim.
    #[cfg(test)]
    pub(crate) fn self_signed_with_raw_san(cn: &str, raw_san: Vec<u8>) -> Result<Vec<u8>> {
        let key = KeyPair::generate().map_err(|e| Error::Config(e.to_string()))?;
        let mut params = CertificateParams::default();
        let mut dn = RcgenDn::new();
        dn.push(DnType::CommonName, cn);
        params.distinguished_name = dn;
        params
            .custom_extensions
            .push(CustomExtension::from_oid_content(OID_SUBJECT_ALT_NAME, raw_san));
        let cert = params
            .self_signed(&key)
            .map_err(|e| Error::Config(e.to_string()))?;
        Ok(cert.der().to_vec())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers: DER encoding of GeneralNames
// ─────────────────────────────────────────────────────────────────────────────

/// `GeneralNames ::= SEQUENCE OF GeneralName` with `dNSName` ([2]) and
/// `registeredID` ([8]) entries.
fn encode_subject_alt_names(dns_names: &[String], registered_ids: &[String]) -> Result<Vec<u8>> {
    let mut names = Vec::new();
    for dns in dns_names {
        if !dns.is_ascii() {
            return Err(Error::Config(format!("Invalid DNS SAN '{dns}': not ASCII")));
        }
        names.extend(der_tlv(0x82, dns.as_bytes()));
    }
    for oid in registered_ids {
        names.extend(der_tlv(0x88, &encode_oid(oid)?));
    }
    Ok(der_tlv(0x30, &names))
}

/// Content octets of an OBJECT IDENTIFIER in dotted form.
fn encode_oid(dotted: &str) -> Result<Vec<u8>> {
    let invalid = || Error::Config(format!("Invalid OID '{dotted}'"));
    let arcs = dotted
        .split('.')
        .map(|arc| arc.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<u64>>>()?;

    let (first, second) = match arcs.as_slice() {
        [first @ 0..=1, second @ 0..=39, ..] | [first @ 2, second, ..] => (*first, *second),
        _ => return Err(invalid()),
    };
    let head = (first * 40).checked_add(second).ok_or_else(invalid)?;

    let mut out = encode_base128(head);
    for arc in &arcs[2..] {
        out.extend(encode_base128(*arc));
    }
    Ok(out)
}

/// Base-128, most significant group first, continuation bit on all but the
/// last byte.
fn encode_base128(mut value: u64) -> Vec<u8> {
    let mut groups = vec![(value & 0x7f) as u8];
    value >>= 7;
    while value > 0 {
        groups.push(((value & 0x7f) as u8) | 0x80);
        value >>= 7;
    }
    groups.reverse();
    groups
}

fn der_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    let len = content.len();
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let len_bytes: Vec<u8> = len
            .to_be_bytes()
            .into_iter()
            .skip_while(|b| *b == 0)
            .collect();
        out.push(0x80 | len_bytes.len() as u8);
        out.extend(len_bytes);
    }
    out.extend_from_slice(content);
    out
}

/// Convert a validity period (days) into a future `OffsetDateTime` for `rcgen`.
fn validity_to_date(days: u32) -> Result<time::OffsetDateTime> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Config(format!("System time error: {e}")))?
        .as_secs();

    let future_secs = now_secs.saturating_add(u64::from(days) * 86_400);

    let dt = time::OffsetDateTime::from_unix_timestamp(
        i64::try_from(future_secs).unwrap_or(i64::MAX),
    )
    .map_err(|e| Error::Config(format!("Date calculation error: {e}")))?;

    Ok(date_time_ymd(dt.year(), dt.month() as u8, dt.day()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
