//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cluster node trust evaluation for mTLS peers
#[derive(Parser, Debug)]
#[command(name = "node-trust")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "NODE_TRUST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "NODE_TRUST_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "NODE_TRUST_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate whether a peer certificate chain belongs to a cluster node
    ///
    /// Exit status: 0 = cluster node, 1 = not a cluster node, 2 = error.
    Check {
        /// PEM file with the peer certificate chain, leaf first
        #[arg(long, required = true)]
        cert: PathBuf,

        /// Peer principal (defaults to the leaf certificate's subject)
        #[arg(long, conflicts_with = "no_principal")]
        principal: Option<String>,

        /// Evaluate without a principal (SAN registered-ID check only)
        #[arg(long)]
        no_principal: bool,
    },

    /// Print the normalized form of distinguished names
    Normalize {
        /// Distinguished names in RFC 4514 form
        #[arg(required = true)]
        dns: Vec<String>,
    },

    /// List the active trusted node entries and the trust OID
    Nodes,

    /// Certificate generation commands
    #[command(subcommand)]
    Tls(TlsCommand),
}

/// TLS certificate subcommands
#[derive(Subcommand, Debug)]
pub enum TlsCommand {
    /// Generate a self-signed cluster CA
    InitCa {
        /// CA Common Name
        #[arg(long, default_value = "Cluster Root CA")]
        cn: String,

        /// Validity in days
        #[arg(long, default_value_t = 3650)]
        days: u32,

        /// Output directory
        #[arg(short, long, default_value = "tls")]
        out: PathBuf,
    },

    /// Issue a node certificate
    IssueNode {
        /// Node Common Name
        #[arg(long, required = true)]
        cn: String,

        /// Organisational Unit
        #[arg(long)]
        ou: Option<String>,

        /// Organisation
        #[arg(long)]
        org: Option<String>,

        /// DNS Subject Alternative Names
        #[arg(long = "dns")]
        san_dns: Vec<String>,

        /// Add the configured trust OID as a registered-ID SAN
        #[arg(long)]
        with_trust_oid: bool,

        /// CA certificate (PEM); self-signed when omitted
        #[arg(long, requires = "ca_key")]
        ca_cert: Option<PathBuf>,

        /// CA private key (PEM)
        #[arg(long, requires = "ca_cert")]
        ca_key: Option<PathBuf>,

        /// Validity in days
        #[arg(long, default_value_t = 365)]
        days: u32,

        /// Output directory
        #[arg(short, long, default_value = "tls")]
        out: PathBuf,
    },
}
