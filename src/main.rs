//! node-trust - cluster node trust evaluation for mTLS peers
//!
//! Answers "is this peer another node of my cluster?" from its certificate.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use rustls::pki_types::CertificateDer;
use tracing::{debug, error, info};

use node_trust::{
    cli::{Cli, Command, TlsCommand},
    config::Config,
    setup_tracing,
    trust::{
        CaParams, CertGenerator, DefaultInterClusterEvaluator, InterClusterRequestEvaluator,
        NodeCertParams, NodeRegistry, TrustConfig, canonicalize, load_certs, principal_from_der,
    },
};

/// Exit status when a peer is not a cluster node.
const EXIT_NOT_TRUSTED: u8 = 1;
/// Exit status for configuration, input, or certificate errors.
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::from(EXIT_ERROR);
    }

    match cli.command {
        Command::Normalize { dns } => run_normalize(&dns),
        Command::Check {
            cert,
            principal,
            no_principal,
        } => match load_config(cli.config.as_deref()) {
            Some(config) => run_check(&config.cluster, &cert, principal, no_principal),
            None => ExitCode::from(EXIT_ERROR),
        },
        Command::Nodes => match load_config(cli.config.as_deref()) {
            Some(config) => run_nodes(&config.cluster),
            None => ExitCode::from(EXIT_ERROR),
        },
        Command::Tls(tls_cmd) => run_tls_command(tls_cmd, cli.config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Option<Config> {
    match Config::load(path) {
        Ok(config) => Some(config),
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            eprintln!("Error: {e}");
            None
        }
    }
}

/// Evaluate a PEM peer chain against the configured cluster trust
fn run_check(
    trust: &TrustConfig,
    cert_path: &Path,
    principal: Option<String>,
    no_principal: bool,
) -> ExitCode {
    let chain = match load_certs(cert_path) {
        Ok(chain) => chain,
        Err(e) => {
            eprintln!("Error: '{}': {e}", cert_path.display());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let principal = if no_principal {
        None
    } else if principal.is_some() {
        principal
    } else {
        match leaf_principal(&chain) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::from(EXIT_ERROR);
            }
        }
    };
    debug!(principal = ?principal, chain_len = chain.len(), "Evaluating peer");

    let evaluator = DefaultInterClusterEvaluator::new(trust);
    match evaluator.is_inter_cluster_request(principal.as_deref(), &chain) {
        Ok(true) => {
            println!("true");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("false");
            ExitCode::from(EXIT_NOT_TRUSTED)
        }
        Err(e) => {
            error!(error = %e, "Peer evaluation failed");
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn leaf_principal(chain: &[CertificateDer<'_>]) -> node_trust::Result<Option<String>> {
    match chain.first() {
        Some(leaf) => principal_from_der(leaf.as_ref()),
        None => Ok(None),
    }
}

/// Print `<normalized>` per input, or an error line for unparseable input
fn run_normalize(dns: &[String]) -> ExitCode {
    let mut failed = false;
    for input in dns {
        match canonicalize(input) {
            Ok(normalized) => println!("{normalized}"),
            Err(e) => {
                eprintln!("Error: '{input}': {e}");
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::SUCCESS
    }
}

/// List compiled trusted node entries
fn run_nodes(trust: &TrustConfig) -> ExitCode {
    let registry = NodeRegistry::from_config(trust);
    println!("cert_oid: {}", registry.cert_oid());
    println!(
        "nodes ({} of {} configured entries active):",
        registry.len(),
        trust.nodes_dn.len()
    );
    for normalized in registry.normalized() {
        println!("  {normalized}");
    }
    ExitCode::SUCCESS
}

fn run_tls_command(cmd: TlsCommand, config_path: Option<&Path>) -> ExitCode {
    match cmd {
        TlsCommand::InitCa { cn, days, out } => {
            let params = CaParams {
                cn: &cn,
                validity_days: days,
            };
            let generated = match CertGenerator::init_ca(&params) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(EXIT_ERROR);
                }
            };
            if let Err(e) = CertGenerator::write_to_dir(&generated, &out, "ca") {
                eprintln!("Error: '{}': {e}", out.display());
                return ExitCode::from(EXIT_ERROR);
            }
            info!(dir = %out.display(), "Wrote cluster CA");
            println!("CA written to {}", out.display());
            ExitCode::SUCCESS
        }
        TlsCommand::IssueNode {
            cn,
            ou,
            org,
            san_dns,
            with_trust_oid,
            ca_cert,
            ca_key,
            days,
            out,
        } => {
            let registered_ids = if with_trust_oid {
                match load_config(config_path) {
                    Some(config) => vec![config.cluster.cert_oid.trim().to_owned()],
                    None => return ExitCode::from(EXIT_ERROR),
                }
            } else {
                Vec::new()
            };

            let ca_pems = match (ca_cert, ca_key) {
                (Some(cert), Some(key)) => match CertGenerator::read_ca(&cert, &key) {
                    Ok(pems) => Some(pems),
                    Err(e) => {
                        eprintln!("Error: cannot read CA files: {e}");
                        return ExitCode::from(EXIT_ERROR);
                    }
                },
                _ => None,
            };

            let params = NodeCertParams {
                cn: cn.clone(),
                ou,
                o: org,
                san_dns,
                registered_ids,
                validity_days: days,
            };
            let ca = ca_pems.as_ref().map(|(c, k)| (c.as_str(), k.as_str()));
            let generated = match CertGenerator::issue_node(&params, ca) {
                Ok(g) => g,
                Err(e) => {
                    eprintln!("Error: {e}");
                    return ExitCode::from(EXIT_ERROR);
                }
            };
            if let Err(e) = CertGenerator::write_to_dir(&generated, &out, &cn) {
                eprintln!("Error: '{}': {e}", out.display());
                return ExitCode::from(EXIT_ERROR);
            }
            info!(cn = %cn, dir = %out.display(), "Wrote node certificate");
            println!("Node certificate written to {}", out.display());
            ExitCode::SUCCESS
        }
    }
}
