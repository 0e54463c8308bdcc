mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use serde::Serialize;
use sslforge::cnf::ConfigBlock;
use sslforge::{
    CaSignRequest, CertificateWorkflow, CsrRequest, KeyAlgorithm, NewKey, PrivateKey,
    PrivateKeyRequest, RootCaRequest, SignRequest, ToolkitConfig, WorkflowArtifact,
};

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let config =
        ToolkitConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let workflow = config.workflow();
    info!("Using toolkit {}", workflow.program().display());

    // Ctrl-C kills the running toolkit process instead of orphaning it
    let cancel = workflow.options().cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
            Err(e) => error!("Failed to install Ctrl+C handler: {e}"),
        }
    });

    let json = args.json;
    match args.sub {
        cli::Cmd::Key(key) => handle_key(&workflow, key, json).await,
        cli::Cmd::Csr(csr) => handle_csr(&workflow, csr, json).await,
        cli::Cmd::Ca(ca) => handle_ca(&workflow, ca, json).await,
        cli::Cmd::Sign(sign) => handle_sign(&workflow, sign, json).await,
        cli::Cmd::Issue(issue) => handle_issue(&workflow, issue, json).await,
        cli::Cmd::Ciphers => handle_ciphers(&workflow, json).await,
        cli::Cmd::Version => handle_version(&workflow, json).await,
    }
}

fn parse_algorithm(name: Option<&str>) -> Result<Option<KeyAlgorithm>> {
    Ok(name.map(str::parse::<KeyAlgorithm>).transpose()?)
}

fn block(pairs: Vec<(String, String)>) -> ConfigBlock {
    pairs.into_iter().collect()
}

async fn handle_key(workflow: &CertificateWorkflow, args: cli::KeyArgs, json: bool) -> Result<()> {
    let mut request = PrivateKeyRequest {
        algorithm: parse_algorithm(args.algorithm.as_deref())?,
        param_file: args.param_file,
        pkey_opts: block(args.pkey_opts),
        output_file: args.out,
        ..PrivateKeyRequest::default()
    };
    if let (Some(cipher), Some(password)) = (args.cipher, args.password) {
        request = request.encrypted(cipher, password);
    }

    let key = workflow
        .generate_private_key(&request)
        .await
        .context("Failed to generate private key")?;
    print_key(&key, json)
}

async fn handle_csr(workflow: &CertificateWorkflow, args: cli::CsrArgs, json: bool) -> Result<()> {
    let new_key = match args.new_key.as_deref() {
        Some(name) => Some(NewKey {
            algorithm: Some(name.parse()?),
            bits: args.bits,
            key_out: args.keyout,
            ..NewKey::default()
        }),
        None => None,
    };
    let request = CsrRequest {
        key_file: args.key,
        key_passphrase: args.passin,
        new_key,
        message_digest: args.digest,
        distinguished_name: block(args.subject),
        alt_names: block(args.alt_name),
        output_file: args.out,
    };

    let artifact = workflow
        .generate_csr(&request)
        .await
        .context("Failed to generate certificate signing request")?;
    print_artifact(&artifact, json)
}

async fn handle_ca(workflow: &CertificateWorkflow, args: cli::CaArgs, json: bool) -> Result<()> {
    let request = RootCaRequest {
        key_file: args.key,
        key_passphrase: args.passin,
        output_file: args.out,
        distinguished_name: block(args.subject),
        expiry_days: args.days,
        message_digest: args.digest,
    };

    let ca = workflow
        .generate_root_ca(&request)
        .await
        .context("Failed to create root CA")?;
    print_artifact(&ca.artifact, json)?;
    if !json {
        println!("config: {}", ca.signer.identity().config.display());
    }
    Ok(())
}

async fn handle_sign(
    workflow: &CertificateWorkflow,
    args: cli::SignArgs,
    json: bool,
) -> Result<()> {
    let request = SignRequest {
        csr_file: args.csr,
        ca_crt_file: args.ca_cert,
        ca_key_file: args.ca_key,
        config_file: args.ca_config,
        ca_key_passphrase: args.passin,
        expiry_days: args.days,
        output_file: args.out,
        extensions: args.extensions,
    };

    let artifact = workflow
        .sign_csr(&request)
        .await
        .context("Failed to sign certificate request")?;
    print_artifact(&artifact, json)
}

#[derive(Serialize)]
struct Issued {
    ca_key: PrivateKey,
    ca: WorkflowArtifact,
    csr: WorkflowArtifact,
    certificate: WorkflowArtifact,
}

async fn handle_issue(
    workflow: &CertificateWorkflow,
    args: cli::IssueArgs,
    json: bool,
) -> Result<()> {
    let dir = args.dir.as_path();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let algorithm: KeyAlgorithm = args.algorithm.parse()?;

    let ca_key = workflow
        .generate_private_key(&PrivateKeyRequest::new(algorithm).output_file(dir.join("ca.key")))
        .await
        .context("Failed to generate CA key")?;

    let ca = workflow
        .generate_root_ca(
            &RootCaRequest::new(dir.join("ca.key"), dir.join("ca.crt"))
                .subject("CN", args.ca_name.as_str())
                .expiry_days(args.ca_days),
        )
        .await
        .context("Failed to create root CA")?;

    let mut csr_request = CsrRequest::with_new_key(NewKey::new(algorithm, dir.join("key.pem")))
        .subject("CN", args.cn.as_str())
        .alt_name("DNS.1", args.cn.as_str())
        .output_file(dir.join("csr.pem"));
    for (key, value) in args.alt_name {
        csr_request = csr_request.alt_name(&key, value);
    }
    let csr = workflow
        .generate_csr(&csr_request)
        .await
        .context("Failed to generate certificate signing request")?;

    let mut sign = CaSignRequest::new(dir.join("csr.pem")).output_file(dir.join("cert.pem"));
    sign.expiry_days = args.days;
    let certificate = ca.sign(&sign).await.context("Failed to sign certificate")?;

    if json {
        let issued = Issued {
            ca_key,
            ca: ca.artifact,
            csr,
            certificate,
        };
        println!("{}", serde_json::to_string_pretty(&issued)?);
    } else {
        for artifact in [&ca.artifact, &csr, &certificate] {
            print_files(artifact);
        }
        println!("Issued certificate for {} in {}", args.cn, display_dir(dir));
    }
    Ok(())
}

async fn handle_ciphers(workflow: &CertificateWorkflow, json: bool) -> Result<()> {
    let ciphers = workflow
        .supported_ciphers()
        .await
        .context("Failed to list supported ciphers")?;
    if json {
        println!("{}", serde_json::to_string_pretty(ciphers)?);
    } else {
        for cipher in ciphers {
            println!("{cipher}");
        }
    }
    Ok(())
}

async fn handle_version(workflow: &CertificateWorkflow, json: bool) -> Result<()> {
    let version = workflow
        .toolkit_version()
        .await
        .context("Failed to query toolkit version")?;
    if json {
        println!("{}", serde_json::json!({ "version": version }));
    } else {
        println!("{}", version.as_deref().unwrap_or("unknown"));
    }
    Ok(())
}

fn print_key(key: &PrivateKey, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(key)?);
        return Ok(());
    }
    println!("{}", key.command);
    if key.files.is_empty() {
        print!("{}", key.key);
    }
    for (role, path) in &key.files {
        println!("{role}: {}", path.display());
    }
    Ok(())
}

fn print_artifact(artifact: &WorkflowArtifact, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(artifact)?);
        return Ok(());
    }
    println!("{}", artifact.command);
    print_files(artifact);
    if artifact.files.is_empty() {
        print!("{}", artifact.output);
    }
    Ok(())
}

fn print_files(artifact: &WorkflowArtifact) {
    for (role, path) in &artifact.files {
        println!("{role}: {}", path.display());
    }
}

fn display_dir(dir: &Path) -> String {
    match dir.canonicalize() {
        Ok(path) => path.display().to_string(),
        Err(_) => dir.display().to_string(),
    }
}
