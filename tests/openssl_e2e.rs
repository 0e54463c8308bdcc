//! End-to-end issuance against the system `openssl`.
//!
//! Skipped unless an OpenSSL 3.x binary is on `PATH`; `req -x509 -CA` and
//! `-copy_extensions` do not exist in older releases or in LibreSSL.

use std::path::PathBuf;

use sslforge::{
    CaSignRequest, CertificateWorkflow, CsrRequest, FileRole, KeyAlgorithm, PrivateKeyRequest,
    RootCaRequest, ValidationError, WorkflowError, WorkflowOptions,
};
use tempfile::TempDir;

async fn openssl3(dir: &TempDir) -> Option<CertificateWorkflow> {
    let program: PathBuf = which::which("openssl").ok()?;
    let workflow = CertificateWorkflow::with_options(
        program,
        WorkflowOptions {
            temp_dir: dir.path().to_path_buf(),
            default_csr_file: dir.path().join("csr.pem"),
            ..WorkflowOptions::default()
        },
    );

    let version = workflow.toolkit_version().await.ok()??;
    let banner = workflow.command_log().last()?.stdout_text();
    let major: u32 = version.split('.').next()?.parse().ok()?;
    if banner.starts_with("OpenSSL") && major >= 3 {
        Some(workflow)
    } else {
        eprintln!("skipping: need OpenSSL 3, found {}", banner.trim());
        None
    }
}

#[tokio::test]
async fn self_signed_chain() {
    let dir = tempfile::tempdir().unwrap();
    let Some(workflow) = openssl3(&dir).await else {
        return;
    };
    let path = |name: &str| dir.path().join(name);

    // Leaf key
    let key = workflow
        .generate_private_key(
            &PrivateKeyRequest::new(KeyAlgorithm::Rsa)
                .pkey_opt("rsa_keygen_bits", 2048u32)
                .output_file(path("key.pem")),
        )
        .await
        .unwrap();
    assert!(key.command.contains("genpkey"));
    assert!(key.command.contains("-algorithm RSA"));
    assert_eq!(workflow.command_log().last().map(|r| r.exit_code), Some(0));
    assert!(path("key.pem").exists());

    // CSR against that key
    let csr = workflow
        .generate_csr(
            &CsrRequest::with_key(path("key.pem"))
                .digest("sha256")
                .subject("CN", "example.com")
                .alt_name("DNS.1", "example.com")
                .alt_name("IP.1", "127.0.0.1"),
        )
        .await
        .unwrap();
    assert!(csr.config.contains("default_md             = sha256\n"));
    assert!(csr.config.contains("[ req_distinguished_name ]\n"));
    assert!(path("csr.pem").exists());

    // Root CA on its own EC key
    workflow
        .generate_private_key(
            &PrivateKeyRequest::new(KeyAlgorithm::Ec)
                .pkey_opt("ec_paramgen_curve", "P-256")
                .output_file(path("ca.key")),
        )
        .await
        .unwrap();
    let ca = workflow
        .generate_root_ca(
            &RootCaRequest::new(path("ca.key"), path("ca.crt"))
                .subject("O", "sslforge tests")
                .subject("CN", "sslforge Test Root")
                .expiry_days(1095),
        )
        .await
        .unwrap();
    assert!(path("ca.crt").exists());

    // Bound signer
    let crt = path("cert.pem");
    let signed = ca
        .sign(&CaSignRequest::new(path("csr.pem")).output_file(&crt))
        .await
        .unwrap();
    assert_eq!(signed.file(FileRole::Crt), Some(crt.as_path()));
    let pem = std::fs::read_to_string(&crt).unwrap();
    assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));

    assert!(workflow.command_log().snapshot().iter().all(|r| r.success()));
}

#[tokio::test]
async fn encrypted_key_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let Some(workflow) = openssl3(&dir).await else {
        return;
    };
    let key_file = dir.path().join("enc.key");

    let key = workflow
        .generate_private_key(
            &PrivateKeyRequest::new(KeyAlgorithm::Ec)
                .pkey_opt("ec_paramgen_curve", "P-256")
                .encrypted("aes-256-cbc", "correct horse")
                .output_file(&key_file),
        )
        .await
        .unwrap();
    assert!(key.command.contains("-pass stdin -aes-256-cbc"));
    let pem = std::fs::read_to_string(&key_file).unwrap();
    assert!(pem.contains("ENCRYPTED PRIVATE KEY"));

    let mut request = CsrRequest::with_key(&key_file).subject("CN", "locked.example.com");
    request.key_passphrase = Some("correct horse".into());
    workflow.generate_csr(&request).await.unwrap();

    request.key_passphrase = Some("wrong".into());
    let err = workflow.generate_csr(&request).await.unwrap_err();
    let failure = err.command_result().expect("toolkit failure");
    assert_ne!(failure.exit_code, 0);
    assert!(!failure.stderr.is_empty());
}

#[tokio::test]
async fn unknown_cipher_is_rejected_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let Some(workflow) = openssl3(&dir).await else {
        return;
    };

    let err = workflow
        .generate_private_key(
            &PrivateKeyRequest::new(KeyAlgorithm::Rsa).encrypted("not-a-real-cipher", "pw"),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Validation(ValidationError::InvalidCipher(_))
    ));
    assert!(
        workflow
            .command_log()
            .snapshot()
            .iter()
            .all(|r| !r.command.contains("genpkey"))
    );
}
