//! Certificate issuance on top of the `openssl` command line toolkit.
//!
//! `sslforge` never performs cryptography itself. It renders the toolkit's
//! `.cnf` configuration documents ([`cnf`]), runs the toolkit as a
//! subprocess with a completion protocol that settles exactly once
//! ([`process`]), and chains key, CSR, root CA and signing steps through a
//! stateful [`CertificateWorkflow`].
//!
//! ```no_run
//! use sslforge::{
//!     CaSignRequest, CertificateWorkflow, CsrRequest, KeyAlgorithm, PrivateKeyRequest,
//!     RootCaRequest,
//! };
//!
//! # async fn issue() -> sslforge::Result<()> {
//! let workflow = CertificateWorkflow::default();
//! workflow
//!     .generate_private_key(&PrivateKeyRequest::new(KeyAlgorithm::Rsa).output_file("ca.key"))
//!     .await?;
//! let ca = workflow
//!     .generate_root_ca(&RootCaRequest::new("ca.key", "ca.crt").subject("CN", "Example CA"))
//!     .await?;
//!
//! let leaf_key = PrivateKeyRequest::new(KeyAlgorithm::Ed25519).output_file("leaf.key");
//! workflow.generate_private_key(&leaf_key).await?;
//! workflow
//!     .generate_csr(&CsrRequest::with_key("leaf.key").subject("CN", "example.com"))
//!     .await?;
//! let leaf = ca.sign(&CaSignRequest::new("csr.pem").output_file("leaf.crt")).await?;
//! println!("{}", leaf.command);
//! # Ok(())
//! # }
//! ```

pub mod cnf;
pub mod config;
pub mod error;
pub mod process;
pub mod workflow;

pub use config::ToolkitConfig;
pub use error::{Result, ValidationError, WorkflowError};
pub use process::{CommandLog, CommandResult, ProcessRunner, ToolkitCommand};
pub use workflow::{
    CaIdentity, CaSignRequest, CaSigner, CertificateWorkflow, CsrRequest, FileRole, KeyAlgorithm,
    KeyEncryption, NewKey, PrivateKey, PrivateKeyRequest, RootCa, RootCaRequest, SignRequest,
    WorkflowArtifact, WorkflowOptions,
};
