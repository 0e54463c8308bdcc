//! Signing a CSR with a CA (`req -x509 -in ... -CA ...`)

use std::path::PathBuf;

use log::info;

use super::CertificateWorkflow;
use super::artifact::{ArtifactFiles, FileRole, WorkflowArtifact};
use super::params::with_passphrase;
use crate::error::Result;
use crate::process::{OUTPUT_FLAG, ToolkitCommand};

#[derive(Debug, Clone, Default)]
pub struct SignRequest {
    pub csr_file: PathBuf,
    pub ca_crt_file: PathBuf,
    pub ca_key_file: PathBuf,
    pub config_file: PathBuf,
    pub ca_key_passphrase: Option<String>,
    pub expiry_days: Option<u32>,
    /// Certificate is printed to stdout when unset
    pub output_file: Option<PathBuf>,
    /// Config section applied as certificate extensions
    pub extensions: Option<String>,
}

pub(crate) fn sign_command(request: &SignRequest, days: u32) -> ToolkitCommand {
    let mut cmd = ToolkitCommand::new("req")
        .arg("-x509")
        .path_opt("-in", &request.csr_file)
        .path_opt("-CA", &request.ca_crt_file)
        .path_opt("-CAkey", &request.ca_key_file)
        .path_opt("-config", &request.config_file)
        .opt("-days", days.to_string())
        .opt("-copy_extensions", "copyall");

    if let Some(section) = &request.extensions {
        cmd = cmd.opt("-extensions", section.as_str());
    }
    if let Some(passphrase) = &request.ca_key_passphrase {
        cmd = with_passphrase(cmd, "-passin", passphrase);
    }
    if let Some(output) = &request.output_file {
        cmd = cmd.path_opt(OUTPUT_FLAG, output);
    }
    cmd
}

impl CertificateWorkflow {
    /// Issue a certificate for a CSR, carrying over the request's extensions
    pub async fn sign_csr(&self, request: &SignRequest) -> Result<WorkflowArtifact> {
        let cmd = sign_command(request, self.expiry_days(request.expiry_days));
        let result = self.run(&cmd).await?;

        let mut files = ArtifactFiles::new();
        if let Some(output) = &request.output_file {
            files.insert(FileRole::Crt, output.clone());
            info!("Signed certificate written to {}", output.display());
        }

        Ok(WorkflowArtifact {
            output: result.stdout_text(),
            command: result.command,
            config: String::new(),
            files,
        })
    }
}
