use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Issue keys, CSRs and certificates through openssl")]
pub struct Args {
    /// Path to configuration file (default: <config dir>/sslforge/sslforge.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Generate a private key (genpkey)
    Key(KeyArgs),
    /// Generate a certificate signing request
    Csr(CsrArgs),
    /// Create a self-signed root CA from an existing key
    Ca(CaArgs),
    /// Sign a CSR with an existing CA
    Sign(SignArgs),
    /// Create a CA, a leaf key and CSR, and sign it, all in one directory
    Issue(IssueArgs),
    /// List ciphers usable for key encryption
    Ciphers,
    /// Print the toolkit version
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct KeyArgs {
    /// RSA, RSA-PSS, EC, X25519, X448, ED25519 or ED448
    #[arg(long, short = 'a', conflicts_with = "param_file")]
    pub algorithm: Option<String>,

    /// Derive the algorithm from a parameter file
    #[arg(long)]
    pub param_file: Option<PathBuf>,

    /// Algorithm option as KEY=VALUE (repeatable)
    #[arg(long = "pkeyopt", value_parser = parse_key_value)]
    pub pkey_opts: Vec<(String, String)>,

    /// Encrypt the key with this cipher
    #[arg(long, requires = "password")]
    pub cipher: Option<String>,

    /// Key password, or a source such as env:VAR or file:PATH
    #[arg(long, requires = "cipher")]
    pub password: Option<String>,

    /// Write the key to a file instead of stdout
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct CsrArgs {
    /// Existing private key
    #[arg(long, short = 'k', conflicts_with = "new_key", required_unless_present = "new_key")]
    pub key: Option<PathBuf>,

    /// Mint a new key with this algorithm
    #[arg(long)]
    pub new_key: Option<String>,

    /// Size of the new key
    #[arg(long, requires = "new_key")]
    pub bits: Option<u32>,

    /// Where the new key is written
    #[arg(long, default_value = "key.pem")]
    pub keyout: PathBuf,

    /// Passphrase of an encrypted existing key
    #[arg(long, conflicts_with = "new_key")]
    pub passin: Option<String>,

    #[arg(long)]
    pub digest: Option<String>,

    /// Distinguished name field as KEY=VALUE (repeatable)
    #[arg(long, short = 's', value_parser = parse_key_value)]
    pub subject: Vec<(String, String)>,

    /// Alternate name as KEY=VALUE, e.g. DNS.1=example.com (repeatable)
    #[arg(long, value_parser = parse_key_value)]
    pub alt_name: Vec<(String, String)>,

    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct CaArgs {
    #[arg(long, short = 'k')]
    pub key: PathBuf,

    #[arg(long)]
    pub passin: Option<String>,

    #[arg(long, short = 'o', default_value = "ca.crt")]
    pub out: PathBuf,

    /// Distinguished name field as KEY=VALUE (repeatable)
    #[arg(long, short = 's', value_parser = parse_key_value)]
    pub subject: Vec<(String, String)>,

    #[arg(long)]
    pub days: Option<u32>,

    #[arg(long)]
    pub digest: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct SignArgs {
    #[arg(long)]
    pub csr: PathBuf,

    #[arg(long)]
    pub ca_cert: PathBuf,

    #[arg(long)]
    pub ca_key: PathBuf,

    /// Config document the CA was created with
    #[arg(long)]
    pub ca_config: PathBuf,

    #[arg(long)]
    pub passin: Option<String>,

    #[arg(long)]
    pub days: Option<u32>,

    /// Config section to apply as certificate extensions
    #[arg(long)]
    pub extensions: Option<String>,

    /// Print the certificate to stdout when omitted
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct IssueArgs {
    /// Common name of the leaf certificate
    #[arg(long)]
    pub cn: String,

    /// Extra alternate names as KEY=VALUE (the CN is always DNS.1)
    #[arg(long, value_parser = parse_key_value)]
    pub alt_name: Vec<(String, String)>,

    /// Output directory
    #[arg(long, short = 'd', default_value = ".")]
    pub dir: PathBuf,

    #[arg(long, default_value = "RSA")]
    pub algorithm: String,

    /// Leaf certificate validity
    #[arg(long)]
    pub days: Option<u32>,

    #[arg(long, default_value_t = 1095)]
    pub ca_days: u32,

    #[arg(long, default_value = "sslforge Root CA")]
    pub ca_name: String,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_value_pairs() {
        assert_eq!(
            parse_key_value("CN=example.com"),
            Ok(("CN".to_string(), "example.com".to_string()))
        );
        assert_eq!(
            parse_key_value("O=a=b"),
            Ok(("O".to_string(), "a=b".to_string()))
        );
        assert!(parse_key_value("=x").is_err());
        assert!(parse_key_value("CN").is_err());
    }

    #[test]
    fn csr_requires_a_key_source() {
        assert!(Args::try_parse_from(["sslforge", "csr", "-s", "CN=x"]).is_err());
        assert!(
            Args::try_parse_from(["sslforge", "csr", "--key", "k.pem", "--new-key", "RSA"])
                .is_err()
        );

        let args = Args::try_parse_from([
            "sslforge",
            "--json",
            "csr",
            "--new-key",
            "EC",
            "--subject",
            "CN=example.com",
        ])
        .unwrap();
        assert!(args.json);
        match args.sub {
            Cmd::Csr(csr) => {
                assert_eq!(csr.new_key.as_deref(), Some("EC"));
                assert_eq!(csr.keyout, PathBuf::from("key.pem"));
                assert_eq!(csr.subject, vec![("CN".to_string(), "example.com".to_string())]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
