//! Config documents for CSR and root CA generation

use super::{BlockRef, ConfigBlock, ConfigDocument};

pub const REQ: &str = "req";
pub const DISTINGUISHED_NAME: &str = "req_distinguished_name";
pub const REQ_EXTENSIONS: &str = "v3_req";
pub const CA_EXTENSIONS: &str = "v3_ca";
pub const LEAF_EXTENSIONS: &str = "v3_leaf";
pub const ALT_NAMES: &str = "alt_names";

/// Non-interactive `req` options shared by CSR and CA documents
fn req_options(digest: &str) -> ConfigBlock {
    ConfigBlock::new()
        .with("prompt", "no")
        .with("default_md", digest)
        .with("string_mask", "utf8only")
        .with("utf8", "yes")
}

fn request_extensions() -> ConfigBlock {
    ConfigBlock::new()
        .with("basicConstraints", "CA:FALSE")
        .with("keyUsage", "nonRepudiation, digitalSignature, keyEncipherment")
}

fn ca_extensions() -> ConfigBlock {
    ConfigBlock::new()
        .with("basicConstraints", "critical, CA:TRUE, pathlen:0")
        .with("subjectKeyIdentifier", "hash")
        .with("authorityKeyIdentifier", "keyid:always, issuer")
        .with("keyUsage", "critical, digitalSignature, keyCertSign, cRLSign")
}

// Applied on top of the extensions copied from the request when signing
fn leaf_extensions() -> ConfigBlock {
    ConfigBlock::new()
        .with("subjectKeyIdentifier", "hash")
        .with("authorityKeyIdentifier", "keyid, issuer")
}

/// `req` document for a certificate signing request.
///
/// `dn` and `alt_names` must already be sanitized.
pub fn csr_config(
    digest: &str,
    dn: Option<ConfigBlock>,
    alt_names: Option<ConfigBlock>,
) -> ConfigDocument {
    ConfigDocument::new()
        .block(REQ, Some(req_options(digest)))
        .block(DISTINGUISHED_NAME, dn)
        .block(REQ_EXTENSIONS, Some(request_extensions()))
        .block(ALT_NAMES, alt_names)
        .link(REQ, "distinguished_name", DISTINGUISHED_NAME, BlockRef::Name)
        .link(REQ, "req_extensions", REQ_EXTENSIONS, BlockRef::Name)
        .link(REQ_EXTENSIONS, "subjectAltName", ALT_NAMES, BlockRef::Section)
}

/// Self-signed `req -x509` document for a root CA, also used when the CA signs
pub fn ca_config(digest: &str, dn: Option<ConfigBlock>) -> ConfigDocument {
    ConfigDocument::new()
        .block(REQ, Some(req_options(digest)))
        .block(DISTINGUISHED_NAME, dn)
        .block(CA_EXTENSIONS, Some(ca_extensions()))
        .block(LEAF_EXTENSIONS, Some(leaf_extensions()))
        .link(REQ, "distinguished_name", DISTINGUISHED_NAME, BlockRef::Name)
        .link(REQ, "x509_extensions", CA_EXTENSIONS, BlockRef::Name)
}
