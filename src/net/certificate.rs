//! Self-signed certificate lifecycle.
//!
//! # Responsibilities
//! - Load user-supplied key/cert pairs verbatim
//! - Generate a self-signed `localhost` certificate when none is supplied
//! - Persist the generated bundle (key PEM followed by cert PEM)
//! - Rotate the persisted bundle once it is older than 30 days
//!
//! # Design Decisions
//! - User material is never rotated and never touches the generated store
//! - Age comes from the file's creation time (modification time where the
//!   filesystem has no birth time)
//! - A persisted bundle that no longer parses is treated as absent
//! - The bundle is obtained once at startup; requests never re-check it

use std::fs;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose,
    SanType,
};
use time::OffsetDateTime;

use crate::config::ServerConfig;
use crate::error::ServerError;

/// Persisted bundles older than this are deleted and regenerated.
pub const ROTATION_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Validity period written into generated certificates.
pub const VALIDITY_DAYS: i64 = 30;

const CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// Where a bundle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleSource {
    /// `--key`/`--cert` supplied by the user.
    User,
    /// Loaded from the generated-certificate store.
    Persisted,
    /// Generated during this startup.
    Generated,
}

/// TLS key material for the listener.
#[derive(Clone)]
pub struct CertificateBundle {
    /// PEM-encoded private key.
    pub private_key: Vec<u8>,
    /// PEM-encoded certificate.
    pub certificate: Vec<u8>,
    pub created_at: SystemTime,
    pub source: BundleSource,
}

impl std::fmt::Debug for CertificateBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateBundle")
            .field("private_key", &"<redacted>")
            .field("certificate_len", &self.certificate.len())
            .field("created_at", &self.created_at)
            .field("source", &self.source)
            .finish()
    }
}

impl CertificateBundle {
    /// The on-disk form: key PEM followed by certificate PEM.
    pub fn to_pem(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.private_key.len() + self.certificate.len());
        out.extend_from_slice(&self.private_key);
        out.extend_from_slice(&self.certificate);
        out
    }

    /// Split a persisted bundle back into key and certificate.
    ///
    /// Returns `None` unless the key half holds a private key and the
    /// certificate half holds at least one certificate.
    pub fn from_pem(data: &[u8], created_at: SystemTime) -> Option<Self> {
        let text = std::str::from_utf8(data).ok()?;
        let split = text.find(CERT_MARKER)?;
        let (key, cert) = text.split_at(split);

        rustls_pemfile::private_key(&mut key.as_bytes()).ok()??;
        if !rustls_pemfile::certs(&mut cert.as_bytes()).any(|c| c.is_ok()) {
            return None;
        }

        Some(Self {
            private_key: key.as_bytes().to_vec(),
            certificate: cert.as_bytes().to_vec(),
            created_at,
            source: BundleSource::Persisted,
        })
    }
}

/// Fields of a generated self-signed certificate.
#[derive(Debug, Clone)]
pub struct CertificateSpec {
    pub common_name: String,
    pub dns_names: Vec<String>,
    pub ip_addresses: Vec<IpAddr>,
    pub validity_days: i64,
}

impl Default for CertificateSpec {
    fn default() -> Self {
        Self {
            common_name: "localhost".to_string(),
            dns_names: vec![
                "localhost".to_string(),
                "localhost.localdomain".to_string(),
                "*.localhost".to_string(),
            ],
            ip_addresses: vec![
                IpAddr::V6(Ipv6Addr::LOCALHOST),
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                IpAddr::V6(Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1)),
            ],
            validity_days: VALIDITY_DAYS,
        }
    }
}

/// Generate a fresh self-signed bundle valid from `now`.
pub fn generate_self_signed_bundle(
    spec: &CertificateSpec,
    now: SystemTime,
) -> Result<CertificateBundle, ServerError> {
    let mut params = CertificateParams::new(Vec::<String>::new())?;

    let mut distinguished_name = DistinguishedName::new();
    distinguished_name.push(DnType::CommonName, spec.common_name.clone());
    params.distinguished_name = distinguished_name;

    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::ContentCommitment,
        KeyUsagePurpose::KeyEncipherment,
        KeyUsagePurpose::DataEncipherment,
    ];

    for name in &spec.dns_names {
        params
            .subject_alt_names
            .push(SanType::DnsName(name.as_str().try_into()?));
    }
    for ip in &spec.ip_addresses {
        params.subject_alt_names.push(SanType::IpAddress(*ip));
    }

    let not_before = OffsetDateTime::from(now);
    params.not_before = not_before;
    params.not_after = not_before + time::Duration::days(spec.validity_days);

    let key_pair = generate_key_pair()?;
    let certificate = params.self_signed(&key_pair)?;

    Ok(CertificateBundle {
        private_key: key_pair.serialize_pem().into_bytes(),
        certificate: certificate.pem().into_bytes(),
        created_at: now,
        source: BundleSource::Generated,
    })
}

/// RSA-2048/SHA-256 where the crypto backend can generate RSA keys,
/// ECDSA P-256/SHA-256 otherwise.
fn generate_key_pair() -> Result<KeyPair, rcgen::Error> {
    KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256).or_else(|e| {
        tracing::debug!(error = %e, "RSA key generation unavailable, using ECDSA P-256");
        KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
    })
}

/// On-disk store for the generated bundle.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    path: PathBuf,
    max_age: Duration,
}

impl CertificateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_age: ROTATION_AGE,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted bundle if it exists and is younger than the
    /// rotation age. Stale or unreadable bundles are deleted.
    pub fn load_fresh(&self, now: SystemTime) -> Option<CertificateBundle> {
        let meta = fs::metadata(&self.path).ok()?;
        let created_at = meta.created().or_else(|_| meta.modified()).unwrap_or(now);
        let age = now.duration_since(created_at).unwrap_or_default();

        if age > self.max_age {
            tracing::info!(
                path = %self.path.display(),
                age_days = age.as_secs() / 86_400,
                "Certificate older than 30 days, removing"
            );
            self.remove();
            return None;
        }

        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read certificate");
                return None;
            }
        };

        match CertificateBundle::from_pem(&data, created_at) {
            Some(bundle) => Some(bundle),
            None => {
                tracing::warn!(path = %self.path.display(), "Persisted certificate is malformed, removing");
                self.remove();
                None
            }
        }
    }

    /// Write the bundle, creating the parent directory.
    pub fn persist(&self, bundle: &CertificateBundle) -> Result<(), ServerError> {
        let write_err = |source: io::Error| ServerError::CertificateWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        fs::write(&self.path, bundle.to_pem()).map_err(write_err)
    }

    fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove certificate");
        }
    }
}

/// Obtain TLS material for the listener.
pub fn obtain(config: &ServerConfig) -> Result<CertificateBundle, ServerError> {
    obtain_at(config, SystemTime::now())
}

/// [`obtain`] with an explicit clock, used to exercise rotation.
pub fn obtain_at(config: &ServerConfig, now: SystemTime) -> Result<CertificateBundle, ServerError> {
    match (&config.user_key_path, &config.user_cert_path) {
        (Some(key), Some(cert)) => return read_user_bundle(key, cert),
        (None, None) => {}
        _ => tracing::warn!("Both --key and --cert are needed to use your own certificate, generating one instead"),
    }

    let store = CertificateStore::new(&config.cert_store_path);
    if let Some(bundle) = store.load_fresh(now) {
        tracing::debug!(path = %store.path().display(), "Using persisted certificate");
        return Ok(bundle);
    }

    let bundle = generate_self_signed_bundle(&CertificateSpec::default(), now)?;
    store.persist(&bundle)?;
    tracing::info!(path = %store.path().display(), "Generated self-signed certificate");
    Ok(bundle)
}

fn read_user_bundle(key_path: &Path, cert_path: &Path) -> Result<CertificateBundle, ServerError> {
    let private_key = read_user_file("key", key_path)?;
    let certificate = read_user_file("certificate", cert_path)?;
    let created_at = fs::metadata(cert_path)
        .and_then(|m| m.modified())
        .unwrap_or_else(|_| SystemTime::now());

    Ok(CertificateBundle {
        private_key,
        certificate,
        created_at,
        source: BundleSource::User,
    })
}

fn read_user_file(kind: &'static str, path: &Path) -> Result<Vec<u8>, ServerError> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ServerError::UserTlsFileMissing {
            kind,
            path: path.to_path_buf(),
        },
        _ => ServerError::Io(e),
    })
}
