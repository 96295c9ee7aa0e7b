//! Credential options for a single request.
//!
//! Callers request client-authenticated TLS by putting some of the
//! following names in an outgoing request's option mapping:
//!
//! | Name                   | Value | Meaning |
//! |------------------------|-------|---------|
//! | `ssl_certificate_blob` | bytes | Client certificate |
//! | `ssl_certificate`      | path  | File containing the client certificate |
//! | `ssl_key_blob`         | bytes | Client private key |
//! | `ssl_key`              | path  | File containing the client private key |
//! | `ssl_key_password`     | text  | Passphrase for the private key |
//!
//! [`CredentialOptions::from_request_options`] picks these out of such a
//! mapping. All other names are left for the host to interpret.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Request option name for the client certificate bytes.
pub const SSL_CERTIFICATE_BLOB: &str = "ssl_certificate_blob";
/// Request option name for the client certificate file.
pub const SSL_CERTIFICATE: &str = "ssl_certificate";
/// Request option name for the client private key bytes.
pub const SSL_KEY_BLOB: &str = "ssl_key_blob";
/// Request option name for the client private key file.
pub const SSL_KEY: &str = "ssl_key";
/// Request option name for the private key passphrase.
pub const SSL_KEY_PASSWORD: &str = "ssl_key_password";

/// A value in a host's request option mapping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOptionValue {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// A string.
    Text(String),
}

impl From<Vec<u8>> for RequestOptionValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for RequestOptionValue {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<String> for RequestOptionValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for RequestOptionValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl RequestOptionValue {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b,
            Self::Text(s) => s.into_bytes(),
        }
    }

    fn into_text(self, name: &'static str) -> Result<String, RequestOptionsError> {
        match self {
            Self::Text(s) => Ok(s),
            Self::Bytes(b) => String::from_utf8(b).map_err(|e| RequestOptionsError::NotText {
                name,
                source: e.utf8_error(),
            }),
        }
    }
}

/// Error returned by [`CredentialOptions::from_request_options`].
#[derive(Debug, Error)]
pub enum RequestOptionsError {
    /// A path or passphrase option was given bytes that are not UTF-8.
    #[error("request option {name} must be text")]
    NotText {
        /// Name of the offending option.
        name: &'static str,
        /// Decoding failure.
        #[source]
        source: std::str::Utf8Error,
    },
}

/// One of the two credential slots that can be given either in memory or
/// as a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The client certificate.
    Certificate,
    /// The client private key.
    Key,
}

impl Slot {
    /// Lower-case name, as used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::Certificate => "certificate",
            Self::Key => "key",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The credential options requested for one request attempt. Every option
/// is independent and optional.
///
/// ```
/// use comprehensive_client_tls::CredentialOptions;
///
/// let options = CredentialOptions::default()
///     .with_certificate_blob(b"CERTDATA".to_vec())
///     .with_key_path("/etc/client/key.pem")
///     .with_key_password("secret");
/// assert!(options.certificate_path().is_none());
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialOptions {
    certificate_blob: Option<Vec<u8>>,
    certificate_path: Option<PathBuf>,
    key_blob: Option<Vec<u8>>,
    key_path: Option<PathBuf>,
    key_password: Option<String>,
}

impl CredentialOptions {
    /// Extract the recognised credential options from a request's option
    /// mapping. Names that are not credential options are ignored.
    pub fn from_request_options<I, K, V>(options: I) -> Result<Self, RequestOptionsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<RequestOptionValue>,
    {
        let mut out = Self::default();
        for (name, value) in options {
            let value: RequestOptionValue = value.into();
            match name.as_ref() {
                SSL_CERTIFICATE_BLOB => out.certificate_blob = Some(value.into_bytes()),
                SSL_CERTIFICATE => {
                    out.certificate_path = Some(value.into_text(SSL_CERTIFICATE)?.into())
                }
                SSL_KEY_BLOB => out.key_blob = Some(value.into_bytes()),
                SSL_KEY => out.key_path = Some(value.into_text(SSL_KEY)?.into()),
                SSL_KEY_PASSWORD => out.key_password = Some(value.into_text(SSL_KEY_PASSWORD)?),
                _ => (),
            }
        }
        Ok(out)
    }

    /// Supply the client certificate in memory.
    pub fn with_certificate_blob(mut self, blob: impl Into<Vec<u8>>) -> Self {
        self.certificate_blob = Some(blob.into());
        self
    }

    /// Supply the client certificate as a file.
    pub fn with_certificate_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_path = Some(path.into());
        self
    }

    /// Supply the client private key in memory.
    pub fn with_key_blob(mut self, blob: impl Into<Vec<u8>>) -> Self {
        self.key_blob = Some(blob.into());
        self
    }

    /// Supply the client private key as a file.
    pub fn with_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_path = Some(path.into());
        self
    }

    /// Supply the private key passphrase.
    pub fn with_key_password(mut self, password: impl Into<String>) -> Self {
        self.key_password = Some(password.into());
        self
    }

    /// Client certificate bytes, if given.
    pub fn certificate_blob(&self) -> Option<&[u8]> {
        self.certificate_blob.as_deref()
    }

    /// Client certificate file, if given.
    pub fn certificate_path(&self) -> Option<&Path> {
        self.certificate_path.as_deref()
    }

    /// Client private key bytes, if given.
    pub fn key_blob(&self) -> Option<&[u8]> {
        self.key_blob.as_deref()
    }

    /// Client private key file, if given.
    pub fn key_path(&self) -> Option<&Path> {
        self.key_path.as_deref()
    }

    /// Private key passphrase, if given.
    pub fn key_password(&self) -> Option<&str> {
        self.key_password.as_deref()
    }

    /// True if no credential option at all was given.
    pub fn is_empty(&self) -> bool {
        self.certificate_blob.is_none()
            && self.certificate_path.is_none()
            && self.key_blob.is_none()
            && self.key_path.is_none()
            && self.key_password.is_none()
    }

    pub(crate) fn blob(&self, slot: Slot) -> Option<&[u8]> {
        match slot {
            Slot::Certificate => self.certificate_blob(),
            Slot::Key => self.key_blob(),
        }
    }

    pub(crate) fn path(&self, slot: Slot) -> Option<&Path> {
        match slot {
            Slot::Certificate => self.certificate_path(),
            Slot::Key => self.key_path(),
        }
    }
}

impl std::fmt::Debug for CredentialOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        struct Blob<'a>(&'a Option<Vec<u8>>);

        impl std::fmt::Debug for Blob<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.0 {
                    Some(b) => write!(f, "<{} bytes>", b.len()),
                    None => f.write_str("None"),
                }
            }
        }

        f.debug_struct("CredentialOptions")
            .field("certificate_blob", &Blob(&self.certificate_blob))
            .field("certificate_path", &self.certificate_path)
            .field("key_blob", &Blob(&self.key_blob))
            .field("key_path", &self.key_path)
            .field(
                "key_password",
                &self.key_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
