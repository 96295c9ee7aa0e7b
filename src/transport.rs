//! The option-setting surface of a TLS transport.
//!
//! A transport (such as a libcurl easy handle) is represented by a type
//! implementing [`TlsOptionSink`]. The resolver never looks inside the
//! handle; it only sets options and inspects the result. Transports that
//! cannot take credential material in memory report
//! [`SetOptionError::Unsupported`] for the blob options, which is what
//! drives the fallback to temporary files.

use std::error::Error;
use std::path::Path;
use thiserror::Error;

/// Identifies one of the credential options a transport understands,
/// without its value. Used in errors and logs, where values must not
/// appear.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TlsOptionKind {
    /// Client certificate given in memory.
    CertificateBlob,
    /// Client certificate given as a file name.
    CertificatePath,
    /// Client private key given in memory.
    KeyBlob,
    /// Client private key given as a file name.
    KeyPath,
    /// Passphrase for the client private key.
    KeyPassword,
}

impl std::fmt::Display for TlsOptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match *self {
            Self::CertificateBlob => "certificate blob",
            Self::CertificatePath => "certificate path",
            Self::KeyBlob => "key blob",
            Self::KeyPath => "key path",
            Self::KeyPassword => "key password",
        })
    }
}

/// A credential option together with its value, as handed to
/// [`TlsOptionSink::set_option`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TlsOption<'a> {
    /// Client certificate bytes.
    CertificateBlob(&'a [u8]),
    /// Name of a file containing the client certificate.
    CertificatePath(&'a Path),
    /// Client private key bytes.
    KeyBlob(&'a [u8]),
    /// Name of a file containing the client private key.
    KeyPath(&'a Path),
    /// Passphrase for the client private key.
    KeyPassword(&'a str),
}

impl TlsOption<'_> {
    /// Which option this is.
    pub fn kind(&self) -> TlsOptionKind {
        match *self {
            Self::CertificateBlob(_) => TlsOptionKind::CertificateBlob,
            Self::CertificatePath(_) => TlsOptionKind::CertificatePath,
            Self::KeyBlob(_) => TlsOptionKind::KeyBlob,
            Self::KeyPath(_) => TlsOptionKind::KeyPath,
            Self::KeyPassword(_) => TlsOptionKind::KeyPassword,
        }
    }
}

// Values are secret or at least sensitive, print only which option it is
// and for paths the file name.
impl std::fmt::Debug for TlsOption<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::CertificatePath(p) | Self::KeyPath(p) => {
                write!(f, "{:?}({})", self.kind(), p.display())
            }
            Self::CertificateBlob(b) | Self::KeyBlob(b) => {
                write!(f, "{:?}(<{} bytes>)", self.kind(), b.len())
            }
            Self::KeyPassword(_) => write!(f, "{:?}(<redacted>)", self.kind()),
        }
    }
}

/// Failure returned by a transport when setting an option.
#[derive(Debug, Error)]
pub enum SetOptionError {
    /// The transport does not support this option or this kind of value,
    /// for example because the TLS backend it was built with has no
    /// support for in-memory credentials. This is the signal to retry
    /// with a file.
    #[error("option not supported by this transport")]
    Unsupported,
    /// Any other failure. The handle should be considered unusable.
    #[error("{0}")]
    Failed(#[source] Box<dyn Error + Send + Sync + 'static>),
}

impl SetOptionError {
    /// Wrap an arbitrary transport error.
    pub fn failed<E>(e: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        Self::Failed(e.into())
    }
}

/// The TLS configuration surface of one in-flight request.
pub trait TlsOptionSink {
    /// Set a single credential option on the transport.
    fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError>;
}

impl<T: TlsOptionSink + ?Sized> TlsOptionSink for &mut T {
    fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
        (**self).set_option(option)
    }
}
