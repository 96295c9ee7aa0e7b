//! [`TlsOptionSink`] for libcurl easy handles.
//!
//! The `*_BLOB` options need libcurl 7.71 or later and a TLS backend that
//! implements them. Older libraries answer `CURLE_UNKNOWN_OPTION` and
//! backends without support answer `CURLE_NOT_BUILT_IN`. Both are reported
//! as [`SetOptionError::Unsupported`] so that the material is supplied as
//! a file instead.

use ::curl::easy::{Easy, Easy2, Handler};

use crate::transport::{SetOptionError, TlsOption, TlsOptionSink};

// curl::Error has no accessor for this code.
const CURLE_NOT_BUILT_IN: std::ffi::c_int = 4;

fn classify(e: ::curl::Error) -> SetOptionError {
    if e.is_unknown_option() || e.code() == CURLE_NOT_BUILT_IN {
        SetOptionError::Unsupported
    } else {
        SetOptionError::failed(e)
    }
}

impl TlsOptionSink for Easy {
    fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
        match option {
            TlsOption::CertificateBlob(b) => self.ssl_cert_blob(b),
            TlsOption::CertificatePath(p) => self.ssl_cert(p),
            TlsOption::KeyBlob(b) => self.ssl_key_blob(b),
            TlsOption::KeyPath(p) => self.ssl_key(p),
            TlsOption::KeyPassword(s) => self.key_password(s),
        }
        .map_err(classify)
    }
}

impl<H: Handler> TlsOptionSink for Easy2<H> {
    fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
        match option {
            TlsOption::CertificateBlob(b) => self.ssl_cert_blob(b),
            TlsOption::CertificatePath(p) => self.ssl_cert(p),
            TlsOption::KeyBlob(b) => self.ssl_key_blob(b),
            TlsOption::KeyPath(p) => self.ssl_key(p),
            TlsOption::KeyPassword(s) => self.key_password(s),
        }
        .map_err(classify)
    }
}
