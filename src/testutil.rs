use std::path::PathBuf;

use crate::transport::{SetOptionError, TlsOption, TlsOptionKind, TlsOptionSink};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Applied {
    CertificateBlob(Vec<u8>),
    CertificatePath(PathBuf),
    KeyBlob(Vec<u8>),
    KeyPath(PathBuf),
    KeyPassword(String),
}

impl From<TlsOption<'_>> for Applied {
    fn from(o: TlsOption<'_>) -> Self {
        match o {
            TlsOption::CertificateBlob(b) => Self::CertificateBlob(b.to_vec()),
            TlsOption::CertificatePath(p) => Self::CertificatePath(p.to_path_buf()),
            TlsOption::KeyBlob(b) => Self::KeyBlob(b.to_vec()),
            TlsOption::KeyPath(p) => Self::KeyPath(p.to_path_buf()),
            TlsOption::KeyPassword(s) => Self::KeyPassword(s.to_owned()),
        }
    }
}

/// Stand-in for a transport handle. Records every option it accepts and
/// the kinds of those it turns down.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub(crate) reject_blobs: bool,
    pub(crate) fail_on: Option<TlsOptionKind>,
    pub(crate) applied: Vec<Applied>,
    pub(crate) refused: Vec<TlsOptionKind>,
}

impl RecordingSink {
    pub(crate) fn accepting_blobs() -> Self {
        Self::default()
    }

    pub(crate) fn rejecting_blobs() -> Self {
        Self {
            reject_blobs: true,
            ..Self::default()
        }
    }

    pub(crate) fn failing_on(mut self, kind: TlsOptionKind) -> Self {
        self.fail_on = Some(kind);
        self
    }
}

impl TlsOptionSink for RecordingSink {
    fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
        let kind = option.kind();
        if self.fail_on == Some(kind) {
            self.refused.push(kind);
            return Err(SetOptionError::failed(format!("{} exploded", kind)));
        }
        if self.reject_blobs
            && matches!(kind, TlsOptionKind::CertificateBlob | TlsOptionKind::KeyBlob)
        {
            self.refused.push(kind);
            return Err(SetOptionError::Unsupported);
        }
        self.applied.push(option.into());
        Ok(())
    }
}
