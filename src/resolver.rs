//! Apply [`CredentialOptions`] to a transport, falling back from in-memory
//! credentials to temporary files.
//!
//! The certificate and the key are each resolved as follows:
//!
//! 1. If a file was named, set the path option and stop. Any blob given
//!    for the same slot is ignored.
//! 2. If a blob was given, set the blob option. If the transport accepts
//!    it, stop.
//! 3. If the transport reports [`SetOptionError::Unsupported`], write the
//!    blob to a file using the [`MaterialStore`] and set the path option
//!    instead.
//!
//! The certificate is resolved first, then the key, then the passphrase
//! is set.
//!
//! A slot whose blob cannot be written to a file does not stop the other
//! slots from being configured, but the request as a whole still fails
//! with [`ResolveError::Storage`] so that it is never sent without the
//! client credentials it asked for. Any transport failure other than
//! "unsupported" fails the request immediately.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::options::{CredentialOptions, Slot};
use crate::store::{MaterialStore, StorageError};
use crate::transport::{SetOptionError, TlsOption, TlsOptionKind, TlsOptionSink};

/// Error type returned by [`OptionResolver::configure`]
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The transport does not accept the credential in memory and writing
    /// it to a file failed.
    #[error("cannot supply client TLS {slot} as a file: {source}")]
    Storage {
        /// Which credential could not be supplied.
        slot: Slot,
        /// Underlying failure.
        #[source]
        source: StorageError,
    },
    /// The transport failed to set an option.
    #[error("cannot set client TLS {option}: {source}")]
    Transport {
        /// The option that was being set.
        option: TlsOptionKind,
        /// Underlying failure.
        #[source]
        source: SetOptionError,
    },
}

/// What happened to one credential slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Neither a blob nor a file was given.
    NotRequested,
    /// The transport took the blob as is.
    BlobAccepted,
    /// The path option was set.
    PathApplied {
        /// The file name given to the transport.
        path: PathBuf,
        /// True if the file was written by the [`MaterialStore`] because
        /// the transport rejected the blob, false if it was named by the
        /// caller.
        materialized: bool,
    },
}

/// Report of what [`OptionResolver::configure`] applied to a transport.
/// The caller's [`CredentialOptions`] are left as they were.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Outcome for the client certificate.
    pub certificate: SlotOutcome,
    /// Outcome for the client private key.
    pub key: SlotOutcome,
    /// Whether a key passphrase was set.
    pub key_password: bool,
}

fn blob_option(slot: Slot, blob: &[u8]) -> TlsOption<'_> {
    match slot {
        Slot::Certificate => TlsOption::CertificateBlob(blob),
        Slot::Key => TlsOption::KeyBlob(blob),
    }
}

fn path_option(slot: Slot, path: &Path) -> TlsOption<'_> {
    match slot {
        Slot::Certificate => TlsOption::CertificatePath(path),
        Slot::Key => TlsOption::KeyPath(path),
    }
}

fn set<S>(sink: &mut S, option: TlsOption<'_>) -> Result<(), ResolveError>
where
    S: TlsOptionSink + ?Sized,
{
    sink.set_option(option)
        .map_err(|source| ResolveError::Transport {
            option: option.kind(),
            source,
        })
}

/// Applies credential options to transports, with fallback to files held
/// in a shared [`MaterialStore`].
#[derive(Clone, Debug)]
pub struct OptionResolver {
    store: Arc<MaterialStore>,
}

impl OptionResolver {
    /// A resolver which materialises rejected blobs into `store`.
    pub fn new(store: Arc<MaterialStore>) -> Self {
        Self { store }
    }

    /// The store backing the fallback.
    pub fn store(&self) -> &Arc<MaterialStore> {
        &self.store
    }

    /// Apply `options` to `sink`.
    pub fn configure<S>(
        &self,
        sink: &mut S,
        options: &CredentialOptions,
    ) -> Result<Resolution, ResolveError>
    where
        S: TlsOptionSink + ?Sized,
    {
        let certificate = defer_storage_error(self.resolve_slot(sink, Slot::Certificate, options))?;
        let key = defer_storage_error(self.resolve_slot(sink, Slot::Key, options))?;
        let key_password = match options.key_password() {
            Some(password) => {
                set(sink, TlsOption::KeyPassword(password))?;
                true
            }
            None => false,
        };
        match (certificate, key) {
            (Ok(certificate), Ok(key)) => Ok(Resolution {
                certificate,
                key,
                key_password,
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(second)) => {
                log::warn!("{}", second);
                Err(e)
            }
        }
    }

    fn resolve_slot<S>(
        &self,
        sink: &mut S,
        slot: Slot,
        options: &CredentialOptions,
    ) -> Result<SlotOutcome, ResolveError>
    where
        S: TlsOptionSink + ?Sized,
    {
        if let Some(path) = options.path(slot) {
            if options.blob(slot).is_some() {
                log::debug!("Client TLS {} given both as a file and a blob; using the file", slot);
            }
            set(sink, path_option(slot, path))?;
            return Ok(SlotOutcome::PathApplied {
                path: path.to_path_buf(),
                materialized: false,
            });
        }
        let Some(blob) = options.blob(slot) else {
            return Ok(SlotOutcome::NotRequested);
        };
        let option = blob_option(slot, blob);
        match sink.set_option(option) {
            Ok(()) => return Ok(SlotOutcome::BlobAccepted),
            Err(SetOptionError::Unsupported) => (),
            Err(source) => {
                return Err(ResolveError::Transport {
                    option: option.kind(),
                    source,
                });
            }
        }

        log::debug!(
            "Transport does not accept client TLS {} in memory, supplying it as a file",
            slot
        );
        #[cfg(feature = "metrics")]
        crate::metrics::BLOB_FALLBACKS
            .with_label_values(&[slot.as_str()])
            .inc();
        let path = self
            .store
            .materialize(blob)
            .map_err(|source| ResolveError::Storage { slot, source })?;
        set(sink, path_option(slot, &path))?;
        Ok(SlotOutcome::PathApplied {
            path,
            materialized: true,
        })
    }
}

// Storage failures are held back so the remaining slots still get
// configured. Anything else stops the request now.
fn defer_storage_error(
    result: Result<SlotOutcome, ResolveError>,
) -> Result<Result<SlotOutcome, ResolveError>, ResolveError> {
    match result {
        Ok(outcome) => Ok(Ok(outcome)),
        Err(e @ ResolveError::Storage { .. }) => Ok(Err(e)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Applied, RecordingSink};

    fn resolver_in(dir: &Path) -> OptionResolver {
        OptionResolver::new(Arc::new(MaterialStore::in_dir(dir)))
    }

    fn full_blob_request() -> CredentialOptions {
        CredentialOptions::default()
            .with_certificate_blob(b"CERTDATA".to_vec())
            .with_key_blob(b"KEYDATA".to_vec())
            .with_key_password("secret")
    }

    #[test]
    fn blobs_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::accepting_blobs();
        let got = resolver
            .configure(&mut sink, &full_blob_request())
            .expect("configure");
        assert_eq!(
            sink.applied,
            vec![
                Applied::CertificateBlob(b"CERTDATA".to_vec()),
                Applied::KeyBlob(b"KEYDATA".to_vec()),
                Applied::KeyPassword("secret".into()),
            ]
        );
        assert_eq!(
            got,
            Resolution {
                certificate: SlotOutcome::BlobAccepted,
                key: SlotOutcome::BlobAccepted,
                key_password: true,
            }
        );
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn blobs_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::rejecting_blobs();
        let got = resolver
            .configure(&mut sink, &full_blob_request())
            .expect("configure");

        let (Applied::CertificatePath(cert), Applied::KeyPath(key)) =
            (sink.applied[0].clone(), sink.applied[1].clone())
        else {
            panic!("want certificate and key paths, got {:?}", sink.applied);
        };
        assert_eq!(sink.applied[2], Applied::KeyPassword("secret".into()));
        assert_eq!(sink.applied.len(), 3);
        assert_eq!(
            sink.refused,
            vec![TlsOptionKind::CertificateBlob, TlsOptionKind::KeyBlob]
        );
        assert_eq!(std::fs::read(&cert).unwrap(), b"CERTDATA");
        assert_eq!(std::fs::read(&key).unwrap(), b"KEYDATA");
        assert_eq!(
            got.certificate,
            SlotOutcome::PathApplied {
                path: cert.clone(),
                materialized: true
            }
        );
        assert_eq!(resolver.store().len(), 2);

        resolver.store().cleanup();
        assert!(!cert.exists());
        assert!(!key.exists());
    }

    #[test]
    fn key_fallback_writes_key_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::rejecting_blobs();
        let options = CredentialOptions::default()
            .with_certificate_path("/etc/client/cert.pem")
            .with_key_blob(b"KEYDATA".to_vec());
        resolver.configure(&mut sink, &options).expect("configure");
        let Applied::KeyPath(ref key) = sink.applied[1] else {
            panic!("want key path, got {:?}", sink.applied);
        };
        assert_eq!(std::fs::read(key).unwrap(), b"KEYDATA");
        assert_eq!(resolver.store().len(), 1);
    }

    #[test]
    fn explicit_path_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::rejecting_blobs();
        let options = CredentialOptions::default().with_certificate_path("/etc/client/cert.pem");
        let got = resolver.configure(&mut sink, &options).expect("configure");
        assert_eq!(
            sink.applied,
            vec![Applied::CertificatePath("/etc/client/cert.pem".into())]
        );
        assert!(sink.refused.is_empty());
        assert_eq!(
            got,
            Resolution {
                certificate: SlotOutcome::PathApplied {
                    path: "/etc/client/cert.pem".into(),
                    materialized: false,
                },
                key: SlotOutcome::NotRequested,
                key_password: false,
            }
        );
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn explicit_path_wins_over_blob() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::accepting_blobs();
        let options = CredentialOptions::default()
            .with_key_blob(b"KEYDATA".to_vec())
            .with_key_path("/etc/client/key.pem");
        resolver.configure(&mut sink, &options).expect("configure");
        assert_eq!(
            sink.applied,
            vec![Applied::KeyPath("/etc/client/key.pem".into())]
        );
    }

    #[test]
    fn nothing_requested() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::rejecting_blobs();
        let got = resolver
            .configure(&mut sink, &CredentialOptions::default())
            .expect("configure");
        assert!(sink.applied.is_empty());
        assert_eq!(got.certificate, SlotOutcome::NotRequested);
        assert_eq!(got.key, SlotOutcome::NotRequested);
        assert!(!got.key_password);
    }

    #[test]
    fn repeated_requests_reuse_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut first = RecordingSink::rejecting_blobs();
        let mut second = RecordingSink::rejecting_blobs();
        resolver
            .configure(&mut first, &full_blob_request())
            .expect("first request");
        resolver
            .configure(&mut second, &full_blob_request())
            .expect("second request");
        assert_eq!(first.applied, second.applied);
        assert_eq!(resolver.store().len(), 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn storage_failure_still_attempts_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir.path().join("missing"));
        let mut sink = RecordingSink::rejecting_blobs();
        let options = CredentialOptions::default()
            .with_certificate_blob(b"CERTDATA".to_vec())
            .with_key_path("/etc/client/key.pem")
            .with_key_password("secret");
        let err = resolver.configure(&mut sink, &options).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Storage {
                slot: Slot::Certificate,
                source: StorageError::Create { .. },
            }
        ));
        assert_eq!(
            sink.applied,
            vec![
                Applied::KeyPath("/etc/client/key.pem".into()),
                Applied::KeyPassword("secret".into()),
            ]
        );
    }

    #[test]
    fn key_storage_failure_fails_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir.path().join("missing"));
        let mut sink = RecordingSink::rejecting_blobs();
        let options = CredentialOptions::default()
            .with_certificate_path("/etc/client/cert.pem")
            .with_key_blob(b"KEYDATA".to_vec())
            .with_key_password("secret");
        let err = resolver.configure(&mut sink, &options).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Storage {
                slot: Slot::Key,
                source: StorageError::Create { .. },
            }
        ));
        assert_eq!(
            sink.applied,
            vec![
                Applied::CertificatePath("/etc/client/cert.pem".into()),
                Applied::KeyPassword("secret".into()),
            ]
        );
    }

    #[test]
    fn both_slots_fail_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(&dir.path().join("missing"));
        let mut sink = RecordingSink::rejecting_blobs();
        let err = resolver
            .configure(&mut sink, &full_blob_request())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Storage {
                slot: Slot::Certificate,
                ..
            }
        ));
        assert_eq!(
            sink.refused,
            vec![TlsOptionKind::CertificateBlob, TlsOptionKind::KeyBlob]
        );
        assert_eq!(sink.applied, vec![Applied::KeyPassword("secret".into())]);
    }

    #[test]
    fn transport_failure_stops_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink =
            RecordingSink::accepting_blobs().failing_on(TlsOptionKind::CertificateBlob);
        let err = resolver
            .configure(&mut sink, &full_blob_request())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Transport {
                option: TlsOptionKind::CertificateBlob,
                source: SetOptionError::Failed(_),
            }
        ));
        assert_eq!(err.to_string(), "cannot set client TLS certificate blob: certificate blob exploded");
        assert!(sink.applied.is_empty());
        assert!(resolver.store().is_empty());
    }

    #[test]
    fn fallback_path_failure_not_retried() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink =
            RecordingSink::rejecting_blobs().failing_on(TlsOptionKind::CertificatePath);
        let err = resolver
            .configure(&mut sink, &full_blob_request())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Transport {
                option: TlsOptionKind::CertificatePath,
                ..
            }
        ));
        assert_eq!(
            sink.refused,
            vec![
                TlsOptionKind::CertificateBlob,
                TlsOptionKind::CertificatePath
            ]
        );
        assert!(sink.applied.is_empty());
        assert_eq!(resolver.store().len(), 1);
    }

    #[test]
    fn unsupported_password_is_not_a_fallback() {
        struct NoPasswords(RecordingSink);

        impl TlsOptionSink for NoPasswords {
            fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
                if let TlsOption::KeyPassword(_) = option {
                    return Err(SetOptionError::Unsupported);
                }
                self.0.set_option(option)
            }
        }

        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = NoPasswords(RecordingSink::accepting_blobs());
        let err = resolver
            .configure(&mut sink, &full_blob_request())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Transport {
                option: TlsOptionKind::KeyPassword,
                source: SetOptionError::Unsupported,
            }
        ));
    }

    #[test]
    fn dyn_sink() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resolver = resolver_in(dir.path());
        let mut sink = RecordingSink::rejecting_blobs();
        let dyn_sink: &mut dyn TlsOptionSink = &mut sink;
        let options = CredentialOptions::default().with_key_password("secret");
        resolver.configure(dyn_sink, &options).expect("configure");
        assert_eq!(sink.applied, vec![Applied::KeyPassword("secret".into())]);
    }
}
