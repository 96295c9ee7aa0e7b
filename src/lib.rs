//! Client TLS credentials for HTTP transports, in memory or on disk
//!
//! Callers often hold client certificates and keys in memory, for example
//! after fetching them from a secret store, while the transport that makes
//! the request may only be able to read them from files. Whether a
//! transport can take credentials in memory often depends on the version
//! of the library or the TLS backend it was built with, which is not known
//! until the option is tried.
//!
//! This crate applies [`CredentialOptions`] to a transport (anything
//! implementing [`TlsOptionSink`]) on each request. Credentials given in
//! memory are offered to the transport in memory first. If it refuses
//! them as unsupported, they are written to a temporary file and the
//! transport is given the file name instead. Temporary files are shared
//! between all requests presenting the same material and are deleted at
//! shutdown.
//!
//! The pieces are:
//!
//! * [`MaterialStore`]: the temporary files, deduplicated by content.
//! * [`OptionResolver`]: applies one request's options to its transport.
//! * [`lifecycle::LifecycleCoordinator`]: installs the above into a host
//!   HTTP client's request and shutdown hooks.
//! * [`ClientTlsMaterial`]: a [`comprehensive`] [`Resource`] bundling all
//!   of it into an [`Assembly`].
//!
//! ```
//! use comprehensive_client_tls::{
//!     CredentialOptions, MaterialStore, OptionResolver, SetOptionError, TlsOption,
//!     TlsOptionSink,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! // A transport that only understands files.
//! #[derive(Default)]
//! struct FilesOnly {
//!     cert: Option<PathBuf>,
//! }
//!
//! impl TlsOptionSink for FilesOnly {
//!     fn set_option(&mut self, option: TlsOption<'_>) -> Result<(), SetOptionError> {
//!         match option {
//!             TlsOption::CertificatePath(p) => {
//!                 self.cert = Some(p.to_path_buf());
//!                 Ok(())
//!             }
//!             _ => Err(SetOptionError::Unsupported),
//!         }
//!     }
//! }
//!
//! let store = Arc::new(MaterialStore::new());
//! let resolver = OptionResolver::new(Arc::clone(&store));
//! let options = CredentialOptions::default().with_certificate_blob(b"CERTDATA".to_vec());
//! let mut transport = FilesOnly::default();
//! resolver.configure(&mut transport, &options).unwrap();
//! let cert = transport.cert.unwrap();
//! assert_eq!(std::fs::read(&cert).unwrap(), b"CERTDATA");
//!
//! store.cleanup();
//! assert!(!cert.exists());
//! ```
//!
//! # Features
//!
//! * `metrics` (default): export Prometheus metrics counting fallbacks to
//!   files and the number of files held.
//! * `curl`: implement [`TlsOptionSink`] for [`curl`] easy handles.
//!
//! [`Resource`]: comprehensive::v1::Resource
//! [`Assembly`]: comprehensive::Assembly
//! [`curl`]: https://docs.rs/curl/latest/curl/

#![warn(missing_docs)]

#[cfg(feature = "curl")]
pub mod curl_easy;
pub mod lifecycle;
#[cfg(feature = "metrics")]
mod metrics;
pub mod options;
pub mod resolver;
pub mod resource;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use lifecycle::LifecycleCoordinator;
pub use options::{CredentialOptions, RequestOptionValue, RequestOptionsError, Slot};
pub use resolver::{OptionResolver, ResolveError, Resolution, SlotOutcome};
pub use resource::ClientTlsMaterial;
pub use store::{MaterialStore, StorageError};
pub use transport::{SetOptionError, TlsOption, TlsOptionKind, TlsOptionSink};
