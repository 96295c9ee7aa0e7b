//! Wiring into a host HTTP client's request and shutdown hooks.
//!
//! Hosts that are not a [`comprehensive::Assembly`] expose their extension
//! points through [`ClientHooks`]. A [`LifecycleCoordinator`] installs an
//! [`OptionResolver`] as a per-request hook and the cleanup of its
//! [`MaterialStore`] as a shutdown hook, once only no matter how many
//! times [`LifecycleCoordinator::register`] is called.
//!
//! ```
//! use comprehensive_client_tls::lifecycle::{ClientHooks, LifecycleCoordinator, RequestHook};
//! use comprehensive_client_tls::{MaterialStore, OptionResolver};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Host {
//!     request_hooks: Vec<Arc<dyn RequestHook>>,
//!     shutdown_hooks: Vec<Box<dyn FnOnce() + Send>>,
//! }
//!
//! impl ClientHooks for Host {
//!     fn add_request_hook(&mut self, hook: Arc<dyn RequestHook>) {
//!         self.request_hooks.push(hook);
//!     }
//!
//!     fn add_shutdown_hook(&mut self, hook: Box<dyn FnOnce() + Send>) {
//!         self.shutdown_hooks.push(hook);
//!     }
//! }
//!
//! let mut host = Host::default();
//! let resolver = OptionResolver::new(Arc::new(MaterialStore::new()));
//! let coordinator = LifecycleCoordinator::new(resolver);
//! coordinator.register(&mut host);
//! coordinator.register(&mut host);
//! assert_eq!(host.request_hooks.len(), 1);
//! assert_eq!(host.shutdown_hooks.len(), 1);
//! ```
//!
//! [`comprehensive::Assembly`]: https://docs.rs/comprehensive/latest/comprehensive/struct.Assembly.html

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::options::CredentialOptions;
use crate::resolver::{OptionResolver, ResolveError, Resolution};
use crate::transport::TlsOptionSink;

/// Called by the host for every outgoing request, before the TLS handshake.
pub trait RequestHook: Send + Sync {
    /// Configure the request's transport. An error aborts the request.
    fn configure(
        &self,
        sink: &mut dyn TlsOptionSink,
        options: &CredentialOptions,
    ) -> Result<Resolution, ResolveError>;
}

impl RequestHook for OptionResolver {
    fn configure(
        &self,
        sink: &mut dyn TlsOptionSink,
        options: &CredentialOptions,
    ) -> Result<Resolution, ResolveError> {
        OptionResolver::configure(self, sink, options)
    }
}

/// The extension points of a host HTTP client.
pub trait ClientHooks {
    /// Install a hook to be called for every outgoing request.
    fn add_request_hook(&mut self, hook: Arc<dyn RequestHook>);

    /// Install a hook to be called once as the host shuts down.
    fn add_shutdown_hook(&mut self, hook: Box<dyn FnOnce() + Send>);
}

/// Installs a resolver and its store's cleanup into a host, at most once.
#[derive(Debug)]
pub struct LifecycleCoordinator {
    resolver: Arc<OptionResolver>,
    registered: AtomicBool,
}

impl LifecycleCoordinator {
    /// Coordinator for `resolver`.
    pub fn new(resolver: OptionResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            registered: AtomicBool::new(false),
        }
    }

    /// The resolver that is or will be installed.
    pub fn resolver(&self) -> &Arc<OptionResolver> {
        &self.resolver
    }

    /// True once [`LifecycleCoordinator::register`] has run.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Install the request hook, then the shutdown hook. Does nothing if
    /// already done.
    pub fn register(&self, hooks: &mut dyn ClientHooks) {
        if self.registered.swap(true, Ordering::AcqRel) {
            return;
        }
        hooks.add_request_hook(Arc::clone(&self.resolver) as Arc<dyn RequestHook>);
        let store = Arc::clone(self.resolver.store());
        hooks.add_shutdown_hook(Box::new(move || store.cleanup()));
    }
}
