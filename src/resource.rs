//! A [`comprehensive`] [`Resource`] holding client TLS credential material.
//!
//! Resources which make outgoing TLS requests with client credentials can
//! depend on [`ClientTlsMaterial`] and call
//! [`ClientTlsMaterial::configure`] on each request's transport. Any
//! temporary files created along the way are removed when the
//! [`Assembly`] shuts down.
//!
//! # Command line flags
//!
//! | Flag                   | Default          | Meaning                 |
//! |------------------------|------------------|-------------------------|
//! | `--client-tls-tempdir` | System temp dir  | Directory for credential files written for transports that cannot take them in memory |
//!
//! [`Assembly`]: comprehensive::Assembly

use comprehensive::v1::{AssemblyRuntime, Resource, TaskWithCleanup, resource};
use std::path::PathBuf;
use std::sync::Arc;

use crate::options::CredentialOptions;
use crate::resolver::{OptionResolver, ResolveError, Resolution};
use crate::store::MaterialStore;
use crate::transport::TlsOptionSink;

/// Command line arguments for the [`ClientTlsMaterial`] [`Resource`].
#[derive(clap::Args, Debug, Default)]
#[group(id = "comprehensive_client_tls_args")]
pub struct Args {
    #[arg(
        long,
        help = "Directory in which to write client TLS credentials for transports that cannot take them in memory. Defaults to the system temporary directory."
    )]
    client_tls_tempdir: Option<PathBuf>,
}

struct RemoveOnShutdown(Arc<MaterialStore>);

impl TaskWithCleanup for RemoveOnShutdown {
    #[allow(refining_impl_trait)]
    async fn main_task(&mut self) -> Result<(), std::convert::Infallible> {
        std::future::pending::<Result<(), std::convert::Infallible>>().await
    }

    #[allow(refining_impl_trait)]
    async fn cleanup(self) -> Result<(), std::convert::Infallible> {
        self.0.cleanup();
        Ok(())
    }
}

/// Applies client TLS credentials to outgoing requests on behalf of the
/// rest of the assembly.
#[derive(Debug)]
pub struct ClientTlsMaterial {
    resolver: OptionResolver,
}

impl ClientTlsMaterial {
    /// Apply `options` to the transport of one outgoing request.
    pub fn configure<S>(
        &self,
        sink: &mut S,
        options: &CredentialOptions,
    ) -> Result<Resolution, ResolveError>
    where
        S: TlsOptionSink + ?Sized,
    {
        self.resolver.configure(sink, options)
    }

    /// The underlying resolver, for handing to a [`crate::LifecycleCoordinator`]
    /// or sharing with other components.
    pub fn resolver(&self) -> &OptionResolver {
        &self.resolver
    }

    /// The store holding any temporary files.
    pub fn store(&self) -> &Arc<MaterialStore> {
        self.resolver.store()
    }
}

#[resource]
impl Resource for ClientTlsMaterial {
    const NAME: &str = "client-tls-material";

    fn new(
        _: comprehensive::NoDependencies,
        args: Args,
        api: &mut AssemblyRuntime<'_>,
    ) -> Result<Arc<Self>, std::convert::Infallible> {
        let store = Arc::new(match args.client_tls_tempdir {
            Some(dir) => MaterialStore::in_dir(dir),
            None => MaterialStore::new(),
        });
        api.set_task_with_cleanup(RemoveOnShutdown(Arc::clone(&store)));
        Ok(Arc::new(Self {
            resolver: OptionResolver::new(store),
        }))
    }
}
