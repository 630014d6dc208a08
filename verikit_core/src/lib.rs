//! VeriKit - Smart-contract source verification coordinator
//!
//! This crate is the coordination layer between callers asking "does this
//! source compile to the bytecode deployed at that address?" and the
//! components that actually answer it.
//!
//! # Overview
//!
//! - **Lookups**: address-based match retrieval from the repository store.
//!   Lookups never fail; a failed lookup reads as "no match".
//! - **Metadata resolution**: compile a standard-JSON input and extract the
//!   metadata of one contract, with aggregated compiler diagnostics on failure.
//! - **Engine operations**: `inject`, `verify_create2`, `recompile` and
//!   `get_bytecode`, forwarded to a single verification engine that is built
//!   lazily on first use and shared by every request.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use verikit_core::{CoordinatorBuilder, FsRepository};
//! # use verikit_core::{compiler::Compiler, engine::EngineFactory};
//!
//! # async fn demo(compiler: Arc<dyn Compiler>, factory: Arc<dyn EngineFactory>) -> verikit_core::Result<()> {
//! let repository = FsRepository::open("./repository").await?;
//! let coordinator = CoordinatorBuilder::new()
//!     .repository(Arc::new(repository))
//!     .compiler(compiler)
//!     .engine_factory(factory)
//!     .build()?;
//!
//! let matches = coordinator.find_by_address("0x5FbDB2315678afecb367f032d93F642f64180aa3", "1").await;
//! println!("Found: {:?}", matches);
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`types`]: Compiler documents and engine payloads
//! - [`error`]: Error types for all operations
//! - [`config`]: Coordinator and engine configuration
//! - [`compiler`]: Compiler-invocation seam
//! - [`repository`]: Repository store seam and filesystem store
//! - [`engine`]: Verification engine seam and the shared engine handle
//! - [`metadata`]: Metadata resolution
//! - [`coordinator`]: The public operation set

pub mod error;
pub mod types;
pub mod config;

// Collaborator seams
pub mod compiler;
pub mod repository;
pub mod engine;

pub mod metadata;
pub mod coordinator;

// Re-export commonly used types
pub use error::{CompilationError, CompilationErrorKind, ConstructionFailure, Result, VerifyError};
pub use types::{CompilerInput, CompilerOutput, Match, MatchStatus, Metadata};
pub use config::CoordinatorConfig;
pub use repository::{FsRepository, LookupOutcome, RepositoryStore};
pub use coordinator::VerificationCoordinator;

use std::sync::Arc;
use std::time::Duration;

use compiler::Compiler;
use engine::EngineFactory;

/// Builder for configuring and creating a [`VerificationCoordinator`].
///
/// Unless [`config`](Self::config) is given, the network timeout is read
/// from the environment (see [`config::NETWORK_TIMEOUT_ENV`]).
#[derive(Clone, Default)]
pub struct CoordinatorBuilder {
    repository: Option<Arc<dyn RepositoryStore>>,
    compiler: Option<Arc<dyn Compiler>>,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    network_timeout: Option<Duration>,
    config: Option<CoordinatorConfig>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the repository store.
    pub fn repository(mut self, repository: Arc<dyn RepositoryStore>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Sets the compiler-invocation routine.
    pub fn compiler(mut self, compiler: Arc<dyn Compiler>) -> Self {
        self.compiler = Some(compiler);
        self
    }

    /// Sets the factory the verification engine is built with.
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Overrides the network timeout.
    pub fn network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = Some(timeout);
        self
    }

    /// Uses an explicit configuration instead of reading the environment.
    ///
    /// The repository path is still taken from the repository store.
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the coordinator with the configured options.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Config` if a collaborator is missing or the
    /// configuration is invalid.
    pub fn build(self) -> Result<VerificationCoordinator> {
        let repository = self
            .repository
            .ok_or_else(|| VerifyError::Config("repository is required".to_string()))?;
        let compiler = self
            .compiler
            .ok_or_else(|| VerifyError::Config("compiler is required".to_string()))?;
        let engine_factory = self
            .engine_factory
            .ok_or_else(|| VerifyError::Config("engine factory is required".to_string()))?;

        let root = repository.root().to_path_buf();
        let mut config = match self.config {
            Some(config) => CoordinatorConfig {
                repository_path: root,
                ..config
            },
            None => CoordinatorConfig::from_env(root),
        };
        if let Some(timeout) = self.network_timeout {
            config.network_timeout = Some(timeout);
        }

        VerificationCoordinator::new(config, repository, compiler, engine_factory)
    }
}
