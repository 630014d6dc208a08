//! Verification engine seam and its shared, lazily built handle.
//!
//! The engine is heavyweight (it may open the repository, warm compiler
//! caches, connect to RPC endpoints), so it is built on first use and shared
//! by every request for the lifetime of the coordinator.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::error::{ConstructionFailure, Result, VerifyError};
use crate::types::{CheckedContract, InjectionInput, Match, RecompilationResult};

/// The external verification engine.
///
/// Bytecode matching, CREATE2 derivation and persistence of new matches all
/// happen behind this trait. Implementations must tolerate concurrent calls.
#[async_trait]
pub trait VerificationEngine: Send + Sync {
    /// Verifies uploaded files against deployed addresses.
    async fn inject(&self, input: InjectionInput) -> anyhow::Result<Match>;

    /// Verifies a contract deployed through CREATE2.
    async fn verify_create2(
        &self,
        contract: CheckedContract,
        deployer_address: &str,
        salt: &str,
        constructor_args: serde_json::Value,
        create2_address: &str,
    ) -> anyhow::Result<Match>;

    /// Recompiles a checked contract.
    async fn recompile(&self, contract: &CheckedContract) -> anyhow::Result<RecompilationResult>;

    /// Fetches the deployed bytecode at `address`.
    async fn get_bytecode(&self, address: &str, chain_id: &str) -> anyhow::Result<String>;
}

/// Builds a verification engine from a configuration snapshot.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    /// Constructs an engine. May perform I/O.
    async fn build(&self, config: EngineConfig) -> anyhow::Result<Arc<dyn VerificationEngine>>;
}

type EngineRef = Arc<dyn VerificationEngine>;
type Construction = Shared<BoxFuture<'static, std::result::Result<EngineRef, Arc<anyhow::Error>>>>;

enum HandleState {
    Uninitialized,
    Constructing { attempt: u64, future: Construction },
    Ready(EngineRef),
}

/// Lazily built, single shared engine instance.
///
/// The first call to [`ensure`](Self::ensure) starts construction; every
/// call that arrives while construction is in flight awaits that same
/// attempt. A failed attempt is reported to all of its waiters and the
/// handle goes back to uninitialized, so the next call retries.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use verikit_core::config::EngineConfig;
/// # use verikit_core::engine::{EngineFactory, EngineHandle};
/// # async fn demo(factory: Arc<dyn EngineFactory>, config: EngineConfig) -> verikit_core::Result<()> {
/// let handle = EngineHandle::new(factory, config);
/// let engine = handle.ensure().await?;
/// let again = handle.ensure().await?;
/// assert!(Arc::ptr_eq(&engine, &again));
/// # Ok(())
/// # }
/// ```
pub struct EngineHandle {
    factory: Arc<dyn EngineFactory>,
    config: EngineConfig,
    state: Mutex<HandleState>,
    attempts: AtomicU64,
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("repository_path", &self.config.repository_path)
            .field("network_timeout", &self.config.network_timeout)
            .field("initialized", &self.is_initialized())
            .field("attempts", &self.construction_attempts())
            .finish()
    }
}

impl EngineHandle {
    /// Creates an uninitialized handle. Nothing is built until first use.
    pub fn new(factory: Arc<dyn EngineFactory>, config: EngineConfig) -> Self {
        Self {
            factory,
            config,
            state: Mutex::new(HandleState::Uninitialized),
            attempts: AtomicU64::new(0),
        }
    }

    /// Returns the shared engine, building it if this is the first use.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Construction` if the attempt this call joined
    /// (or started) failed.
    pub async fn ensure(&self) -> Result<EngineRef> {
        let (attempt, future) = {
            let mut state = self.lock_state();
            let in_flight = match &*state {
                HandleState::Ready(engine) => return Ok(Arc::clone(engine)),
                HandleState::Constructing { attempt, future } => Some((*attempt, future.clone())),
                HandleState::Uninitialized => None,
            };
            match in_flight {
                Some(joined) => joined,
                None => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    let future = self.construct(attempt);
                    *state = HandleState::Constructing {
                        attempt,
                        future: future.clone(),
                    };
                    (attempt, future)
                }
            }
        };

        let result = future.await;
        self.settle(attempt, &result);
        result.map_err(|e| VerifyError::Construction(ConstructionFailure::new(e)))
    }

    /// Returns true once an engine has been built.
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.lock_state(), HandleState::Ready(_))
    }

    /// Number of construction attempts started so far.
    pub fn construction_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Configuration the engine is (or will be) built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn construct(&self, attempt: u64) -> Construction {
        let factory = Arc::clone(&self.factory);
        let config = self.config.clone();
        let span = config.logger.clone();

        async move {
            let repository_path = config.repository_path.clone();
            tracing::info!(
                attempt,
                repository_path = %repository_path.display(),
                "Constructing verification engine"
            );
            match factory.build(config).await {
                Ok(engine) => {
                    tracing::info!(attempt, "Verification engine ready");
                    Ok(engine)
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Verification engine construction failed");
                    Err(Arc::new(e))
                }
            }
        }
        .instrument(span)
        .boxed()
        .shared()
    }

    /// Moves the state out of `Constructing` once `attempt` has resolved.
    ///
    /// Every waiter calls this; only the first one for the current attempt
    /// changes anything.
    fn settle(&self, attempt: u64, result: &std::result::Result<EngineRef, Arc<anyhow::Error>>) {
        let mut state = self.lock_state();
        let current = match &*state {
            HandleState::Constructing { attempt: current, .. } => *current,
            _ => return,
        };
        if current != attempt {
            return;
        }
        *state = match result {
            Ok(engine) => HandleState::Ready(Arc::clone(engine)),
            Err(_) => HandleState::Uninitialized,
        };
    }

    fn lock_state(&self) -> MutexGuard<'_, HandleState> {
        // State transitions never panic midway, so a poisoned lock is still consistent
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
