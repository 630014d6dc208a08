//! Verification coordinator - the public operation set.
//!
//! Lookups go straight to the repository store and never fail; engine
//! operations go through the shared [`EngineHandle`] and surface every
//! failure unchanged.

use std::sync::Arc;

use tracing::Instrument;

use crate::compiler::Compiler;
use crate::config::{CoordinatorConfig, EngineConfig};
use crate::engine::{EngineFactory, EngineHandle};
use crate::error::{Result, VerifyError};
use crate::metadata;
use crate::repository::{LookupOutcome, MatchNotFound, RepositoryStore};
use crate::types::{
    CheckedContract, CompilerInput, InjectionInput, Match, Metadata, RecompilationResult,
};

/// Coordinates lookups, metadata resolution and engine operations.
///
/// Cheap to share behind an `Arc`; the only state mutated after construction
/// is the engine handle, which is written at most once per successful build.
pub struct VerificationCoordinator {
    repository: Arc<dyn RepositoryStore>,
    compiler: Arc<dyn Compiler>,
    engine: EngineHandle,
    span: tracing::Span,
}

impl std::fmt::Debug for VerificationCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationCoordinator")
            .field("repository_root", &self.repository.root())
            .field("engine", &self.engine)
            .finish()
    }
}

impl VerificationCoordinator {
    /// Creates a coordinator. The engine is not built until first needed.
    ///
    /// The engine's repository path is taken from `repository.root()`; the
    /// network timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Config` if the configuration is invalid.
    pub fn new(
        config: CoordinatorConfig,
        repository: Arc<dyn RepositoryStore>,
        compiler: Arc<dyn Compiler>,
        engine_factory: Arc<dyn EngineFactory>,
    ) -> Result<Self> {
        config.validate()?;

        let span = tracing::info_span!("verification_coordinator");
        let engine_config = EngineConfig {
            repository_path: repository.root().to_path_buf(),
            network_timeout: config.network_timeout,
            logger: span.clone(),
        };

        Ok(Self {
            repository,
            compiler,
            engine: EngineHandle::new(engine_factory, engine_config),
            span,
        })
    }

    /// Returns the best match for `address`, or an empty list.
    ///
    /// Store failures of any kind are logged and reported as "no match".
    /// Use [`try_find_by_address`](Self::try_find_by_address) to tell them apart.
    pub async fn find_by_address(&self, address: &str, chain: &str) -> Vec<Match> {
        swallow(address, chain, self.try_find_by_address(address, chain).await)
    }

    /// Returns every match for `address`, or an empty list.
    ///
    /// Same failure policy as [`find_by_address`](Self::find_by_address).
    pub async fn find_all_by_address(&self, address: &str, chain: &str) -> Vec<Match> {
        swallow(address, chain, self.try_find_all_by_address(address, chain).await)
    }

    /// Looks up the best match, keeping "not found" apart from store failures.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Lookup` for any store failure other than a
    /// missing record.
    pub async fn try_find_by_address(&self, address: &str, chain: &str) -> Result<LookupOutcome> {
        classify(address, self.repository.find_by_address(address, chain).await)
    }

    /// Looks up every match, keeping "not found" apart from store failures.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Lookup` for any store failure other than a
    /// missing record.
    pub async fn try_find_all_by_address(&self, address: &str, chain: &str) -> Result<LookupOutcome> {
        classify(address, self.repository.find_all_by_address(address, chain).await)
    }

    /// Compiles `input` and returns the metadata of `contract_name`.
    ///
    /// # Errors
    ///
    /// - `VerifyError::Invocation` if the compiler could not be run
    /// - `VerifyError::Compilation` if the output holds no usable metadata
    pub async fn resolve_metadata(
        &self,
        compiler_version: &str,
        contract_name: &str,
        input: &CompilerInput,
    ) -> Result<Metadata> {
        metadata::resolve_metadata(self.compiler.as_ref(), compiler_version, contract_name, input)
            .instrument(self.span.clone())
            .await
    }

    /// Verifies uploaded files against deployed addresses.
    pub async fn inject(&self, input: InjectionInput) -> Result<Match> {
        let engine = self.engine.ensure().await?;
        engine
            .inject(input)
            .instrument(self.span.clone())
            .await
            .map_err(VerifyError::Engine)
    }

    /// Verifies a contract deployed through CREATE2.
    pub async fn verify_create2(
        &self,
        contract: CheckedContract,
        deployer_address: &str,
        salt: &str,
        constructor_args: serde_json::Value,
        create2_address: &str,
    ) -> Result<Match> {
        let engine = self.engine.ensure().await?;
        engine
            .verify_create2(contract, deployer_address, salt, constructor_args, create2_address)
            .instrument(self.span.clone())
            .await
            .map_err(VerifyError::Engine)
    }

    /// Recompiles a checked contract.
    pub async fn recompile(&self, contract: &CheckedContract) -> Result<RecompilationResult> {
        let engine = self.engine.ensure().await?;
        engine
            .recompile(contract)
            .instrument(self.span.clone())
            .await
            .map_err(VerifyError::Engine)
    }

    /// Fetches the deployed bytecode at `address` on `chain_id`.
    pub async fn get_bytecode(&self, address: &str, chain_id: &str) -> Result<String> {
        let engine = self.engine.ensure().await?;
        engine
            .get_bytecode(address, chain_id)
            .instrument(self.span.clone())
            .await
            .map_err(VerifyError::Engine)
    }

    /// Returns true once the verification engine has been built.
    pub fn engine_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    /// Returns the shared engine handle.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Returns the repository store.
    pub fn repository(&self) -> &Arc<dyn RepositoryStore> {
        &self.repository
    }
}

fn classify(address: &str, result: anyhow::Result<Vec<Match>>) -> Result<LookupOutcome> {
    match result {
        Ok(matches) if matches.is_empty() => Ok(LookupOutcome::NotFound),
        Ok(matches) => Ok(LookupOutcome::Found(matches)),
        Err(e) if e.downcast_ref::<MatchNotFound>().is_some() => Ok(LookupOutcome::NotFound),
        Err(source) => Err(VerifyError::Lookup {
            address: address.to_string(),
            source,
        }),
    }
}

fn swallow(address: &str, chain: &str, outcome: Result<LookupOutcome>) -> Vec<Match> {
    match outcome {
        Ok(LookupOutcome::Found(matches)) => matches,
        Ok(LookupOutcome::NotFound) => {
            tracing::info!(address, chain, "No match found");
            Vec::new()
        }
        Err(e) => {
            tracing::info!(address, chain, error = %e, "Lookup failed, returning no match");
            Vec::new()
        }
    }
}
