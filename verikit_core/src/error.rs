//! Error types for VeriKit.

use std::sync::Arc;

/// Main error type for VeriKit.
///
/// All coordinator operations return `Result<T> = std::result::Result<T, VerifyError>`.
/// Collaborator failures (compiler, engine, repository) are carried as
/// `anyhow::Error` so their original cause is surfaced unchanged.
#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    /// Compiler output did not yield usable metadata for the target contract.
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    /// The compiler-invocation routine itself failed.
    #[error("Compiler invocation failed: {0}")]
    Invocation(#[source] anyhow::Error),

    /// The verification engine failed during a delegated operation.
    #[error("Verification engine error: {0}")]
    Engine(#[source] anyhow::Error),

    /// Building the shared verification engine failed.
    ///
    /// Every caller awaiting the same construction attempt receives a clone
    /// of the same underlying error.
    #[error(transparent)]
    Construction(ConstructionFailure),

    /// The repository store failed while looking up an address.
    #[error("Lookup failed for {address}: {source}")]
    Lookup {
        /// Address that was looked up
        address: String,
        /// Underlying store failure
        #[source]
        source: anyhow::Error,
    },

    /// Invalid coordinator configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Failure of one engine construction attempt, shared by all its waiters.
///
/// Displays as `Engine construction failed: <error>`;
/// [`source`](std::error::Error::source) continues with that error's own
/// cause chain.
#[derive(Debug, Clone)]
pub struct ConstructionFailure(Arc<anyhow::Error>);

impl ConstructionFailure {
    /// Wraps a shared construction error.
    pub fn new(error: Arc<anyhow::Error>) -> Self {
        Self(error)
    }

    /// Returns the underlying error.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl std::fmt::Display for ConstructionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Engine construction failed: {}", self.0)
    }
}

impl std::error::Error for ConstructionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

/// Why metadata resolution failed.
#[derive(thiserror::Error, Debug)]
pub enum CompilationErrorKind {
    /// No file in the output declares the contract.
    #[error("contract not found in compiler output")]
    ContractNotFound,

    /// The contract was found but carries no metadata string.
    #[error("contract has no metadata")]
    MissingMetadata,

    /// The metadata string is not valid JSON.
    #[error("malformed metadata: {0}")]
    MalformedMetadata(#[source] serde_json::Error),
}

/// Compilation did not produce usable metadata for a contract.
///
/// `to_string()` is a full sentence naming the contract, compiler and
/// failure kind, followed by the diagnostics on their own lines. Use
/// [`diagnostics`](Self::diagnostics) for the bare newline-joined compiler
/// messages (e.g. exactly `"syntax error"`).
///
/// The kind is part of the display text and is not repeated as a source.
#[derive(thiserror::Error, Debug)]
#[error("Compilation failed for {contract_name} (compiler {compiler_version}): {kind}{}", diagnostics_suffix(.diagnostics))]
pub struct CompilationError {
    /// Target contract name
    pub contract_name: String,
    /// Compiler version that was invoked
    pub compiler_version: String,
    /// File path the contract was resolved to, if any
    pub file_path: Option<String>,
    /// Newline-joined formatted messages of error-severity diagnostics
    pub diagnostics: String,
    /// Failure kind
    pub kind: CompilationErrorKind,
}

impl CompilationError {
    /// Returns the aggregated error-diagnostic text (empty if there were none).
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }
}

fn diagnostics_suffix(diagnostics: &str) -> String {
    if diagnostics.is_empty() {
        String::new()
    } else {
        format!("\n{}", diagnostics)
    }
}

/// Type alias for Result with VerifyError.
pub type Result<T> = std::result::Result<T, VerifyError>;
