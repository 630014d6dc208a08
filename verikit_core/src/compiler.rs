//! Compiler-invocation seam.

use async_trait::async_trait;

use crate::types::{CompilerInput, CompilerOutput};

/// Invokes a compiler by version.
///
/// Implementations may download the requested compiler, spawn it, or call a
/// remote service. Any failure (unknown version, malformed input, transport)
/// is returned as-is and surfaced by the coordinator as
/// `VerifyError::Invocation`.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compiles `input` with the compiler identified by `version`.
    async fn compile(&self, version: &str, input: &CompilerInput) -> anyhow::Result<CompilerOutput>;
}
