//! Core types for VeriKit.
//!
//! Compiler documents follow the solc standard-JSON shape. Engine payloads
//! (`Match`, `CheckedContract`, ...) are owned by the verification engine and
//! are passed through the coordinator unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parsed metadata document of a single contract.
pub type Metadata = serde_json::Value;

/// Compiler input document (standard JSON input).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerInput {
    /// Source language, e.g. `Solidity`
    pub language: String,
    /// Sources keyed by file path
    pub sources: BTreeMap<String, SourceFile>,
    /// Compiler settings, passed through as-is
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// A single source file of a compiler input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File contents
    pub content: String,
}

/// Compiler output document (standard JSON output).
///
/// `contracts` is a `BTreeMap` so iteration is ordered by file path, then by
/// contract name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerOutput {
    /// File path -> contract name -> artifact
    #[serde(default)]
    pub contracts: BTreeMap<String, BTreeMap<String, CompiledContract>>,
    /// Diagnostics in the order the compiler emitted them
    #[serde(default)]
    pub errors: Vec<CompilerDiagnostic>,
}

impl CompilerOutput {
    /// Returns diagnostics with `Error` severity.
    pub fn error_diagnostics(&self) -> impl Iterator<Item = &CompilerDiagnostic> {
        self.errors.iter().filter(|d| d.severity == Severity::Error)
    }
}

/// Compilation artifact for one contract.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledContract {
    /// Metadata JSON, embedded as a string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Remaining artifact fields (abi, evm, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CompiledContract {
    /// Returns the metadata string if present and not blank.
    pub fn metadata_str(&self) -> Option<&str> {
        self.metadata
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

/// Diagnostic severity reported by the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Compilation error
    Error,
    /// Warning
    Warning,
    /// Informational message
    Info,
    /// Any severity this crate does not know about
    #[serde(other)]
    Unknown,
}

/// A compiler diagnostic entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerDiagnostic {
    /// Severity tag
    pub severity: Severity,
    /// Human-readable message including source location
    #[serde(default)]
    pub formatted_message: String,
    /// Short message
    #[serde(default)]
    pub message: String,
    /// Diagnostic type, e.g. `ParserError`
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Whether a match is exact or only partial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Bytecode and metadata hash match
    Perfect,
    /// Bytecode matches, metadata hash differs
    Partial,
}

impl MatchStatus {
    /// Directory name used by the filesystem repository.
    pub fn dir_name(self) -> &'static str {
        match self {
            MatchStatus::Perfect => "full_match",
            MatchStatus::Partial => "partial_match",
        }
    }
}

/// Result of a lookup or verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    /// Contract address
    pub address: String,
    /// Chain identifier
    pub chain_id: String,
    /// Match status, `None` when verification did not match
    pub status: Option<MatchStatus>,
    /// Optional engine message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Engine-specific fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A contract whose sources and metadata have been checked for completeness.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckedContract {
    /// Contract name
    pub name: String,
    /// Compiler version from metadata
    pub compiler_version: String,
    /// Parsed metadata
    pub metadata: Metadata,
    /// Sources keyed by file path
    pub sources: BTreeMap<String, String>,
}

/// Input for `inject`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionInput {
    /// Target chain
    pub chain: String,
    /// Addresses to verify against
    pub addresses: Vec<String>,
    /// Uploaded files keyed by path
    pub files: BTreeMap<String, String>,
    /// Restrict to one contract when the upload holds several
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<CheckedContract>,
}

/// Bytecode produced by recompiling a checked contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecompilationResult {
    /// Creation bytecode, hex
    pub creation_bytecode: String,
    /// Deployed bytecode, hex
    pub deployed_bytecode: String,
    /// Metadata string emitted by the compiler
    pub metadata: String,
}
