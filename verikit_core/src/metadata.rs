//! Metadata resolution from compiler output.
//!
//! Given a contract name, find the one compilation unit that produced it and
//! parse the metadata the compiler embedded for it.

use crate::compiler::Compiler;
use crate::error::{CompilationError, CompilationErrorKind, Result, VerifyError};
use crate::types::{CompilerInput, CompilerOutput, Metadata};

/// Returns the file path whose contracts include `contract_name`.
///
/// When several files declare a contract with that name, the
/// lexicographically smallest path wins.
pub fn find_contract_file<'a>(output: &'a CompilerOutput, contract_name: &str) -> Option<&'a str> {
    output
        .contracts
        .iter()
        .find(|(_, contracts)| contracts.contains_key(contract_name))
        .map(|(path, _)| path.as_str())
}

/// Joins the formatted messages of error-severity diagnostics with newlines.
///
/// Returns an empty string when the compiler reported no errors.
pub fn collect_error_diagnostics(output: &CompilerOutput) -> String {
    output
        .error_diagnostics()
        .map(|d| d.formatted_message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts and parses the metadata of `contract_name` from `output`.
///
/// # Errors
///
/// Returns `VerifyError::Compilation` if no file declares the contract, the
/// contract has no metadata, or the metadata is not valid JSON.
pub fn extract_metadata(
    output: &CompilerOutput,
    compiler_version: &str,
    contract_name: &str,
) -> Result<Metadata> {
    let file_path = find_contract_file(output, contract_name);
    let metadata = file_path
        .and_then(|path| output.contracts[path].get(contract_name))
        .and_then(|contract| contract.metadata_str());

    let failure = |kind: CompilationErrorKind| {
        let diagnostics = collect_error_diagnostics(output);
        tracing::error!(
            contract_name,
            compiler_version,
            file_path = ?file_path,
            diagnostics = %diagnostics,
            "Compiler output has no usable metadata for contract"
        );
        VerifyError::from(CompilationError {
            contract_name: contract_name.to_string(),
            compiler_version: compiler_version.to_string(),
            file_path: file_path.map(str::to_string),
            diagnostics,
            kind,
        })
    };

    let raw = match (file_path, metadata) {
        (None, _) => return Err(failure(CompilationErrorKind::ContractNotFound)),
        (Some(_), None) => return Err(failure(CompilationErrorKind::MissingMetadata)),
        (Some(_), Some(raw)) => raw,
    };

    serde_json::from_str(raw).map_err(|e| failure(CompilationErrorKind::MalformedMetadata(e)))
}

/// Compiles `input` and returns the metadata of `contract_name`.
///
/// Invocation failures are returned as `VerifyError::Invocation` without
/// inspecting them.
pub async fn resolve_metadata(
    compiler: &dyn Compiler,
    compiler_version: &str,
    contract_name: &str,
    input: &CompilerInput,
) -> Result<Metadata> {
    let output = compiler
        .compile(compiler_version, input)
        .await
        .map_err(VerifyError::Invocation)?;
    extract_metadata(&output, compiler_version, contract_name)
}
