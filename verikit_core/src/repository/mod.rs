//! Repository store for previously verified matches.
//!
//! This module defines the store seam the coordinator looks addresses up
//! through, plus a filesystem-backed default implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{Result, VerifyError};
use crate::types::{Match, MatchStatus, Metadata};

/// Store of verified contract matches.
///
/// Both lookups may fail for any reason (missing record, I/O, malformed
/// record). A missing record should be reported as [`MatchNotFound`] so
/// callers that care can tell it apart from other failures.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Root location of the repository, handed to the verification engine.
    fn root(&self) -> &Path;

    /// Returns the best match for `address` on `chain`.
    async fn find_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>>;

    /// Returns every match for `address` on `chain`.
    async fn find_all_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>>;
}

/// No match is stored for an address.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("No match found for {address} on chain {chain}")]
pub struct MatchNotFound {
    /// Address that was looked up
    pub address: String,
    /// Chain that was looked up
    pub chain: String,
}

/// Outcome of a lookup that keeps "not found" apart from "failed".
#[derive(Clone, Debug, PartialEq)]
pub enum LookupOutcome {
    /// At least one match was found
    Found(Vec<Match>),
    /// The store holds no match for the address
    NotFound,
}

impl LookupOutcome {
    /// Converts into the plain sequence form, empty when nothing was found.
    pub fn into_matches(self) -> Vec<Match> {
        match self {
            LookupOutcome::Found(matches) => matches,
            LookupOutcome::NotFound => Vec::new(),
        }
    }

    /// Returns true if at least one match was found.
    pub fn is_found(&self) -> bool {
        matches!(self, LookupOutcome::Found(_))
    }
}

/// Filesystem repository.
///
/// Layout under the root:
///
/// ```text
/// contracts/
///   full_match/{chain}/{address}/metadata.json
///   partial_match/{chain}/{address}/metadata.json
/// ```
#[derive(Clone, Debug)]
pub struct FsRepository {
    root: PathBuf,
}

impl FsRepository {
    /// Opens a repository rooted at `root`, creating the layout if needed.
    ///
    /// # Errors
    ///
    /// Returns `VerifyError::Config` if the directories cannot be created.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        for status in [MatchStatus::Perfect, MatchStatus::Partial] {
            let dir = root.join("contracts").join(status.dir_name());
            tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                VerifyError::Config(format!(
                    "Failed to create repository directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(Self { root })
    }

    /// Returns the directory holding one match.
    ///
    /// `None` if `chain` or `address` is not a single plain path segment, so
    /// the result always stays under the repository root.
    pub fn match_dir(&self, status: MatchStatus, chain: &str, address: &str) -> Option<PathBuf> {
        if !is_plain_segment(chain) || !is_plain_segment(address) {
            return None;
        }
        Some(
            self.root
                .join("contracts")
                .join(status.dir_name())
                .join(chain)
                .join(address),
        )
    }

    /// Stores the metadata of a verified contract.
    pub async fn store_match(
        &self,
        status: MatchStatus,
        chain: &str,
        address: &str,
        metadata: &Metadata,
    ) -> anyhow::Result<()> {
        let dir = self.match_dir(status, chain, address).ok_or_else(|| {
            anyhow::anyhow!("Invalid match location: chain {:?}, address {:?}", chain, address)
        })?;
        tokio::fs::create_dir_all(&dir).await?;
        let bytes = serde_json::to_vec_pretty(metadata)?;
        tokio::fs::write(dir.join("metadata.json"), bytes).await?;
        tracing::debug!(address, chain, status = status.dir_name(), "Stored match");
        Ok(())
    }

    async fn read_match(
        &self,
        status: MatchStatus,
        chain: &str,
        address: &str,
    ) -> anyhow::Result<Option<Match>> {
        for candidate in address_candidates(address) {
            let Some(dir) = self.match_dir(status, chain, &candidate) else {
                continue;
            };
            let path = dir.join("metadata.json");
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            // Reject unreadable records instead of reporting a bogus match
            let _: Metadata = serde_json::from_slice(&bytes).map_err(|e| {
                anyhow::anyhow!("Malformed metadata at {}: {}", path.display(), e)
            })?;
            return Ok(Some(Match {
                address: candidate,
                chain_id: chain.to_string(),
                status: Some(status),
                message: None,
                extra: Default::default(),
            }));
        }
        Ok(None)
    }
}

/// A single normal path component: not empty, not `.`/`..`, no separators.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && !segment.contains("..")
        && !segment.contains(['/', '\\'])
        && !Path::new(segment).is_absolute()
}

/// Addresses are tried as given, then lowercased.
fn address_candidates(address: &str) -> Vec<String> {
    let mut candidates = vec![address.to_string()];
    let lower = address.to_lowercase();
    if lower != address {
        candidates.push(lower);
    }
    candidates
}

#[async_trait]
impl RepositoryStore for FsRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn find_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>> {
        for status in [MatchStatus::Perfect, MatchStatus::Partial] {
            if let Some(found) = self.read_match(status, chain, address).await? {
                return Ok(vec![found]);
            }
        }
        Err(MatchNotFound {
            address: address.to_string(),
            chain: chain.to_string(),
        }
        .into())
    }

    async fn find_all_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>> {
        let mut matches = Vec::new();
        for status in [MatchStatus::Perfect, MatchStatus::Partial] {
            if let Some(found) = self.read_match(status, chain, address).await? {
                matches.push(found);
            }
        }
        if matches.is_empty() {
            return Err(MatchNotFound {
                address: address.to_string(),
                chain: chain.to_string(),
            }
            .into());
        }
        Ok(matches)
    }
}
