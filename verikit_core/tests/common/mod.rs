//! Common test utilities for VeriKit integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use verikit_core::compiler::Compiler;
use verikit_core::config::EngineConfig;
use verikit_core::engine::{EngineFactory, VerificationEngine};
use verikit_core::repository::MatchNotFound;
use verikit_core::types::{CheckedContract, InjectionInput, RecompilationResult};
use verikit_core::{
    CompilerInput, CompilerOutput, CoordinatorBuilder, CoordinatorConfig, Match, MatchStatus,
    RepositoryStore, VerificationCoordinator,
};

/// Creates a match record with standard test values.
pub fn test_match(address: &str, chain: &str, status: MatchStatus) -> Match {
    Match {
        address: address.to_string(),
        chain_id: chain.to_string(),
        status: Some(status),
        message: None,
        extra: Default::default(),
    }
}

/// Creates a checked contract with standard test values.
pub fn test_contract(name: &str) -> CheckedContract {
    CheckedContract {
        name: name.to_string(),
        compiler_version: "0.8.19+commit.7dd6d404".to_string(),
        metadata: serde_json::json!({"language": "Solidity"}),
        sources: [("contracts/A.sol".to_string(), "contract A {}".to_string())]
            .into_iter()
            .collect(),
    }
}

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes this thread's `tracing` events at `level` and above into a
    /// fresh buffer until the returned guard is dropped.
    pub fn install(level: tracing::Level) -> (Self, tracing::subscriber::DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(level)
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// How the scripted repository answers lookups.
#[derive(Clone, Debug)]
pub enum RepoBehavior {
    /// Return these matches
    Matches(Vec<Match>),
    /// Fail with `MatchNotFound`
    NotFound,
    /// Fail with an opaque error carrying this message
    Fail(String),
}

/// Repository store answering every lookup the same way.
pub struct ScriptedRepository {
    pub root: PathBuf,
    pub behavior: RepoBehavior,
    pub calls: AtomicUsize,
}

impl ScriptedRepository {
    pub fn new(behavior: RepoBehavior) -> Arc<Self> {
        Arc::new(Self {
            root: PathBuf::from("/srv/repository"),
            behavior,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            RepoBehavior::Matches(matches) => Ok(matches.clone()),
            RepoBehavior::NotFound => Err(MatchNotFound {
                address: address.to_string(),
                chain: chain.to_string(),
            }
            .into()),
            RepoBehavior::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[async_trait]
impl RepositoryStore for ScriptedRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn find_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>> {
        self.answer(address, chain)
    }

    async fn find_all_by_address(&self, address: &str, chain: &str) -> anyhow::Result<Vec<Match>> {
        self.answer(address, chain)
    }
}

/// Compiler returning a fixed output (or failing), recording each call.
pub struct MockCompiler {
    output: Option<CompilerOutput>,
    pub calls: Mutex<Vec<String>>,
}

impl MockCompiler {
    /// Compiler that returns `output` parsed from JSON.
    pub fn returning(output: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            output: Some(serde_json::from_value(output).unwrap()),
            calls: Mutex::new(vec![]),
        })
    }

    /// Compiler whose invocation always fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            output: None,
            calls: Mutex::new(vec![]),
        })
    }

    pub fn versions_seen(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Compiler for MockCompiler {
    async fn compile(&self, version: &str, _input: &CompilerInput) -> anyhow::Result<CompilerOutput> {
        self.calls.lock().unwrap().push(version.to_string());
        match &self.output {
            Some(output) => Ok(output.clone()),
            None => anyhow::bail!("Compiler version {} not found", version),
        }
    }
}

/// Engine that records every call and answers from fixed values.
pub struct RecordingEngine {
    pub calls: Mutex<Vec<String>>,
    pub fail_with: Option<String>,
}

impl RecordingEngine {
    fn record(&self, call: String) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationEngine for RecordingEngine {
    async fn inject(&self, input: InjectionInput) -> anyhow::Result<Match> {
        self.record(format!("inject:{}", input.addresses.join(",")))?;
        Ok(test_match(&input.addresses[0], &input.chain, MatchStatus::Perfect))
    }

    async fn verify_create2(
        &self,
        contract: CheckedContract,
        deployer_address: &str,
        salt: &str,
        constructor_args: serde_json::Value,
        create2_address: &str,
    ) -> anyhow::Result<Match> {
        self.record(format!(
            "verify_create2:{}:{}:{}:{}:{}",
            contract.name, deployer_address, salt, constructor_args, create2_address
        ))?;
        let mut m = test_match(create2_address, "0", MatchStatus::Perfect);
        m.extra.insert("create2Args".to_string(), serde_json::json!({"deployerAddress": deployer_address, "salt": salt}));
        Ok(m)
    }

    async fn recompile(&self, contract: &CheckedContract) -> anyhow::Result<RecompilationResult> {
        self.record(format!("recompile:{}", contract.name))?;
        Ok(RecompilationResult {
            creation_bytecode: "0x6080".to_string(),
            deployed_bytecode: "0x6080604052".to_string(),
            metadata: "{}".to_string(),
        })
    }

    async fn get_bytecode(&self, address: &str, chain_id: &str) -> anyhow::Result<String> {
        self.record(format!("get_bytecode:{}:{}", address, chain_id))?;
        Ok("0x6080604052".to_string())
    }
}

/// Factory counting builds; optionally slow and failing the first attempts.
pub struct CountingFactory {
    pub builds: AtomicUsize,
    pub fail_first: usize,
    pub delay: Duration,
    pub engine_fail_with: Option<String>,
    pub configs: Mutex<Vec<EngineConfig>>,
    pub engine: Mutex<Option<Arc<RecordingEngine>>>,
}

impl CountingFactory {
    pub fn new() -> Arc<Self> {
        Self::with(0, Duration::from_millis(20), None)
    }

    pub fn with(fail_first: usize, delay: Duration, engine_fail_with: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            builds: AtomicUsize::new(0),
            fail_first,
            delay,
            engine_fail_with: engine_fail_with.map(str::to_string),
            configs: Mutex::new(vec![]),
            engine: Mutex::new(None),
        })
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Calls recorded by the most recently built engine.
    pub fn engine_calls(&self) -> Vec<String> {
        self.engine
            .lock()
            .unwrap()
            .as_ref()
            .map(|e| e.calls.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EngineFactory for CountingFactory {
    async fn build(&self, config: EngineConfig) -> anyhow::Result<Arc<dyn VerificationEngine>> {
        let n = self.builds.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().unwrap().push(config);
        tokio::time::sleep(self.delay).await;
        if n < self.fail_first {
            anyhow::bail!("engine misconfigured (attempt {})", n + 1);
        }
        let engine = Arc::new(RecordingEngine {
            calls: Mutex::new(vec![]),
            fail_with: self.engine_fail_with.clone(),
        });
        *self.engine.lock().unwrap() = Some(engine.clone());
        Ok(engine)
    }
}

/// Builds a coordinator from the given collaborators with default config.
pub fn test_coordinator(
    repository: Arc<dyn RepositoryStore>,
    compiler: Arc<dyn Compiler>,
    factory: Arc<dyn EngineFactory>,
) -> VerificationCoordinator {
    CoordinatorBuilder::new()
        .repository(repository)
        .compiler(compiler)
        .engine_factory(factory)
        .config(CoordinatorConfig::default())
        .build()
        .unwrap()
}
