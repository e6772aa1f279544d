// SPDX-License-Identifier: GPL-3.0-only
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::addon::{AddonId, AddonPathResolver};
use crate::config::Config;
use crate::downloader::{
    CompletionSender, ContentService, DownloadCompletion, DownloadCoordinator, DownloadProgress,
    completion_channel,
};
use crate::manager::{AddonLifecycleManager, Engine, ManagerSettings, ReloadCommand};
use crate::mount::{MountSet, SearchPath};

pub fn addon(raw: u64) -> AddonId {
    AddonId::new(raw).expect("test addon ids are non-zero")
}

pub fn addons(raw: &[u64]) -> Vec<AddonId> {
    raw.iter().copied().map(addon).collect()
}

#[derive(Default)]
struct ContentState {
    local: BTreeSet<AddonId>,
    fetched: Vec<AddonId>,
    refused: BTreeSet<AddonId>,
    progress: HashMap<AddonId, DownloadProgress>,
}

/// Content service that records fetches and never completes on its own
#[derive(Clone, Default)]
pub struct FakeContentService {
    state: Rc<RefCell<ContentState>>,
}

impl FakeContentService {
    pub fn with_local(local: &[u64]) -> Self {
        let service = Self::default();
        for &raw in local {
            service.install(addon(raw));
        }
        service
    }

    pub fn install(&self, id: AddonId) {
        self.state.borrow_mut().local.insert(id);
    }

    pub fn refuse_fetch(&self, id: AddonId) {
        self.state.borrow_mut().refused.insert(id);
    }

    pub fn set_progress(&self, id: AddonId, progress: DownloadProgress) {
        self.state.borrow_mut().progress.insert(id, progress);
    }

    pub fn fetched(&self) -> Vec<AddonId> {
        self.state.borrow().fetched.clone()
    }
}

impl ContentService for FakeContentService {
    fn fetch(&mut self, id: AddonId) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refused.contains(&id) {
            anyhow::bail!("server is not logged on to Steam");
        }
        state.fetched.push(id);
        Ok(())
    }

    fn is_locally_present(&self, id: AddonId) -> bool {
        self.state.borrow().local.contains(&id)
    }

    fn download_progress(&self, id: AddonId) -> Option<DownloadProgress> {
        self.state.borrow().progress.get(&id).copied()
    }
}

#[derive(Default)]
struct SearchPathState {
    paths: Vec<PathBuf>,
    added: Vec<PathBuf>,
    removed: Vec<PathBuf>,
    rejected: HashSet<PathBuf>,
}

/// In-memory search path that can be told to reject specific VPKs
#[derive(Clone, Default)]
pub struct FakeSearchPath {
    state: Rc<RefCell<SearchPathState>>,
}

impl FakeSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, path: PathBuf) {
        self.state.borrow_mut().rejected.insert(path);
    }

    /// Highest precedence first
    pub fn paths(&self) -> Vec<PathBuf> {
        self.state.borrow().paths.clone()
    }

    pub fn added(&self) -> Vec<PathBuf> {
        self.state.borrow().added.clone()
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.state.borrow().removed.clone()
    }

    pub fn take_log(&self) {
        let mut state = self.state.borrow_mut();
        state.added.clear();
        state.removed.clear();
    }

    /// Mounted addon ids, lowest precedence first
    pub fn mount_order(&self) -> Vec<AddonId> {
        self.state
            .borrow()
            .paths
            .iter()
            .rev()
            .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
            .collect()
    }
}

impl SearchPath for FakeSearchPath {
    fn add_search_path(&mut self, path: &Path, at_tail: bool) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        if state.rejected.contains(path) {
            anyhow::bail!("corrupt VPK");
        }
        if at_tail {
            state.paths.push(path.to_path_buf());
        } else {
            state.paths.insert(0, path.to_path_buf());
        }
        state.added.push(path.to_path_buf());
        Ok(())
    }

    fn remove_search_path(&mut self, path: &Path) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(index) = state.paths.iter().position(|p| p == path) else {
            return false;
        };
        state.paths.remove(index);
        state.removed.push(path.to_path_buf());
        true
    }

    fn search_paths(&self) -> Vec<PathBuf> {
        self.paths()
    }
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    commands: Rc<RefCell<Vec<ReloadCommand>>>,
}

impl FakeEngine {
    pub fn commands(&self) -> Vec<ReloadCommand> {
        self.commands.borrow().clone()
    }

    pub fn take(&self) -> Vec<ReloadCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }
}

impl Engine for FakeEngine {
    fn reload_map(&mut self, command: &ReloadCommand) {
        self.commands.borrow_mut().push(command.clone());
    }
}

/// A manager wired to fakes, with handles to inspect them
pub struct TestHarness {
    pub manager: AddonLifecycleManager,
    pub content: FakeContentService,
    pub runtime: FakeSearchPath,
    pub engine: FakeEngine,
    pub completions: CompletionSender,
    resolver: AddonPathResolver,
}

impl TestHarness {
    pub fn new(local: &[u64]) -> Self {
        let content = FakeContentService::with_local(local);
        let runtime = FakeSearchPath::new();
        let engine = FakeEngine::default();
        let resolver = AddonPathResolver::new("/game", 730);
        let (completions, receiver) = completion_channel();

        let manager = AddonLifecycleManager::new(
            ManagerSettings::default(),
            DownloadCoordinator::new(Box::new(content.clone()), receiver),
            MountSet::new(resolver.clone(), Box::new(runtime.clone())),
            Box::new(engine.clone()),
        );

        Self {
            manager,
            content,
            runtime,
            engine,
            completions,
            resolver,
        }
    }

    pub fn activated(local: &[u64]) -> Self {
        let mut harness = Self::new(local);
        harness.manager.on_server_activated();
        harness
    }

    /// Deliver a completion directly, installing the content on success
    pub fn complete(&mut self, raw: u64, succeeded: bool) {
        if succeeded {
            self.content.install(addon(raw));
        }
        self.manager.on_download_completed(addon(raw), succeeded);
    }

    /// Push a completion onto the channel; it is handled on the next frame
    pub fn send_completion(&self, raw: u64, succeeded: bool) {
        if succeeded {
            self.content.install(addon(raw));
        }
        self.completions
            .send(DownloadCompletion {
                id: addon(raw),
                succeeded,
            })
            .expect("completion receiver dropped");
    }

    pub fn path(&self, raw: u64) -> PathBuf {
        self.resolver.resolve(addon(raw))
    }
}

/// Create a test configuration rooted in a fresh temporary directory
pub fn create_test_config(root: &Path) -> Config {
    use std::net::SocketAddr;
    use std::str::FromStr;

    Config {
        game_root: root.to_path_buf(),
        local_api_bind: SocketAddr::from_str("127.0.0.1:0").unwrap(), // Use port 0 to auto-assign
        log_level: "error".to_string(), // Reduce log noise in tests
        ..Config::default()
    }
}

/// Create a temporary directory for tests
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::TempDir::new().expect("Failed to create temp directory")
}
