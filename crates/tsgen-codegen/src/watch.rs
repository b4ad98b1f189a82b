//! Watch mode.
//!
//! A [`WatchEngine`] runs one full apply pass, then consumes change
//! notifications pushed through a [`ChangeQueue`]:
//!
//! ```text
//! producer (file watcher) --push--> ChangeQueue --wake--> consumer thread
//!                                      |                      |
//!                                  Debouncer  <--pop_due------+
//! ```
//!
//! Changes are coalesced per path by the [`Debouncer`] and processed one at a
//! time once their quiet period has elapsed. Workspace-level changes reload
//! the whole graph; a source-file change regenerates only the files that the
//! types declared in that file contribute to.
//!
//! Any error while processing a change stops the engine and is reported in
//! the returned [`WatchOutcome`].

use std::collections::{BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Diagnostic, Error, Result};
use crate::generator::{CodeGenerator, GeneratedFile};
use crate::graph::TypeGraph;
use crate::sync::{self, SyncMode, SyncReport};

/// Upper bound on a single idle wait; cancellation wakes the consumer sooner.
const IDLE_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
    Renamed { from: PathBuf },
}

/// One change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Created,
        }
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Changed,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ChangeKind::Deleted,
        }
    }

    pub fn renamed(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            path: to.into(),
            kind: ChangeKind::Renamed { from: from.into() },
        }
    }
}

#[derive(Debug)]
struct Pending {
    last_seen: Instant,
    kind: ChangeKind,
    seq: u64,
}

/// Per-path change coalescing with a quiet period.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    pending: HashMap<PathBuf, Pending>,
    next_seq: u64,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Record an event seen at `now`. Renames are split into a delete of the
    /// old path and a create of the new one.
    pub fn push(&mut self, event: ChangeEvent, now: Instant) {
        match event.kind {
            ChangeKind::Renamed { from } => {
                self.record(from, ChangeKind::Deleted, now);
                self.record(event.path, ChangeKind::Created, now);
            }
            kind => self.record(event.path, kind, now),
        }
    }

    fn record(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        if let Some(pending) = self.pending.get_mut(&path) {
            pending.kind = merge(&pending.kind, kind);
            pending.last_seen = now;
            return;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(
            path,
            Pending {
                last_seen: now,
                kind,
                seq,
            },
        );
    }

    /// The earliest moment a pending event becomes due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.last_seen + self.quiet).min()
    }

    /// Remove and return the oldest event whose quiet period has elapsed.
    pub fn pop_due(&mut self, now: Instant) -> Option<ChangeEvent> {
        let path = self
            .pending
            .iter()
            .filter(|(_, p)| p.last_seen + self.quiet <= now)
            .min_by_key(|(_, p)| (p.last_seen, p.seq))
            .map(|(path, _)| path.clone())?;
        let pending = self.pending.remove(&path)?;
        Some(ChangeEvent {
            path,
            kind: pending.kind,
        })
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

fn merge(previous: &ChangeKind, next: ChangeKind) -> ChangeKind {
    match (previous, next) {
        (ChangeKind::Deleted, ChangeKind::Created) => ChangeKind::Changed,
        (ChangeKind::Created, ChangeKind::Changed) => ChangeKind::Created,
        (_, next) => next,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Producer handle for a [`WatchEngine`].
#[derive(Debug, Clone)]
pub struct ChangeQueue {
    pending: Arc<Mutex<Debouncer>>,
    wake: Sender<()>,
    accepting: Arc<AtomicBool>,
}

impl ChangeQueue {
    /// Queue a change. Returns `false` when the engine is not accepting
    /// changes yet (initial pass still running) or any more.
    pub fn push(&self, event: ChangeEvent) -> bool {
        if !self.is_accepting() {
            debug!(path = %event.path.display(), "change ignored, engine not watching");
            return false;
        }
        lock(&self.pending).push(event, Instant::now());
        // The engine may already be gone.
        let _ = self.wake.send(());
        true
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    wakers: Mutex<Vec<Sender<()>>>,
}

/// Cooperative cancellation shared between the engine and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<CancelState>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation and wake every registered consumer.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        for waker in lock(&self.state.wakers).iter() {
            let _ = waker.send(());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    fn register(&self, waker: Sender<()>) {
        lock(&self.state.wakers).push(waker);
    }
}

/// How a changed path affects the type graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Workspace or project file: reload everything.
    Reload,
    /// One source file: reload it and regenerate what it declares.
    SourceFile,
    Ignore,
}

/// A loader that produces [`TypeGraph`] snapshots.
pub trait TypeGraphSource {
    fn classify(&self, path: &Path) -> ChangeScope;

    /// Load a fresh snapshot of every source.
    fn load(&mut self) -> Result<TypeGraph>;

    /// Re-read one source file (which may no longer exist) and return the
    /// updated snapshot.
    fn reload_file(&mut self, path: &Path) -> Result<TypeGraph>;
}

/// Final state of a watch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOutcome {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Generation passes run, the initial one included.
    pub passes: usize,
}

impl Default for WatchOutcome {
    fn default() -> Self {
        Self {
            success: true,
            diagnostics: Vec::new(),
            passes: 0,
        }
    }
}

/// Single-consumer watch loop.
pub struct WatchEngine<S> {
    source: S,
    generator: CodeGenerator,
    config_file: Option<PathBuf>,
    debounce_override: Option<Duration>,
    pending: Arc<Mutex<Debouncer>>,
    accepting: Arc<AtomicBool>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    cancel: CancellationToken,
    outcome: WatchOutcome,
}

impl<S: TypeGraphSource> WatchEngine<S> {
    pub fn new(source: S, config: Config) -> Self {
        let (wake_tx, wake_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        cancel.register(wake_tx.clone());
        Self {
            source,
            pending: Arc::new(Mutex::new(Debouncer::new(config.debounce()))),
            generator: CodeGenerator::new(config),
            config_file: None,
            debounce_override: None,
            accepting: Arc::new(AtomicBool::new(false)),
            wake_tx,
            wake_rx,
            cancel,
            outcome: WatchOutcome::default(),
        }
    }

    /// Re-read the configuration from `path` on every full reload.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Quiet period that wins over the configured one until the config file
    /// itself changes.
    pub fn with_debounce(mut self, quiet: Duration) -> Self {
        self.debounce_override = Some(quiet);
        lock(&self.pending).quiet = quiet;
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        token.register(self.wake_tx.clone());
        self.cancel = token;
        self
    }

    pub fn queue(&self) -> ChangeQueue {
        ChangeQueue {
            pending: Arc::clone(&self.pending),
            wake: self.wake_tx.clone(),
            accepting: Arc::clone(&self.accepting),
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run on a dedicated thread.
    pub fn spawn(self) -> io::Result<JoinHandle<WatchOutcome>>
    where
        S: Send + 'static,
    {
        thread::Builder::new()
            .name("tsgen-watch".to_string())
            .spawn(move || self.run())
    }

    /// Run until cancelled or until processing a change fails.
    pub fn run(mut self) -> WatchOutcome {
        if self.cancel.is_cancelled() {
            return self.outcome;
        }

        info!("running initial generation");
        if let Err(err) = self.full_reload() {
            self.fail(err);
            return self.outcome;
        }
        self.accepting.store(true, Ordering::SeqCst);
        info!("watching for changes");

        while !self.cancel.is_cancelled() {
            let timeout = lock(&self.pending)
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);
            match self.wake_rx.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if self.cancel.is_cancelled() {
                break;
            }

            loop {
                let Some(event) = lock(&self.pending).pop_due(Instant::now()) else {
                    break;
                };
                if let Err(err) = self.process(&event) {
                    self.fail(err);
                    break;
                }
            }
        }

        self.accepting.store(false, Ordering::SeqCst);
        info!(success = self.outcome.success, "watch stopped");
        self.outcome
    }

    fn process(&mut self, event: &ChangeEvent) -> Result<()> {
        if event.path.is_dir() {
            return Ok(());
        }
        match self.source.classify(&event.path) {
            ChangeScope::Reload => {
                info!(path = %event.path.display(), "workspace changed, reloading");
                if self.config_file.as_deref() == Some(event.path.as_path()) {
                    self.debounce_override = None;
                }
                self.full_reload()
            }
            ChangeScope::SourceFile => {
                debug!(path = %event.path.display(), kind = ?event.kind, "source changed");
                self.update_file(&event.path)
            }
            ChangeScope::Ignore => {
                debug!(path = %event.path.display(), "change ignored");
                Ok(())
            }
        }
    }

    fn full_reload(&mut self) -> Result<()> {
        if let Some(path) = &self.config_file {
            let config = Config::from_file(path)?;
            lock(&self.pending).quiet = self.debounce_override.unwrap_or(config.debounce());
            self.generator.set_config(config);
        }
        let graph = self.source.load()?;
        self.generator.set_graph(graph);
        let report = self.generator.synchronize(SyncMode::Apply)?;
        self.record(report);
        Ok(())
    }

    fn update_file(&mut self, path: &Path) -> Result<()> {
        let before = self.generator.targets_declared_in(path);
        let graph = self.source.reload_file(path)?;
        self.generator.set_graph(graph);
        let after = self.generator.targets_declared_in(path);

        let scope: BTreeSet<PathBuf> = before.union(&after).cloned().collect();
        if scope.is_empty() {
            debug!(path = %path.display(), "no generated types affected");
            return Ok(());
        }

        let plan = self.generator.plan();
        let files: Vec<GeneratedFile> = plan
            .files
            .into_iter()
            .filter(|f| scope.contains(&f.path))
            .collect();
        let deletions: Vec<PathBuf> = scope
            .into_iter()
            .filter(|p| !files.iter().any(|f| &f.path == p))
            .collect();

        let mut report = sync::apply_incremental(&files, &deletions)?;
        report.diagnostics = plan.diagnostics;
        self.record(report);
        Ok(())
    }

    fn record(&mut self, report: SyncReport) {
        self.outcome.passes += 1;
        for diagnostic in report.diagnostics {
            if !self.outcome.diagnostics.contains(&diagnostic) {
                warn!(%diagnostic, "generation finding");
                self.outcome.diagnostics.push(diagnostic);
            }
        }
    }

    fn fail(&mut self, err: Error) {
        error!(%err, "watch aborted");
        self.outcome.success = false;
        self.outcome
            .diagnostics
            .push(Diagnostic::WatchFailed(err.to_string()));
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Attribute, MemberNode, TypeKind, TypeNode, TypeRef};
    use std::fs;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_delete_then_create_is_changed() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.push(ChangeEvent::deleted("a.rs"), start);
        debouncer.push(ChangeEvent::created("a.rs"), start + Duration::from_millis(5));

        assert_eq!(debouncer.len(), 1);
        assert_eq!(debouncer.pop_due(start + Duration::from_millis(50)), None);
        assert_eq!(
            debouncer.pop_due(start + Duration::from_millis(105)),
            Some(ChangeEvent::changed("a.rs"))
        );
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_rapid_edits_coalesce_and_extend_quiet_period() {
        let start = Instant::now();
        let quiet = Duration::from_millis(100);
        let mut debouncer = Debouncer::new(quiet);
        for i in 0..3 {
            debouncer.push(ChangeEvent::changed("a.rs"), start + Duration::from_millis(i * 30));
        }

        assert_eq!(debouncer.len(), 1);
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(60) + quiet)
        );
        assert_eq!(debouncer.pop_due(start + Duration::from_millis(120)), None);
        assert!(debouncer.pop_due(start + Duration::from_millis(160)).is_some());
    }

    #[test]
    fn test_rename_is_split() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.push(ChangeEvent::renamed("old.rs", "new.rs"), now);

        assert_eq!(debouncer.pop_due(now), Some(ChangeEvent::deleted("old.rs")));
        assert_eq!(debouncer.pop_due(now), Some(ChangeEvent::created("new.rs")));
        assert_eq!(debouncer.pop_due(now), None);
    }

    #[test]
    fn test_oldest_due_first() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(ChangeEvent::changed("b.rs"), start);
        debouncer.push(ChangeEvent::changed("a.rs"), start + Duration::from_millis(1));

        let later = start + Duration::from_millis(50);
        assert_eq!(debouncer.pop_due(later).unwrap().path, PathBuf::from("b.rs"));
        assert_eq!(debouncer.pop_due(later).unwrap().path, PathBuf::from("a.rs"));
    }

    struct StubSource {
        graph: Arc<Mutex<TypeGraph>>,
        reloads: Arc<AtomicUsize>,
        fail_load: bool,
        fail_reload: bool,
    }

    impl TypeGraphSource for StubSource {
        fn classify(&self, path: &Path) -> ChangeScope {
            if path.file_name().is_some_and(|n| n == "Cargo.toml" || n == "tsgen.json") {
                ChangeScope::Reload
            } else if path.extension().is_some_and(|e| e == "rs") {
                ChangeScope::SourceFile
            } else {
                ChangeScope::Ignore
            }
        }

        fn load(&mut self) -> Result<TypeGraph> {
            if self.fail_load {
                return Err(Error::Load("broken workspace".into()));
            }
            Ok(lock(&self.graph).clone())
        }

        fn reload_file(&mut self, _path: &Path) -> Result<TypeGraph> {
            self.reloads.fetch_add(1, Ordering::SeqCst);
            if self.fail_reload {
                return Err(Error::Load("broken file".into()));
            }
            Ok(lock(&self.graph).clone())
        }
    }

    fn graph_with_member(member: &str) -> TypeGraph {
        TypeGraph::new().with_type(
            TypeNode::new("crate::Item", TypeKind::Class)
                .with_attr(Attribute::Namespace("Api".into()))
                .declared_in("/src/item.rs")
                .with_member(MemberNode::field(member, TypeRef::path("String"))),
        )
    }

    fn stub(graph: TypeGraph) -> (StubSource, Arc<Mutex<TypeGraph>>, Arc<AtomicUsize>) {
        let shared = Arc::new(Mutex::new(graph));
        let reloads = Arc::new(AtomicUsize::new(0));
        let source = StubSource {
            graph: Arc::clone(&shared),
            reloads: Arc::clone(&reloads),
            fail_load: false,
            fail_reload: false,
        };
        (source, shared, reloads)
    }

    fn config(dir: &Path) -> Config {
        Config {
            output_path: dir.to_path_buf(),
            debounce_ms: 100,
            ..Config::default()
        }
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_rapid_edits_run_one_pass() {
        let dir = tempfile::tempdir().unwrap();
        let (source, shared, reloads) = stub(graph_with_member("first"));
        let engine = WatchEngine::new(source, config(dir.path()));
        let queue = engine.queue();
        let cancel = engine.cancellation();
        let handle = engine.spawn().unwrap();

        assert!(wait_until(|| queue.is_accepting()));
        let output = dir.path().join("Api.d.ts");
        assert!(fs::read_to_string(&output).unwrap().contains("first: string;"));

        *lock(&shared) = graph_with_member("last");
        for _ in 0..3 {
            assert!(queue.push(ChangeEvent::changed("/src/item.rs")));
        }

        assert!(wait_until(|| {
            fs::read_to_string(&output).is_ok_and(|text| text.contains("last: string;"))
        }));
        thread::sleep(Duration::from_millis(300));
        cancel.cancel();

        let outcome = handle.join().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.passes, 2);
        assert_eq!(reloads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_load_failure_stops_engine() {
        let dir = tempfile::tempdir().unwrap();
        let (mut source, _, _) = stub(TypeGraph::new());
        source.fail_load = true;

        let outcome = WatchEngine::new(source, config(dir.path())).run();
        assert!(!outcome.success);
        assert!(matches!(outcome.diagnostics[..], [Diagnostic::WatchFailed(_)]));
    }

    #[test]
    fn test_processing_failure_cancels_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut source, _, _) = stub(graph_with_member("a"));
        source.fail_reload = true;
        let engine = WatchEngine::new(source, config(dir.path()));
        let queue = engine.queue();
        let cancel = engine.cancellation();
        let handle = engine.spawn().unwrap();

        assert!(wait_until(|| queue.is_accepting()));
        queue.push(ChangeEvent::changed("/src/item.rs"));

        let outcome = handle.join().unwrap();
        assert!(!outcome.success);
        assert!(cancel.is_cancelled());
        assert!(!queue.is_accepting());
    }

    #[test]
    fn test_removed_type_deletes_namespace_file() {
        let dir = tempfile::tempdir().unwrap();
        let (source, shared, _) = stub(graph_with_member("a"));
        let engine = WatchEngine::new(source, config(dir.path()));
        let queue = engine.queue();
        let cancel = engine.cancellation();
        let handle = engine.spawn().unwrap();

        assert!(wait_until(|| queue.is_accepting()));
        let output = dir.path().join("Api.d.ts");
        assert!(output.exists());

        *lock(&shared) = TypeGraph::new();
        queue.push(ChangeEvent::deleted("/src/item.rs"));
        assert!(wait_until(|| !output.exists()));

        cancel.cancel();
        assert!(handle.join().unwrap().success);
    }

    #[test]
    fn test_debounce_override_survives_until_config_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config_file = dir.path().join("tsgen.json");
        fs::write(&config_file, r#"{ "outputPath": "out", "debounceMs": 500 }"#).unwrap();

        let (source, _, _) = stub(graph_with_member("a"));
        let mut engine = WatchEngine::new(source, config(dir.path()))
            .with_config_file(&config_file)
            .with_debounce(Duration::from_millis(5));

        engine.full_reload().unwrap();
        assert_eq!(lock(&engine.pending).quiet, Duration::from_millis(5));
        assert!(dir.path().join("out/Api.d.ts").exists());

        engine.process(&ChangeEvent::changed("/src/Cargo.toml")).unwrap();
        assert_eq!(lock(&engine.pending).quiet, Duration::from_millis(5));

        engine.process(&ChangeEvent::changed(&config_file)).unwrap();
        assert_eq!(lock(&engine.pending).quiet, Duration::from_millis(500));
    }

    #[test]
    fn test_cancel_before_start() {
        let dir = tempfile::tempdir().unwrap();
        let (source, _, _) = stub(graph_with_member("a"));
        let token = CancellationToken::new();
        token.cancel();

        let outcome = WatchEngine::new(source, config(dir.path()))
            .with_cancellation(token)
            .run();
        assert!(outcome.success);
        assert_eq!(outcome.passes, 0);
        assert!(!dir.path().join("Api.d.ts").exists());
    }
}
