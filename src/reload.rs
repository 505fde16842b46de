//! Live scene replacement.
//!
//! [`SceneHandle`] owns the current scene behind an `Arc`. A render takes a
//! snapshot and keeps using it even if a reload swaps in a newer scene
//! halfway through. [`SceneWatcher`] polls a scene file's modification time
//! on a background thread and swaps in a fresh scene whenever it changes; a
//! file that fails to load leaves the previous scene in place.

use crate::loader;
use crate::registry::Registry;
use crate::scene::Scene;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct SceneHandle {
    current: RwLock<Arc<Scene>>,
    generation: AtomicU64,
}

impl SceneHandle {
    pub fn new(scene: Scene) -> Self {
        Self {
            current: RwLock::new(Arc::new(scene)),
            generation: AtomicU64::new(0),
        }
    }

    /// The scene as of now. Later swaps do not affect the returned value.
    pub fn snapshot(&self) -> Arc<Scene> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the scene and returns the one it displaced.
    pub fn swap(&self, scene: Scene) -> Arc<Scene> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let old = std::mem::replace(&mut *current, Arc::new(scene));
        self.generation.fetch_add(1, Ordering::Release);
        old
    }

    /// Bumped on every swap.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Reloaded,
    Failed,
}

/// Single-threaded change detector behind [`SceneWatcher`].
#[derive(Debug)]
pub struct Poller {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

impl Poller {
    /// Starts from the file's current modification time, so the first
    /// [`poll`](Self::poll) only reloads after a further change.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = modified(&path);
        Self {
            path,
            last_modified,
        }
    }

    pub fn poll(&mut self, registry: &Registry, handle: &SceneHandle) -> PollOutcome {
        let stamp = modified(&self.path);
        if stamp.is_none() || stamp == self.last_modified {
            return PollOutcome::Unchanged;
        }
        self.last_modified = stamp;
        match loader::load_scene(&self.path, registry) {
            Ok(scene) => {
                handle.swap(scene);
                log::info!("reloaded scene '{}'", self.path.display());
                PollOutcome::Reloaded
            }
            Err(err) => {
                log::error!("{err}: {}; keeping the previous scene", err.kind);
                PollOutcome::Failed
            }
        }
    }
}

/// Background thread running a [`Poller`] until dropped or stopped.
#[derive(Debug)]
pub struct SceneWatcher {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SceneWatcher {
    pub fn spawn(
        path: impl Into<PathBuf>,
        registry: Arc<Registry>,
        handle: Arc<SceneHandle>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let mut poller = Poller::new(path);
        let stop = Arc::new(AtomicBool::new(false));
        let thread = thread::Builder::new().name("scene-watcher".to_owned()).spawn({
            let stop = Arc::clone(&stop);
            move || {
                log::debug!("watching '{}'", poller.path.display());
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(interval);
                    poller.poll(&registry, &handle);
                }
            }
        })?;
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("scene watcher thread panicked");
            }
        }
    }
}

impl Drop for SceneWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneBuilder;
    use crate::math::Color;
    use pretty_assertions::assert_eq;
    use std::fs;

    const ONE_SPHERE: &str = r#"{"primitives": {"spheres": [{"x": 0, "y": 0, "z": 0, "radius": 1}]}}"#;
    const TWO_SPHERES: &str = r#"{"primitives": {"spheres": [
        {"x": 0, "y": 0, "z": 0, "radius": 1},
        {"x": 3, "y": 0, "z": 0, "radius": 1}
    ]}}"#;

    /// Rewrites `path` and moves its mtime forward so the change is seen
    /// regardless of filesystem timestamp resolution.
    fn rewrite(path: &Path, text: &str, bump_secs: u64) {
        fs::write(path, text).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(bump_secs))
            .unwrap();
    }

    #[test]
    fn snapshot_outlives_swap() {
        let handle = SceneHandle::new(SceneBuilder::new().ambient_light(Color::splat(0.1)).build());
        let before = handle.snapshot();
        let old = handle.swap(SceneBuilder::new().ambient_light(Color::splat(0.9)).build());
        assert!(Arc::ptr_eq(&before, &old));
        assert_eq!(before.ambient.color, Color::splat(0.1));
        assert_eq!(handle.snapshot().ambient.color, Color::splat(0.9));
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn poller_reloads_on_change_and_keeps_scene_on_failure() {
        let registry = Registry::with_builtins();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        fs::write(&path, ONE_SPHERE).unwrap();

        let handle = SceneHandle::new(loader::load_scene(&path, &registry).unwrap());
        let mut poller = Poller::new(&path);
        assert_eq!(poller.poll(&registry, &handle), PollOutcome::Unchanged);

        rewrite(&path, TWO_SPHERES, 10);
        assert_eq!(poller.poll(&registry, &handle), PollOutcome::Reloaded);
        assert_eq!(handle.snapshot().primitives.len(), 2);
        assert_eq!(poller.poll(&registry, &handle), PollOutcome::Unchanged);

        rewrite(&path, "{ broken", 20);
        assert_eq!(poller.poll(&registry, &handle), PollOutcome::Failed);
        assert_eq!(handle.snapshot().primitives.len(), 2);
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn missing_file_is_unchanged() {
        let registry = Registry::with_builtins();
        let dir = tempfile::tempdir().unwrap();
        let handle = SceneHandle::new(Scene::default());
        let mut poller = Poller::new(dir.path().join("nope.json"));
        assert_eq!(poller.poll(&registry, &handle), PollOutcome::Unchanged);
    }

    #[test]
    fn watcher_thread_picks_up_changes() {
        let registry = Arc::new(Registry::with_builtins());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        fs::write(&path, ONE_SPHERE).unwrap();
        let handle = Arc::new(SceneHandle::new(loader::load_scene(&path, &registry).unwrap()));

        let watcher = SceneWatcher::spawn(
            &path,
            Arc::clone(&registry),
            Arc::clone(&handle),
            Duration::from_millis(10),
        )
        .unwrap();
        rewrite(&path, TWO_SPHERES, 10);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while handle.generation() == 0 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        watcher.stop();
        assert_eq!(handle.snapshot().primitives.len(), 2);
    }
}
