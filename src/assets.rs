//! Asynchronous texture loading.
//!
//! Decoding runs on tokio's blocking pool and results come back over a
//! channel that the frame callback drains. A shared liveness flag stops
//! in-flight loads from reporting after teardown, and a per-body generation
//! lets the caller ignore loads that were superseded (e.g. by a reset).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::AssetError;
use crate::scene::BodyId;

/// Result of one load request.
#[derive(Debug)]
pub struct TextureLoad {
    pub body: BodyId,
    pub generation: u64,
    pub path: PathBuf,
    pub result: Result<RgbaImage, AssetError>,
}

/// Read and decode an image file into RGBA8.
pub fn decode_texture(path: &Path) -> Result<RgbaImage, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let image = image::load_from_memory(&bytes).map_err(|source| AssetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgba8())
}

pub struct AssetLoader {
    runtime: Handle,
    root: PathBuf,
    alive: Arc<AtomicBool>,
    tx: mpsc::UnboundedSender<TextureLoad>,
    rx: mpsc::UnboundedReceiver<TextureLoad>,
    generations: HashMap<BodyId, u64>,
}

impl AssetLoader {
    /// Texture paths are resolved against `root`.
    pub fn new(runtime: Handle, root: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            root: root.into(),
            alive: Arc::new(AtomicBool::new(true)),
            tx,
            rx,
            generations: HashMap::new(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Starts loading `file` for `body`, superseding any earlier request for it.
    pub fn request(&mut self, body: BodyId, file: &str) {
        if !self.is_alive() {
            return;
        }
        let generation = self.generations.entry(body).or_insert(0);
        *generation += 1;
        let generation = *generation;

        let path = self.root.join(file);
        let alive = Arc::clone(&self.alive);
        let tx = self.tx.clone();
        debug!("loading texture {} for body {}", path.display(), body.0);

        self.runtime.spawn(async move {
            if !alive.load(Ordering::Acquire) {
                return;
            }
            let decode_path = path.clone();
            let result = tokio::task::spawn_blocking(move || decode_texture(&decode_path))
                .await
                .unwrap_or_else(|e| Err(AssetError::Task(e.to_string())));
            if alive.load(Ordering::Acquire) {
                let _ = tx.send(TextureLoad {
                    body,
                    generation,
                    path,
                    result,
                });
            }
        });
    }

    pub fn cancel_all(&mut self) {
        for generation in self.generations.values_mut() {
            *generation += 1;
        }
    }

    /// Successful, current loads finished since the last call.
    ///
    /// Failures are logged and dropped, as are stale loads and anything
    /// arriving after `shutdown`.
    pub fn drain(&mut self) -> Vec<(BodyId, RgbaImage)> {
        let mut ready = Vec::new();
        while let Ok(load) = self.rx.try_recv() {
            if !self.is_alive() {
                continue;
            }
            if self.generations.get(&load.body) != Some(&load.generation) {
                debug!("discarding stale texture {}", load.path.display());
                continue;
            }
            match load.result {
                Ok(image) => ready.push((load.body, image)),
                Err(e) => warn!("texture load failed, keeping fallback colour: {e}"),
            }
        }
        ready
    }

    /// Stops in-flight loads from reporting back. Idempotent.
    pub fn shutdown(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl Drop for AssetLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn write_png(dir: &Path, name: &str) {
        let image = RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]));
        image.save(dir.join(name)).unwrap();
    }

    async fn drain_until(loader: &mut AssetLoader, want: usize) -> Vec<(BodyId, RgbaImage)> {
        let mut out = Vec::new();
        for _ in 0..200 {
            out.extend(loader.drain());
            if out.len() >= want {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        out
    }

    /// Waits until every spawned load has reported or been dropped.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn loads_texture() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "earth.png");
        let mut loader = AssetLoader::new(Handle::current(), dir.path());

        loader.request(BodyId(2), "earth.png");
        let ready = drain_until(&mut loader, 1).await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, BodyId(2));
        assert_eq!(ready[0].1.dimensions(), (4, 2));
        assert_eq!(ready[0].1.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = AssetLoader::new(Handle::current(), dir.path());
        loader.request(BodyId(0), "nope.jpg");
        settle().await;
        assert!(loader.drain().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn superseded_request_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "mars.png");
        let mut loader = AssetLoader::new(Handle::current(), dir.path());
        loader.request(BodyId(3), "mars.png");
        loader.request(BodyId(3), "mars.png");
        let mut ready = drain_until(&mut loader, 1).await;
        settle().await;
        ready.extend(loader.drain());
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].0, BodyId(3));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_all_drops_outstanding_loads() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "mars.png");
        write_png(dir.path(), "earth.png");
        let mut loader = AssetLoader::new(Handle::current(), dir.path());
        loader.request(BodyId(2), "earth.png");
        loader.request(BodyId(3), "mars.png");
        loader.cancel_all();
        settle().await;
        assert!(loader.drain().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn nothing_reported_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "venus.png");
        let mut loader = AssetLoader::new(Handle::current(), dir.path());
        loader.request(BodyId(1), "venus.png");
        loader.shutdown();
        settle().await;
        assert!(loader.drain().is_empty());

        loader.request(BodyId(1), "venus.png");
        settle().await;
        assert!(loader.drain().is_empty());
    }

    #[test]
    fn decode_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            decode_texture(&path),
            Err(AssetError::Decode { .. })
        ));
    }
}
