//! Hand-written fakes for the host primitives.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    AudioSessionConfig, DownloadRequest, DownloadedFile, ElementId, FileMetadata,
    FileSystemAccess, ListenerToken, MediaDownloader, MediaElement, MediaElementEvent,
    MediaElementListener, NativeAudioEngine, ProgressCallback, SoundId, SoundStatus,
    SoundStatusListener, TransferProgress,
};
use bytes::Bytes;
use core_playback::{SessionController, Track};
use core_runtime::events::{CoreEvent, EventStream};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn track(id: &str) -> Track {
    Track::new(
        id,
        format!("Song {}", id),
        "Test Artist",
        format!("https://cdn.example.com/{}.mp3", id),
    )
}

/// Wait until the session satisfies `predicate`.
pub async fn wait_for_session<F>(controller: &SessionController, predicate: F)
where
    F: Fn(&core_playback::PlaybackSession) -> bool,
{
    let mut rx = controller.subscribe();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if predicate(&*rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("session never reached the expected state");
}

/// Drain every event currently queued on the stream.
pub fn drain(stream: &mut EventStream) -> Vec<CoreEvent> {
    let mut events = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// File system
// ============================================================================

/// File system kept entirely in memory.
pub struct InMemoryFileSystem {
    data_dir: PathBuf,
    files: Mutex<HashMap<PathBuf, Bytes>>,
    dirs: Mutex<HashSet<PathBuf>>,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("/data"),
            files: Mutex::new(HashMap::new()),
            dirs: Mutex::new(HashSet::new()),
        }
    }

    pub fn put(&self, path: &Path, data: &[u8]) {
        self.files
            .lock()
            .insert(path.to_path_buf(), Bytes::copy_from_slice(data));
    }

    pub fn remove(&self, path: &Path) {
        self.files.lock().remove(path);
    }

    pub fn rename(&self, from: &Path, to: &Path) {
        let mut files = self.files.lock();
        if let Some(data) = files.remove(from) {
            files.insert(to.to_path_buf(), data);
        }
    }

    pub fn read(&self, path: &Path) -> Option<Bytes> {
        self.files.lock().get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

#[async_trait]
impl FileSystemAccess for InMemoryFileSystem {
    async fn get_data_directory(&self) -> Result<PathBuf> {
        Ok(self.data_dir.clone())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.files.lock().contains_key(path) || self.dirs.lock().contains(path))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        if let Some(data) = self.files.lock().get(path) {
            return Ok(FileMetadata {
                size: data.len() as u64,
                modified_at: None,
                is_directory: false,
            });
        }
        if self.dirs.lock().contains(path) {
            return Ok(FileMetadata {
                size: 0,
                modified_at: None,
                is_directory: true,
            });
        }
        Err(BridgeError::OperationFailed(format!(
            "no such file: {}",
            path.display()
        )))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.lock();
        for ancestor in path.ancestors() {
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = self
            .files
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        entries.extend(
            self.dirs
                .lock()
                .iter()
                .filter(|p| p.parent() == Some(path))
                .cloned(),
        );
        Ok(entries)
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// Writes fixed content into the in-memory file system after a delay.
pub struct ScriptedDownloader {
    fs: Arc<InMemoryFileSystem>,
    content: Bytes,
    delay: Duration,
    failures_left: AtomicUsize,
    calls: AtomicUsize,
    requests: Mutex<Vec<DownloadRequest>>,
}

impl ScriptedDownloader {
    pub fn new(fs: Arc<InMemoryFileSystem>, content: &[u8]) -> Self {
        Self {
            fs,
            content: Bytes::copy_from_slice(content),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the next `count` calls with a network error.
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<DownloadRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl MediaDownloader for ScriptedDownloader {
    async fn download(
        &self,
        request: DownloadRequest,
        progress: ProgressCallback,
    ) -> Result<DownloadedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(BridgeError::Network("connection reset".to_string()));
        }

        let total = self.content.len() as u64;
        progress(TransferProgress {
            bytes_written: total / 2,
            total_bytes: Some(total),
        });
        progress(TransferProgress {
            bytes_written: total,
            total_bytes: Some(total),
        });

        self.fs.put(&request.destination, &self.content);
        self.fs.remove(&request.partial_path());

        Ok(DownloadedFile {
            path: request.destination,
            bytes_written: total,
        })
    }
}

// ============================================================================
// Streaming media element
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ElementCall {
    Create(String),
    AddListener(ElementId),
    RemoveListener(ElementId),
    Play(ElementId),
    Pause(ElementId),
    SetCurrentTime(ElementId, f64),
    Release(ElementId),
}

/// Records every call and keeps listeners around so tests can fire events,
/// including on elements that were already released.
#[derive(Default)]
pub struct FakeMediaElement {
    next_id: AtomicU64,
    calls: Mutex<Vec<ElementCall>>,
    listeners: Mutex<HashMap<ElementId, MediaElementListener>>,
    live: Mutex<HashSet<ElementId>>,
    pending_creates: AtomicUsize,
    create_delays: Mutex<HashMap<String, Duration>>,
    play_delay: Mutex<Option<Duration>>,
    fail_play: AtomicBool,
    fail_add_listener: AtomicBool,
    duplicate_releases: AtomicUsize,
    live_at_play: Mutex<Vec<usize>>,
}

impl FakeMediaElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay `create` for this source.
    pub fn delay_create(&self, src: &str, delay: Duration) {
        self.create_delays.lock().insert(src.to_string(), delay);
    }

    /// Delay every `play` call before it is recorded.
    pub fn delay_play(&self, delay: Duration) {
        *self.play_delay.lock() = Some(delay);
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_add_listener(&self, fail: bool) {
        self.fail_add_listener.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ElementCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&ElementCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn play_count(&self) -> usize {
        self.count(|c| matches!(c, ElementCall::Play(_)))
    }

    pub fn created(&self) -> Vec<ElementId> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ElementCall::AddListener(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn element_for(&self, src: &str) -> Option<ElementId> {
        let calls = self.calls.lock();
        let index = calls
            .iter()
            .position(|c| matches!(c, ElementCall::Create(s) if s == src))?;
        calls[index..].iter().find_map(|c| match c {
            ElementCall::AddListener(id) => Some(*id),
            _ => None,
        })
    }

    pub fn is_live(&self, element: ElementId) -> bool {
        self.live.lock().contains(&element)
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn pending_creates(&self) -> usize {
        self.pending_creates.load(Ordering::SeqCst)
    }

    pub fn duplicate_releases(&self) -> usize {
        self.duplicate_releases.load(Ordering::SeqCst)
    }

    /// Number of live elements observed at each `play` call.
    pub fn live_at_play(&self) -> Vec<usize> {
        self.live_at_play.lock().clone()
    }

    /// Invoke the listener registered on `element`, even after removal.
    pub fn fire(&self, element: ElementId, event: MediaElementEvent) {
        let listener = self.listeners.lock().get(&element).cloned();
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

#[async_trait]
impl MediaElement for FakeMediaElement {
    async fn create(&self, src: &str) -> Result<ElementId> {
        let delay = self.create_delays.lock().get(src).copied();
        if let Some(delay) = delay {
            self.pending_creates.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.pending_creates.fetch_sub(1, Ordering::SeqCst);
        }

        let id = ElementId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().push(ElementCall::Create(src.to_string()));
        self.live.lock().insert(id);
        Ok(id)
    }

    async fn add_listener(
        &self,
        element: ElementId,
        listener: MediaElementListener,
    ) -> Result<ListenerToken> {
        self.calls.lock().push(ElementCall::AddListener(element));
        if self.fail_add_listener.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("listener rejected".to_string()));
        }
        self.listeners.lock().insert(element, listener);
        Ok(ListenerToken(element.0))
    }

    async fn remove_listener(&self, element: ElementId, _token: ListenerToken) -> Result<()> {
        self.calls.lock().push(ElementCall::RemoveListener(element));
        Ok(())
    }

    async fn play(&self, element: ElementId) -> Result<()> {
        let delay = *self.play_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.calls.lock().push(ElementCall::Play(element));
        self.live_at_play.lock().push(self.live.lock().len());
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(BridgeError::Rejected("autoplay blocked".to_string()));
        }
        Ok(())
    }

    async fn pause(&self, element: ElementId) -> Result<()> {
        self.calls.lock().push(ElementCall::Pause(element));
        Ok(())
    }

    async fn set_current_time(&self, element: ElementId, seconds: f64) -> Result<()> {
        self.calls
            .lock()
            .push(ElementCall::SetCurrentTime(element, seconds));
        Ok(())
    }

    async fn release(&self, element: ElementId) -> Result<()> {
        self.calls.lock().push(ElementCall::Release(element));
        if !self.live.lock().remove(&element) {
            self.duplicate_releases.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed(format!(
                "{} already released",
                element
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Native audio engine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    ConfigureSession(AudioSessionConfig),
    CreateSound(String),
    SetStatusListener(SoundId),
    ClearStatusListener(SoundId),
    Play(SoundId),
    Pause(SoundId),
    SetPosition(SoundId, u64),
    Unload(SoundId),
}

#[derive(Default)]
pub struct FakeAudioEngine {
    next_id: AtomicU64,
    calls: Mutex<Vec<EngineCall>>,
    listeners: Mutex<HashMap<SoundId, SoundStatusListener>>,
    live: Mutex<HashSet<SoundId>>,
    fail_create: AtomicBool,
    fail_play: AtomicBool,
    duplicate_unloads: AtomicUsize,
}

impl FakeAudioEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn created_uris(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCall::CreateSound(uri) => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn duplicate_unloads(&self) -> usize {
        self.duplicate_unloads.load(Ordering::SeqCst)
    }

    pub fn last_sound(&self) -> Option<SoundId> {
        self.calls.lock().iter().rev().find_map(|c| match c {
            EngineCall::SetStatusListener(id) => Some(*id),
            _ => None,
        })
    }

    /// Push a status to the sound's listener, even after it was cleared.
    pub fn push_status(&self, sound: SoundId, status: SoundStatus) {
        let listener = self.listeners.lock().get(&sound).cloned();
        if let Some(listener) = listener {
            listener(status);
        }
    }
}

#[async_trait]
impl NativeAudioEngine for FakeAudioEngine {
    async fn configure_session(&self, config: AudioSessionConfig) -> Result<()> {
        self.calls.lock().push(EngineCall::ConfigureSession(config));
        Ok(())
    }

    async fn create_sound(&self, uri: &str) -> Result<SoundId> {
        self.calls.lock().push(EngineCall::CreateSound(uri.to_string()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::OperationFailed("unsupported format".to_string()));
        }
        let id = SoundId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.live.lock().insert(id);
        Ok(id)
    }

    async fn set_status_listener(
        &self,
        sound: SoundId,
        listener: SoundStatusListener,
    ) -> Result<()> {
        self.calls.lock().push(EngineCall::SetStatusListener(sound));
        self.listeners.lock().insert(sound, listener);
        Ok(())
    }

    async fn clear_status_listener(&self, sound: SoundId) -> Result<()> {
        self.calls.lock().push(EngineCall::ClearStatusListener(sound));
        Ok(())
    }

    async fn play(&self, sound: SoundId) -> Result<()> {
        self.calls.lock().push(EngineCall::Play(sound));
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(BridgeError::Rejected("audio focus denied".to_string()));
        }
        Ok(())
    }

    async fn pause(&self, sound: SoundId) -> Result<()> {
        self.calls.lock().push(EngineCall::Pause(sound));
        Ok(())
    }

    async fn set_position(&self, sound: SoundId, position_ms: u64) -> Result<()> {
        self.calls
            .lock()
            .push(EngineCall::SetPosition(sound, position_ms));
        Ok(())
    }

    async fn unload(&self, sound: SoundId) -> Result<()> {
        self.calls.lock().push(EngineCall::Unload(sound));
        if !self.live.lock().remove(&sound) {
            self.duplicate_unloads.fetch_add(1, Ordering::SeqCst);
            return Err(BridgeError::OperationFailed(format!(
                "{} already unloaded",
                sound
            )));
        }
        Ok(())
    }
}
