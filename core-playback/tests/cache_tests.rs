//! Download cache behavior against an in-memory file system.

mod support;

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    DownloadRequest, DownloadedFile, MediaDownloader, ProgressCallback, TransferProgress,
};
use core_playback::cache::{CacheConfig, CacheStorage, DownloadCache};
use core_playback::PlaybackError;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, EventStream};
use mockall::{mock, Sequence};
use std::sync::Arc;
use std::time::Duration;
use support::{track, InMemoryFileSystem, ScriptedDownloader};

mock! {
    Downloader {}

    #[async_trait]
    impl MediaDownloader for Downloader {
        async fn download(
            &self,
            request: DownloadRequest,
            progress: ProgressCallback,
        ) -> BridgeResult<DownloadedFile>;
    }
}

fn local_cache(
    fs: Arc<InMemoryFileSystem>,
    downloader: Arc<dyn MediaDownloader>,
    attempts: u32,
) -> DownloadCache {
    DownloadCache::new(
        CacheConfig::default().with_max_retry_attempts(attempts),
        Some(fs),
        Some(downloader),
    )
    .unwrap()
}

#[tokio::test]
async fn test_resolve_downloads_into_media_directory() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let fs_for_mock = fs.clone();

    let mut downloader = MockDownloader::new();
    downloader
        .expect_download()
        .times(1)
        .returning(move |request, progress| {
            assert!(request.destination.starts_with("/data/music"));
            assert_eq!(request.url, "https://cdn.example.com/a.mp3");
            progress(TransferProgress {
                bytes_written: 3,
                total_bytes: Some(3),
            });
            fs_for_mock.put(&request.destination, b"abc");
            Ok(DownloadedFile {
                path: request.destination,
                bytes_written: 3,
            })
        });

    let cache = local_cache(fs.clone(), Arc::new(downloader), 3);
    let track = track("a");

    let uri = cache.resolve(&track).await.unwrap();
    assert!(uri.starts_with("file:///data/music/"));
    assert!(uri.ends_with(".mp3"));
    assert!(cache.is_resolved(track.id()));
    assert_eq!(cache.resolved_uri(track.id()), Some(uri.clone()));

    // Served from the record; the mock would panic on a second call.
    assert_eq!(cache.resolve(&track).await.unwrap(), uri);
    assert!(cache.active_downloads().is_empty());

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.resolved_tracks, 1);
    assert_eq!(stats.active_downloads, 0);
    assert_eq!(stats.disk_usage_bytes, 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolves_share_one_fetch() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let downloader =
        Arc::new(ScriptedDownloader::new(fs.clone(), b"payload").with_delay(Duration::from_millis(50)));
    let cache = local_cache(fs, downloader.clone(), 3);
    let track = track("shared");

    let first = {
        let cache = cache.clone();
        let track = track.clone();
        tokio::spawn(async move { cache.resolve(&track).await })
    };
    let second = {
        let cache = cache.clone();
        let track = track.clone();
        tokio::spawn(async move { cache.resolve(&track).await })
    };

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(first, second);
    assert_eq!(downloader.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_tracks_download_concurrently() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let downloader =
        Arc::new(ScriptedDownloader::new(fs.clone(), b"payload").with_delay(Duration::from_millis(100)));
    let cache = local_cache(fs, downloader.clone(), 1);

    let (x, y) = (track("x"), track("y"));
    let started = tokio::time::Instant::now();
    let (a, b) = tokio::join!(cache.resolve(&x), cache.resolve(&y));

    assert_ne!(a.unwrap(), b.unwrap());
    assert_eq!(downloader.calls(), 2);
    assert!(started.elapsed() < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_failed_download_leaves_no_record() {
    let fs = Arc::new(InMemoryFileSystem::new());

    let mut downloader = MockDownloader::new();
    downloader
        .expect_download()
        .times(2)
        .returning(|_, _| Err(BridgeError::Network("host unreachable".to_string())));

    let bus = EventBus::new(16);
    let mut events = EventStream::new(bus.subscribe());
    let cache = local_cache(fs, Arc::new(downloader), 2).with_event_bus(bus);
    let track = track("broken");

    let err = cache.resolve(&track).await.unwrap_err();
    match &err {
        PlaybackError::DownloadFailed { track_id, reason } => {
            assert_eq!(track_id, "broken");
            assert!(reason.contains("host unreachable"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_network_error());
    assert!(!cache.is_resolved(track.id()));
    assert!(cache.download_progress(track.id()).is_none());

    let received = support::drain(&mut events);
    assert!(received.contains(&CoreEvent::Download(DownloadEvent::Failed {
        track_id: "broken".to_string(),
        message: "Network error: host unreachable".to_string(),
        attempts: 2,
    })));
}

#[tokio::test(start_paused = true)]
async fn test_retry_resumes_from_partial_file() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let mut downloader = MockDownloader::new();
    let mut seq = Sequence::new();

    let fs_first = fs.clone();
    downloader
        .expect_download()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|request, _| request.resume_from == 0)
        .returning(move |request, _| {
            fs_first.put(&request.partial_path(), b"1234");
            Err(BridgeError::Network("connection reset".to_string()))
        });

    let fs_second = fs.clone();
    downloader
        .expect_download()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|request, _| request.resume_from == 4)
        .returning(move |request, _| {
            fs_second.put(&request.destination, b"12345678");
            fs_second.remove(&request.partial_path());
            Ok(DownloadedFile {
                path: request.destination,
                bytes_written: 8,
            })
        });

    let cache = local_cache(fs.clone(), Arc::new(downloader), 3);
    let uri = cache.resolve(&track("resumable")).await.unwrap();

    let path = uri.trim_start_matches("file://");
    assert_eq!(fs.read(std::path::Path::new(path)).unwrap().as_ref(), b"12345678");
}

#[tokio::test]
async fn test_existing_file_is_reused_by_a_new_cache() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let downloader = Arc::new(ScriptedDownloader::new(fs.clone(), b"song"));
    let track = track("kept");

    let first = local_cache(fs.clone(), downloader.clone(), 1);
    let uri = first.resolve(&track).await.unwrap();

    let mut never = MockDownloader::new();
    never.expect_download().never();
    let second = local_cache(fs, Arc::new(never), 1);

    assert!(!second.is_resolved(track.id()));
    assert_eq!(second.resolve(&track).await.unwrap(), uri);
    assert_eq!(downloader.calls(), 1);
}

#[tokio::test]
async fn test_download_events_are_published() {
    let fs = Arc::new(InMemoryFileSystem::new());
    let downloader = Arc::new(ScriptedDownloader::new(fs.clone(), b"0123456789"));
    let bus = EventBus::new(32);
    let mut events = EventStream::new(bus.subscribe());
    let cache = local_cache(fs, downloader, 1).with_event_bus(bus);

    cache.resolve(&track("evented")).await.unwrap();

    let received = support::drain(&mut events);
    assert_eq!(
        received.first(),
        Some(&CoreEvent::Download(DownloadEvent::Started {
            track_id: "evented".to_string(),
            resumed_from: 0,
        }))
    );
    assert!(received.contains(&CoreEvent::Download(DownloadEvent::Progress {
        track_id: "evented".to_string(),
        downloaded_bytes: 5,
        total_bytes: Some(10),
    })));
    assert_eq!(
        received.last(),
        Some(&CoreEvent::Download(DownloadEvent::Completed {
            track_id: "evented".to_string(),
            bytes: 10,
        }))
    );
}

#[tokio::test]
async fn test_remote_only_storage_never_transfers() {
    let mut never = MockDownloader::new();
    never.expect_download().never();

    let cache = DownloadCache::new(
        CacheConfig::remote_only(),
        None,
        Some(Arc::new(never) as Arc<dyn MediaDownloader>),
    )
    .unwrap();
    assert_eq!(cache.storage(), CacheStorage::RemoteOnly);

    let track = track("web");
    assert_eq!(
        cache.resolve(&track).await.unwrap(),
        "https://cdn.example.com/web.mp3"
    );
    assert!(cache.is_resolved(track.id()));
}
