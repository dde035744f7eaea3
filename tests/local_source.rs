use std::fs::OpenOptions;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;

use rltail::source::{LocalFileHandle, OpenMode, SizeChange, SourceLoader};
use rltail::RltailError;

fn log_lines(count: usize) -> Vec<u8> {
    (0..count)
        .flat_map(|i| format!("[2024-09-02T10:00:{:02}] INFO request {}\n", i % 60, i).into_bytes())
        .collect()
}

fn create_test_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(content).expect("write test content");
    file.flush().expect("flush test file");
    file
}

fn create_gzip_file(content: &[u8]) -> NamedTempFile {
    let file = NamedTempFile::new().expect("create temp file");
    let mut encoder = GzEncoder::new(
        std::fs::File::create(file.path()).expect("open temp file"),
        Compression::default(),
    );
    encoder.write_all(content).expect("compress content");
    encoder.finish().expect("finish gzip stream");
    file
}

fn append(file: &NamedTempFile, bytes: &[u8]) {
    let mut handle = OpenOptions::new()
        .append(true)
        .open(file.path())
        .expect("open for append");
    handle.write_all(bytes).expect("append bytes");
    handle.flush().expect("flush append");
}

async fn drain(loader: &mut SourceLoader) -> Vec<u8> {
    let mut out = Vec::new();
    loader
        .content_stream()
        .read_to_end(&mut out)
        .await
        .expect("read content");
    out
}

#[tokio::test]
async fn plain_file_is_read_from_start() {
    let content = log_lines(500);
    let file = create_test_file(&content);

    let mut loader = SourceLoader::open(LocalFileHandle::new(file.path()))
        .await
        .expect("open loader");

    assert!(!loader.is_compressed());
    assert_eq!(loader.probe_sample(), &content[..10_000]);
    assert_eq!(loader.last_known_size(), content.len() as u64);
    assert_eq!(loader.location(), file.path().display().to_string());
    assert_eq!(drain(&mut loader).await, content);
}

#[tokio::test]
async fn gzip_file_is_decoded() {
    let content = log_lines(800);
    let file = create_gzip_file(&content);

    let mut loader = SourceLoader::open(LocalFileHandle::new(file.path()))
        .await
        .expect("open loader");

    assert!(loader.is_compressed());
    assert_eq!(loader.probe_sample(), &content[..10_000]);
    assert_eq!(drain(&mut loader).await, content);
}

#[tokio::test]
async fn from_end_only_delivers_appended_bytes() {
    let file = create_test_file(&log_lines(20));

    let mut loader = SourceLoader::open_tailing(LocalFileHandle::new(file.path()), OpenMode::FromEnd)
        .await
        .expect("open loader");
    assert!(loader.is_tailing());

    let mut buf = [0u8; 256];
    let n = loader.content_stream().read(&mut buf).await.expect("read at end");
    assert_eq!(n, 0);

    append(&file, b"new entry\n");
    assert_eq!(drain(&mut loader).await, b"new entry\n");
}

#[tokio::test]
async fn growth_is_followed_from_last_known_size() {
    let file = create_test_file(&vec![b'a'; 100]);

    let mut loader =
        SourceLoader::open_tailing(LocalFileHandle::new(file.path()), OpenMode::FromStart)
            .await
            .expect("open loader");
    assert_eq!(drain(&mut loader).await.len(), 100);

    let appended = vec![b'b'; 50];
    append(&file, &appended);

    let change = loader.reload_if_changed().await.expect("reconcile");
    assert_eq!(change, SizeChange::Grown { from: 100, to: 150 });
    assert_eq!(loader.last_known_size(), 150);
    assert_eq!(drain(&mut loader).await, appended);
    assert_eq!(loader.bytes_read(), 150);
}

#[tokio::test]
async fn rotation_restarts_from_beginning() {
    let file = create_test_file(&vec![b'o'; 150]);

    let mut loader =
        SourceLoader::open_tailing(LocalFileHandle::new(file.path()), OpenMode::FromEnd)
            .await
            .expect("open loader");
    assert_eq!(loader.last_known_size(), 150);

    let rotated = vec![b'n'; 20];
    std::fs::write(file.path(), &rotated).expect("rotate file");

    let change = loader.reload_if_changed().await.expect("reconcile");
    assert_eq!(change, SizeChange::Shrunk { from: 150, to: 20 });
    assert_eq!(loader.last_known_size(), 20);
    assert_eq!(loader.bytes_read(), 0);
    assert_eq!(drain(&mut loader).await, rotated);
}

#[tokio::test]
async fn repeated_reconcile_without_change_is_noop() {
    let content = log_lines(10);
    let file = create_test_file(&content);

    let mut loader =
        SourceLoader::open_tailing(LocalFileHandle::new(file.path()), OpenMode::FromStart)
            .await
            .expect("open loader");

    for _ in 0..2 {
        assert_eq!(
            loader.reload_if_changed().await.expect("reconcile"),
            SizeChange::Unchanged
        );
        assert_eq!(loader.last_known_size(), content.len() as u64);
    }
    assert_eq!(drain(&mut loader).await, content);
}

#[tokio::test]
async fn missing_file_fails_to_open() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let result = SourceLoader::open(LocalFileHandle::new(dir.path().join("missing.log"))).await;

    match result {
        Err(RltailError::Io { message, .. }) => assert!(message.contains("Failed to open file")),
        other => panic!("Expected Io error, got {:?}", other.map(|_| ())),
    }
}
