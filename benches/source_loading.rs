use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flate2::{write::GzEncoder, Compression};
use rltail::source::{LocalFileHandle, SourceLoader};
use std::io::Write;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::runtime::Runtime;

fn log_content(size_kb: usize) -> Vec<u8> {
    let target_size = size_kb * 1024;
    let mut content = Vec::with_capacity(target_size);
    let mut line_num = 0;

    while content.len() < target_size {
        let log_line = format!(
            "[2024-09-02T10:{:02}:{:02}] INFO: Request {} user_{}\n",
            (line_num / 60) % 60,
            line_num % 60,
            line_num,
            line_num % 1000
        );
        content.extend_from_slice(log_line.as_bytes());
        line_num += 1;
    }
    content
}

fn create_test_file(size_kb: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(&log_content(size_kb)).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

fn create_compressed_test_file(size_kb: usize) -> NamedTempFile {
    let compressed_file = NamedTempFile::new().unwrap();
    let file = std::fs::File::create(compressed_file.path()).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&log_content(size_kb)).unwrap();
    encoder.finish().unwrap();
    compressed_file
}

fn bench_open(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("open_and_probe");
    group.sample_size(20);

    for &size_kb in &[50usize, 5000] {
        let plain = create_test_file(size_kb);
        let packed = create_compressed_test_file(size_kb);

        group.bench_with_input(BenchmarkId::new("plain", size_kb), &plain, |b, file| {
            b.to_async(&rt).iter(|| async {
                let loader = SourceLoader::open(LocalFileHandle::new(file.path()))
                    .await
                    .unwrap();
                black_box(loader.probe_sample().len())
            })
        });

        group.bench_with_input(BenchmarkId::new("gzip", size_kb), &packed, |b, file| {
            b.to_async(&rt).iter(|| async {
                let loader = SourceLoader::open(LocalFileHandle::new(file.path()))
                    .await
                    .unwrap();
                black_box(loader.probe_sample().len())
            })
        });
    }
    group.finish();
}

fn bench_full_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("full_read");
    group.sample_size(10);

    let packed = create_compressed_test_file(5000);
    group.bench_function("gzip_5MB", |b| {
        b.to_async(&rt).iter(|| async {
            let mut loader = SourceLoader::open(LocalFileHandle::new(packed.path()))
                .await
                .unwrap();
            let mut sink = Vec::new();
            loader.content_stream().read_to_end(&mut sink).await.unwrap();
            black_box(sink.len())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_open, bench_full_read);
criterion_main!(benches);
