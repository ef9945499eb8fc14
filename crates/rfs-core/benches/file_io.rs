//! Benchmark: sequential file I/O and path lookup on a RAM volume.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rfs_core::RamFs;
use rfs_types::{FsConfig, OpenFlags, SeekWhence};

const QUOTA: u64 = 8 * 1024 * 1024;
const BLOCK: u32 = 4096;

fn bench_sequential_write_read(c: &mut Criterion) {
    let payload = vec![0xA5_u8; 64 * 1024];

    let mut group = c.benchmark_group("sequential_64k");

    group.bench_function("write", |b| {
        b.iter(|| {
            let fs = RamFs::mount(FsConfig::new(QUOTA, BLOCK).unwrap());
            let mut h = fs
                .file_open("/bench", OpenFlags::RDWR | OpenFlags::CREATE)
                .unwrap();
            black_box(fs.file_write(&mut h, black_box(&payload)).unwrap());
            fs.file_close(h).unwrap();
        });
    });

    group.bench_function("read", |b| {
        let fs = RamFs::mount(FsConfig::new(QUOTA, BLOCK).unwrap());
        let mut h = fs
            .file_open("/bench", OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.file_write(&mut h, &payload).unwrap();
        let mut buf = vec![0_u8; payload.len()];

        b.iter(|| {
            fs.file_seek(&mut h, 0, SeekWhence::Set).unwrap();
            black_box(fs.file_read(&mut h, black_box(&mut buf)).unwrap());
        });
    });

    group.finish();
}

fn bench_path_lookup(c: &mut Criterion) {
    let fs = RamFs::mount(FsConfig::new(QUOTA, BLOCK).unwrap());
    fs.mkdir("/dir").unwrap();
    // Linear name scan: the last entry is the worst case.
    for i in 0..100 {
        let h = fs
            .file_open(&format!("/dir/file{i:02}"), OpenFlags::RDWR | OpenFlags::CREATE)
            .unwrap();
        fs.file_close(h).unwrap();
    }

    c.bench_function("stat_last_of_100", |b| {
        b.iter(|| black_box(fs.stat(black_box("/dir/file99")).unwrap()));
    });
}

criterion_group!(benches, bench_sequential_write_read, bench_path_lookup);
criterion_main!(benches);
