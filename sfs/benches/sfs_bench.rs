use criterion::{Criterion, criterion_group, criterion_main};

use sfs::prelude::*;

criterion_group!(benches, sfs_bench, sfs_file_bench);
criterion_main!(benches);

pub fn sfs_bench(c: &mut Criterion) {
    let meta = SfsMeta::default();
    let data: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    let mut buf = vec![0u8; meta.size_bytes() as usize];

    c.bench_function("sfs_format_mem", |b| {
        b.iter(|| {
            let mut io = MemBlockIO::new(&mut buf);
            let mut formatter = SfsFormatter::new(&mut io, &meta);
            formatter.format(false).expect("format failed");
        });
    });

    c.bench_function("sfs_write_read_64k_mem", |b| {
        b.iter(|| {
            let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).expect("format failed");
            let fd = fs.open("bench").expect("open failed");
            fs.write_all(fd, &data).expect("write failed");
            let out = fs.read_to_vec(fd).expect("read failed");
            assert_eq!(out.len(), data.len());
        });
    });

    c.bench_function("sfs_create_remove_mem", |b| {
        let mut fs = Sfs::format(MemBlockIO::new(&mut buf), meta).expect("format failed");
        b.iter(|| {
            let fd = fs.open("tmp").expect("open failed");
            fs.write_all(fd, &data[..4096]).expect("write failed");
            fs.remove("tmp").expect("remove failed");
        });
    });
}

pub fn sfs_file_bench(c: &mut Criterion) {
    let meta = SfsMeta::default();
    let data: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();

    let mut file = tempfile::tempfile().expect("tempfile failed");
    file.set_len(meta.size_bytes()).expect("set_len failed");

    c.bench_function("sfs_write_read_64k_file", |b| {
        b.iter(|| {
            let mut fs = Sfs::format(StdBlockIO::new(&mut file), meta).expect("format failed");
            let fd = fs.open("bench").expect("open failed");
            fs.write_all(fd, &data).expect("write failed");
            let out = fs.read_to_vec(fd).expect("read failed");
            assert_eq!(out.len(), data.len());
        });
    });
}
