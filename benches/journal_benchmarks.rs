// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the Tidemark journal write path

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tidemark_journal::{
    decode_frame, JournalConf, JournalEntry, JournalReader, UfsJournal, UfsJournalLogWriter,
};
use tidemark_ufs::MemoryUfs;

fn bench_conf(max_log_size_bytes: u64) -> JournalConf {
    JournalConf {
        max_log_size_bytes,
        gc_enabled: false,
        ..JournalConf::default()
    }
}

// ============================================================================
// Entry Codec Benchmarks
// ============================================================================

fn bench_entry_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry");

    for size in [16usize, 256, 4096].iter() {
        let entry = JournalEntry::new(vec![0xA5; *size]).with_sequence_number(42);
        let frame = entry.encode();
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &entry, |b, entry| {
            b.iter(|| black_box(entry.encode()))
        });

        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, frame| {
            b.iter(|| black_box(decode_frame(frame).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// Writer Benchmarks
// ============================================================================

fn bench_write_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("writer");
    group.throughput(Throughput::Elements(1000));

    for max_log_size in [4 * 1024u64, 10 * 1024 * 1024].iter() {
        group.bench_with_input(
            BenchmarkId::new("write_1000_flush", max_log_size),
            max_log_size,
            |b, &max_log_size| {
                b.iter(|| {
                    let journal = UfsJournal::with_conf(
                        Arc::new(MemoryUfs::new()),
                        "/bench",
                        bench_conf(max_log_size),
                    );
                    let writer = UfsJournalLogWriter::new(journal, 0).unwrap();
                    for i in 0..1000u32 {
                        let payload = format!("rename /dir/file-{} /dir/file-{}", i, i + 1);
                        writer.write(JournalEntry::new(payload.into_bytes())).unwrap();
                    }
                    writer.flush().unwrap();
                    writer.close().unwrap();
                    black_box(writer.next_sequence_number())
                });
            },
        );
    }

    group.bench_function("object_store_write_flush", |b| {
        let journal = UfsJournal::with_conf(
            Arc::new(MemoryUfs::object_store()),
            "/bench",
            bench_conf(10 * 1024 * 1024),
        );
        let writer = UfsJournalLogWriter::new(journal, 0).unwrap();
        b.iter(|| {
            let seq = writer
                .write(JournalEntry::new(b"setattr /a mode=0644".to_vec()))
                .unwrap();
            writer.flush().unwrap();
            black_box(seq)
        });
    });

    group.finish();
}

// ============================================================================
// Reader Benchmarks
// ============================================================================

fn bench_replay(c: &mut Criterion) {
    let journal = UfsJournal::with_conf(Arc::new(MemoryUfs::new()), "/bench", bench_conf(64 * 1024));
    let writer = UfsJournalLogWriter::new(journal.clone(), 0).unwrap();
    for i in 0..10_000u32 {
        writer
            .write(JournalEntry::new(format!("create /f{}", i).into_bytes()))
            .unwrap();
    }
    writer.close().unwrap();

    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("read_all_10000", |b| {
        b.iter(|| {
            let entries = JournalReader::open(&journal, 0, false)
                .unwrap()
                .read_all()
                .unwrap();
            black_box(entries.len())
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark Groups
// ============================================================================

criterion_group!(codec_benches, bench_entry_codec);

criterion_group!(writer_benches, bench_write_flush);

criterion_group!(reader_benches, bench_replay);

criterion_main!(codec_benches, writer_benches, reader_benches);
