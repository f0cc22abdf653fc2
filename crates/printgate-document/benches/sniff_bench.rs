// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for content sniffing in the printgate-document crate.
// Binary signatures hit the fast path; plain text has to scan the whole
// sniff window, which is the worst case per upload.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use printgate_document::sniff::{SNIFF_LEN, sniff_bytes};

fn bench_sniff_pdf(c: &mut Criterion) {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.resize(SNIFF_LEN, b' ');
    c.bench_function("sniff_pdf_signature", |b| {
        b.iter(|| sniff_bytes(black_box(&data)));
    });
}

fn bench_sniff_text(c: &mut Criterion) {
    let line = "The quick brown fox jumps over the lazy dog.\n";
    let data = line.repeat(SNIFF_LEN / line.len() + 1).into_bytes();
    c.bench_function("sniff_plain_text_window", |b| {
        b.iter(|| sniff_bytes(black_box(&data)));
    });
}

fn bench_sniff_unknown(c: &mut Criterion) {
    let data: Vec<u8> = (0..SNIFF_LEN).map(|i| (i % 251) as u8).collect();
    c.bench_function("sniff_unknown_binary", |b| {
        b.iter(|| sniff_bytes(black_box(&data)));
    });
}

criterion_group!(benches, bench_sniff_pdf, bench_sniff_text, bench_sniff_unknown);
criterion_main!(benches);
