//! Throughput over a synthetic fragmented document: many single-segment
//! blocks sharing a handful of prefixes, the shape the engine exists for.

use std::hint::black_box;

use core_engine::{Options, clean_document};
use criterion::{Criterion, criterion_group, criterion_main};

fn fragmented_doc(blocks: usize) -> String {
    let mut s = String::from("%!PS-Adobe-3.0 EPSF-3.0\n%%EndPageSetup\n");
    for i in 0..blocks {
        let prefix = match i % 3 {
            0 => "1 setlinewidth",
            1 => "2 setlinewidth",
            _ => "0 0 1 setrgbcolor",
        };
        let x = i / 3;
        s.push_str(&format!(
            "GS\n{prefix}\nN\n{x} 0 M\n{} 0 L\nS\nGR\n",
            x + 1
        ));
    }
    s.push_str("%%Trailer\n%%EOF\n");
    s
}

fn fill_doc(squares: usize) -> String {
    let mut s = String::from("%!PS-Adobe-3.0 EPSF-3.0\n%%EndPageSetup\n");
    for x in 0..squares {
        s.push_str(&format!(
            "GS\n0.5 setgray\nN\n{x} 0 M\n{x1} 0 L\n{x1} 1 L\n{x} 1 L\ncp\nf\nGR\n",
            x1 = x + 1
        ));
    }
    s.push_str("%%Trailer\n%%EOF\n");
    s
}

fn bench_group_strokes(c: &mut Criterion) {
    let doc = fragmented_doc(3000);
    c.bench_function("group_3000_stroke_blocks", |b| {
        b.iter(|| clean_document(black_box(&doc), &Options::default()))
    });
}

fn bench_merge_fills(c: &mut Criterion) {
    let doc = fill_doc(500);
    let opts = Options {
        combine_areas: true,
        ..Options::default()
    };
    c.bench_function("merge_500_fill_squares", |b| {
        b.iter(|| clean_document(black_box(&doc), &opts))
    });
}

criterion_group!(benches, bench_group_strokes, bench_merge_fills);
criterion_main!(benches);
