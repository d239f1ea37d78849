use criterion::{black_box, criterion_group, criterion_main, Criterion};

use streamchat_rs::stream::{classify_line, LineReader};

fn sse_body(lines: usize, content_len: usize) -> Vec<u8> {
    let token = "x".repeat(content_len);
    let mut body = String::with_capacity(lines * (content_len + 48));
    for _ in 0..lines {
        body.push_str("data: {\"choices\":[{\"delta\":{\"content\":\"");
        body.push_str(&token);
        body.push_str("\"}}]}\n");
    }
    body.into_bytes()
}

fn bench_line_reader(c: &mut Criterion) {
    let small_tokens = sse_body(512, 8);
    let long_line = sse_body(4, 64 * 1024);

    c.bench_function("feed_512_short_lines_1500b_chunks", |b| {
        b.iter(|| {
            let mut reader = LineReader::new();
            let mut lines = Vec::with_capacity(16);
            let mut total = 0usize;
            for chunk in small_tokens.chunks(1500) {
                reader.feed_into(black_box(chunk), &mut lines);
                total += lines.len();
                lines.clear();
            }
            black_box(total)
        });
    });

    c.bench_function("feed_long_lines_spanning_chunks", |b| {
        b.iter(|| {
            let mut reader = LineReader::new();
            let mut lines = Vec::with_capacity(4);
            let mut total = 0usize;
            for chunk in long_line.chunks(1500) {
                reader.feed_into(black_box(chunk), &mut lines);
                total += lines.len();
                lines.clear();
            }
            black_box(total)
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    let delta = "data: {\"choices\":[{\"delta\":{\"content\":\"hello world\"}}]}";
    let text = "data: plain text token";
    let done = "data: [DONE]";

    c.bench_function("classify_delta_line", |b| {
        b.iter(|| black_box(classify_line(black_box(delta))));
    });
    c.bench_function("classify_text_and_done_lines", |b| {
        b.iter(|| {
            black_box(classify_line(black_box(text)));
            black_box(classify_line(black_box(done)));
        });
    });
}

criterion_group!(benches, bench_line_reader, bench_classify);
criterion_main!(benches);
