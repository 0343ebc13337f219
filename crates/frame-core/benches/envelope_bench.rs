//! Criterion benchmarks for inbound envelope handling.
//!
//! Every message posted to the window passes through the authenticator, most
//! of it foreign traffic that must be dropped cheaply.  These benchmarks cover
//! the filter on its own and the filter followed by the envelope parse.
//!
//! Run with:
//! ```bash
//! cargo bench --package frame-core --bench envelope_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use frame_core::protocol::{ChannelAuthenticator, Envelope, DEFAULT_CONTEXT_TAG};
use frame_core::session::SessionToken;
use serde_json::{json, Value};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn fixed_token() -> SessionToken {
    SessionToken::generate_with(|buf| {
        buf.fill(0x5A);
        Ok(())
    })
    .expect("fixed filler cannot fail")
}

fn make_foreign() -> Value {
    json!({"source": "react-devtools-bridge", "payload": {"event": "ping"}})
}

fn make_sibling(token: &SessionToken) -> Value {
    json!({
        "context": DEFAULT_CONTEXT_TAG,
        "type": "action",
        "name": "zoom_to_fit",
        "target": format!("{}-sibling", token.as_str()),
    })
}

fn make_zoom_to_fit(token: &SessionToken) -> Value {
    json!({
        "context": DEFAULT_CONTEXT_TAG,
        "type": "action",
        "name": "zoom_to_fit",
        "target": token.as_str(),
    })
}

fn make_hide_annotations(token: &SessionToken) -> Value {
    let ids: Vec<String> = (0..50).map(|i| format!("{i}:{}", i + 1)).collect();
    json!({
        "context": DEFAULT_CONTEXT_TAG,
        "type": "action",
        "name": "hide_annotations",
        "payload": {"annotationIds": ids},
        "target": token.as_str(),
    })
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `ChannelAuthenticator::accept` for accepted and rejected input.
fn bench_accept(c: &mut Criterion) {
    let token = fixed_token();
    let auth = ChannelAuthenticator::new(DEFAULT_CONTEXT_TAG, token.clone());
    let messages: &[(&str, Value)] = &[
        ("foreign", make_foreign()),
        ("sibling", make_sibling(&token)),
        ("zoom_to_fit", make_zoom_to_fit(&token)),
        ("hide_annotations(50)", make_hide_annotations(&token)),
    ];

    let mut group = c.benchmark_group("accept");
    for (name, msg) in messages {
        group.bench_with_input(BenchmarkId::new("msg", name), msg, |b, msg| {
            b.iter(|| auth.accept(black_box(msg)))
        });
    }
    group.finish();
}

/// Benchmarks parsing a text frame, filtering it and reading the envelope.
fn bench_text_to_envelope(c: &mut Criterion) {
    let token = fixed_token();
    let auth = ChannelAuthenticator::new(DEFAULT_CONTEXT_TAG, token.clone());
    let frames: &[(&str, String)] = &[
        ("zoom_to_fit", make_zoom_to_fit(&token).to_string()),
        ("hide_annotations(50)", make_hide_annotations(&token).to_string()),
    ];

    let mut group = c.benchmark_group("text_to_envelope");
    for (name, text) in frames {
        group.bench_with_input(BenchmarkId::new("frame", name), text, |b, text| {
            b.iter(|| {
                let value: Value = serde_json::from_str(black_box(text)).unwrap();
                assert!(auth.accept(&value));
                Envelope::from_value(value).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_accept, bench_text_to_envelope);
criterion_main!(benches);
