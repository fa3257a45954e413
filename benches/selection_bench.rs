use criterion::{black_box, criterion_group, criterion_main, Criterion};
use keyword_clipper::{find_matches, plan_clips, select_windows, SrtDocument, TimedSegment};

/// Three hours of speech in four-second segments, with the keyword in
/// every seventh segment
fn synthetic_transcript() -> Vec<TimedSegment> {
    (0..2700)
        .map(|i| {
            let start = i as f64 * 4.0;
            let text = if i % 7 == 0 {
                "Now pull them into your closed Guard and break posture"
            } else {
                "Keep your elbows tight and your hips moving"
            };
            TimedSegment::new(start, start + 4.0, text)
        })
        .collect()
}

/// Benchmark keyword matching
fn bench_matching(c: &mut Criterion) {
    let segments = synthetic_transcript();

    c.bench_function("find_matches", |b| {
        b.iter(|| find_matches(black_box(&segments), black_box("guard")))
    });
}

/// Benchmark window selection and planning
fn bench_selection(c: &mut Criterion) {
    let segments = synthetic_transcript();
    let matches = find_matches(&segments, "guard").unwrap();
    let media_duration = segments.len() as f64 * 4.0;

    c.bench_function("select_and_plan", |b| {
        b.iter(|| {
            let windows = select_windows(black_box(&matches), 90.0, media_duration).unwrap();
            plan_clips(&windows, false, "mp4")
        })
    });
}

/// Benchmark SRT rendering
fn bench_subtitles(c: &mut Criterion) {
    let segments = synthetic_transcript();

    c.bench_function("srt_render", |b| {
        b.iter(|| SrtDocument::from_segments(black_box(&segments)).render())
    });
}

criterion_group!(benches, bench_matching, bench_selection, bench_subtitles);
criterion_main!(benches);
