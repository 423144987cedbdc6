//! Performance benchmarks for transcription

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stratum_transcribe::{transcribe_audio, TranscriptionConfig, TranscriptionMode};

/// Arpeggio of 0.25 s notes
fn arpeggio(seconds: f32) -> Vec<f32> {
    let sr = 44100.0;
    let pitches = [60.0f32, 64.0, 67.0, 72.0];
    (0..(seconds * sr) as usize)
        .map(|i| {
            let t = i as f32 / sr;
            let pitch = pitches[(t / 0.25) as usize % pitches.len()];
            let freq = 440.0 * 2f32.powf((pitch - 69.0) / 12.0);
            (t * freq * 2.0 * std::f32::consts::PI).sin() * 0.5
        })
        .collect()
}

fn bench_transcribe_audio(c: &mut Criterion) {
    let samples = arpeggio(10.0);

    for mode in [
        TranscriptionMode::Consolidation,
        TranscriptionMode::Onset,
        TranscriptionMode::Polyphonic,
    ] {
        let config = TranscriptionConfig {
            mode,
            ..Default::default()
        };
        c.bench_function(&format!("transcribe_10s_{}", mode.name()), |b| {
            b.iter(|| {
                let _ = transcribe_audio(black_box(&samples), black_box(44100), black_box(config.clone()));
            });
        });
    }
}

criterion_group!(benches, bench_transcribe_audio);
criterion_main!(benches);
