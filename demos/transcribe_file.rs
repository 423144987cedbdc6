//! Example: Transcribe a WAV file
//!
//! Usage:
//!   cargo run --release --example transcribe_file -- [--mode consolidation|onset|polyphonic] [--quantize] [--json] <file.wav>

use std::env;
use stratum_transcribe::{
    transcribe_interleaved, MidiExport, MidiExportOptions, NotationExport, TranscriptionConfig,
    TranscriptionMode,
};

/// Read a WAV file as interleaved f32 samples
fn load_wav(path: &str) -> Result<(Vec<f32>, usize, u32), Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, spec.channels as usize, spec.sample_rate))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = TranscriptionConfig::default();
    let mut json = false;
    let mut path = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--quantize" => config.quantize = true,
            "--mode" => {
                config.mode = match args.next().as_deref() {
                    Some("consolidation") => TranscriptionMode::Consolidation,
                    Some("onset") => TranscriptionMode::Onset,
                    Some("polyphonic") => TranscriptionMode::Polyphonic,
                    other => return Err(format!("unknown mode {:?}", other).into()),
                }
            }
            _ => path = Some(arg),
        }
    }
    let path = path.ok_or("usage: transcribe_file [--mode M] [--quantize] [--json] <file.wav>")?;

    let (samples, channels, sample_rate) = load_wav(&path)?;
    let result = transcribe_interleaved(&samples, channels, sample_rate, config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Transcription of {}:", path);
    println!(
        "  Tempo: {:.1} BPM (confidence: {:.2}), meter {}",
        result.beat_grid.tempo_bpm,
        result.metadata.tempo_confidence,
        result.beat_grid.time_signature
    );
    println!(
        "  Key: {} (confidence: {:.2}, consistency: {:.2})",
        result.key.name(),
        result.key.confidence,
        result.key_consistency
    );
    if let Some(instrument) = &result.instrument {
        println!(
            "  Instrument: {} (confidence: {:.2})",
            instrument.instrument, instrument.confidence
        );
    }
    println!("  Notes: {}", result.notes.len());
    for note in result.notes.iter().take(20) {
        println!(
            "    {:<4} {:>8.3}s  {:>6.3}s  vel {}",
            note.name(),
            note.onset,
            note.duration,
            note.velocity
        );
    }
    let chords: Vec<String> = result.chords.iter().map(|c| c.name()).collect();
    println!("  Chords: {}", chords.join(" "));

    let midi = MidiExport::from_result(
        &result,
        &MidiExportOptions {
            metronome: true,
            chord_track: true,
            program_override: None,
        },
    )?;
    let notation = NotationExport::from_result(&result);
    println!(
        "  Export: {} MIDI tracks, {} measures",
        midi.tracks.len(),
        notation.measures.len()
    );

    for warning in &result.metadata.confidence_warnings {
        println!("  Warning: {}", warning);
    }
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);

    Ok(())
}
