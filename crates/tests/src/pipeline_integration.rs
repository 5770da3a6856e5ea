//! Integration tests for the equalizer pipeline
//!
//! These tests drive the real audio path (parameter store, stereo processor,
//! audio thread) and compare what it does against the analytic response the
//! display shows.

use contour_core::domain::{gain_to_db, ChainSettings, Effect, ParamId, ResponseAnalyzer, Slope};
use contour_infra::{AudioEngine, EqProcessor, ParameterStore, ResponseMonitor, StereoBlock};
use crossbeam::channel::bounded;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;

const SAMPLE_RATE: f64 = 48000.0;
const BLOCK: usize = 512;
const IMPULSE_LEN: usize = 16384;

fn generate_sine_wave(frequency: f64, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (std::f64::consts::TAU * frequency * i as f64 / SAMPLE_RATE).sin() as f32)
        .collect()
}

fn rms(samples: &[f32]) -> f64 {
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt()
}

fn processor_with(settings: &ChainSettings) -> EqProcessor {
    let store = Arc::new(ParameterStore::with_settings(settings));
    let mut processor = EqProcessor::new(store);
    processor.prepare(SAMPLE_RATE, BLOCK).unwrap();
    processor
}

/// Stereo impulse response of the real processor, block by block
fn impulse_response(processor: &mut EqProcessor) -> (Vec<f32>, Vec<f32>) {
    let mut left = vec![0.0f32; IMPULSE_LEN];
    let mut right = vec![0.0f32; IMPULSE_LEN];
    left[0] = 1.0;
    right[0] = 1.0;

    for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
        processor.process_block(l, r).unwrap();
    }
    (left, right)
}

/// Magnitude spectrum in dB for bins `0..=len/2`
fn measured_db(impulse: &[f32]) -> Vec<f64> {
    let mut buffer: Vec<Complex<f64>> = impulse
        .iter()
        .map(|&s| Complex::new(f64::from(s), 0.0))
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_forward(buffer.len()).process(&mut buffer);

    buffer[..=impulse.len() / 2]
        .iter()
        .map(|c| gain_to_db(c.norm()))
        .collect()
}

fn assert_measured_matches_analyzer(settings: &ChainSettings) {
    let mut processor = processor_with(settings);
    let (left, right) = impulse_response(&mut processor);
    assert_eq!(left, right, "channels diverged for {settings:?}");

    let measured = measured_db(&left);
    let mut analyzer = ResponseAnalyzer::new(SAMPLE_RATE).unwrap();
    let bin_hz = SAMPLE_RATE / IMPULSE_LEN as f64;

    let mut compared = 0;
    for (k, measured_db) in measured.iter().enumerate() {
        let freq = k as f64 * bin_hz;
        if !(30.0..=18000.0).contains(&freq) {
            continue;
        }
        let expected = analyzer.magnitude_db_at(settings, freq);
        // Passband and moderate stopband only; deep stopband is below f32 resolution
        if expected < -30.0 {
            continue;
        }
        assert!(
            (measured_db - expected).abs() < 0.5,
            "{freq:.1} Hz: measured {measured_db:.3} dB, analyzer {expected:.3} dB for {settings:?}"
        );
        compared += 1;
    }
    assert!(compared > 100, "too few bins compared for {settings:?}");
}

// ============================================================================
// MEASURED VS ANALYTIC RESPONSE
// ============================================================================

#[test]
fn test_measured_response_matches_analyzer_defaults() {
    assert_measured_matches_analyzer(&ChainSettings::default());
}

#[test]
fn test_measured_response_matches_analyzer_peak() {
    assert_measured_matches_analyzer(&ChainSettings {
        peak_freq: 1000.0,
        peak_gain_db: 12.0,
        peak_q: 4.0,
        ..Default::default()
    });
    assert_measured_matches_analyzer(&ChainSettings {
        peak_freq: 6000.0,
        peak_gain_db: -18.0,
        peak_q: 0.7,
        ..Default::default()
    });
}

#[test]
fn test_measured_response_matches_analyzer_cuts() {
    for slope in Slope::ALL {
        assert_measured_matches_analyzer(&ChainSettings {
            low_cut_freq: 200.0,
            low_cut_slope: slope,
            high_cut_freq: 8000.0,
            high_cut_slope: slope,
            ..Default::default()
        });
    }
}

// ============================================================================
// AUDIO PATH SCENARIOS
// ============================================================================

#[test]
fn test_low_cut_48_attenuates_1khz_by_40db() {
    let mut processor = processor_with(&ChainSettings {
        low_cut_freq: 5000.0,
        low_cut_slope: Slope::Db48,
        ..Default::default()
    });

    let input = generate_sine_wave(1000.0, 48000);
    let mut left = input.clone();
    let mut right = input.clone();
    for (l, r) in left.chunks_mut(BLOCK).zip(right.chunks_mut(BLOCK)) {
        processor.process_block(l, r).unwrap();
    }

    let attenuation = gain_to_db(rms(&left[4800..]) / rms(&input[4800..]));
    assert!(attenuation < -40.0, "attenuation only {attenuation:.1} dB");
    assert_eq!(left, right);
}

#[test]
fn test_interleaved_and_planar_paths_agree() {
    let settings = ChainSettings {
        low_cut_freq: 90.0,
        low_cut_slope: Slope::Db24,
        peak_freq: 2500.0,
        peak_gain_db: 5.5,
        peak_q: 2.0,
        ..Default::default()
    };
    let mut planar = processor_with(&settings);
    let mut interleaved = processor_with(&settings);

    let left_in = generate_sine_wave(440.0, BLOCK);
    let right_in = generate_sine_wave(3000.0, BLOCK);

    let mut left = left_in.clone();
    let mut right = right_in.clone();
    planar.process_block(&mut left, &mut right).unwrap();

    let mut buffer = StereoBlock::from_channels(left_in, right_in).to_interleaved();
    interleaved.process(&mut buffer).unwrap();

    let output = StereoBlock::from_interleaved(&buffer);
    assert_eq!(output.left, left);
    assert_eq!(output.right, right);
}

#[test]
fn test_slope_changes_mid_stream_stay_bounded() {
    let store = Arc::new(ParameterStore::new());
    store.set(ParamId::LowCutFreq, 300.0);
    let mut processor = EqProcessor::new(Arc::clone(&store));
    processor.prepare(SAMPLE_RATE, BLOCK).unwrap();

    let input = generate_sine_wave(1000.0, BLOCK);
    for i in 0..64 {
        store.set(ParamId::LowCutSlope, (i % 4) as f32);
        store.set(ParamId::HighCutSlope, (3 - i % 4) as f32);
        let mut left = input.clone();
        let mut right = input.clone();
        processor.process_block(&mut left, &mut right).unwrap();
        assert!(left.iter().all(|s| s.is_finite() && s.abs() < 16.0));
        assert_eq!(left, right);
    }
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[test]
fn test_engine_with_concurrent_parameter_writes() {
    let store = Arc::new(ParameterStore::new());
    let mut processor = EqProcessor::new(Arc::clone(&store));
    processor.prepare(SAMPLE_RATE, BLOCK).unwrap();

    let (in_tx, in_rx) = bounded(4);
    let (out_tx, out_rx) = bounded(4);
    let engine = AudioEngine::start(processor, in_rx, out_tx).unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let writer = {
        let store = Arc::clone(&store);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut step = 0u32;
            while running.load(Ordering::Relaxed) {
                let p = (step % 100) as f32 / 100.0;
                store.set_normalized(ParamId::LowCutFreq, p * 0.5);
                store.set_normalized(ParamId::HighCutFreq, 0.5 + p * 0.5);
                store.set_normalized(ParamId::PeakFreq, p);
                store.set_normalized(ParamId::PeakGain, 1.0 - p);
                store.set_normalized(ParamId::PeakQuality, p);
                store.set(ParamId::LowCutSlope, (step % 4) as f32);
                store.set(ParamId::HighCutSlope, ((step / 4) % 4) as f32);
                step = step.wrapping_add(1);
            }
        })
    };

    let input = generate_sine_wave(1000.0, BLOCK);
    for _ in 0..200 {
        in_tx
            .send(StereoBlock::from_channels(input.clone(), input.clone()))
            .unwrap();
        let output = out_rx.recv().unwrap();
        assert!(output.left.iter().all(|s| s.is_finite()));
        // One snapshot per block: both channels always see the same settings
        assert_eq!(output.left, output.right);
    }

    running.store(false, Ordering::Relaxed);
    writer.join().unwrap();
    drop(in_tx);

    let stats = engine.join().unwrap();
    assert_eq!(stats.blocks_processed, 200);
    assert_eq!(stats.samples_processed, 200 * BLOCK as u64);
    assert_eq!(stats.processing_errors, 0);
    assert!(store.snapshot().is_within_domain());
}

#[test]
fn test_monitor_reflects_store_while_audio_runs() {
    let store = Arc::new(ParameterStore::new());
    let mut processor = EqProcessor::new(Arc::clone(&store));
    processor.prepare(SAMPLE_RATE, BLOCK).unwrap();
    let mut monitor = ResponseMonitor::new(Arc::clone(&store), SAMPLE_RATE).unwrap();

    assert!(monitor.refresh(400).is_some());
    store.set(ParamId::PeakFreq, 1000.0);
    store.set(ParamId::PeakGain, 9.0);
    store.set(ParamId::PeakQuality, 0.5);

    let mut left = generate_sine_wave(1000.0, BLOCK);
    let mut right = left.clone();
    processor.process_block(&mut left, &mut right).unwrap();

    let response = monitor.refresh(400).unwrap().to_vec();
    let curve = monitor.curve();
    let at_peak = curve.nearest(1000.0).unwrap();
    assert!((at_peak - 9.0).abs() < 0.2, "{at_peak} dB at the peak");
    assert_eq!(curve.magnitudes_db, response);

    // The processor's own chain agrees with what the display shows
    let chain_db = gain_to_db(processor.left().magnitude_for_frequency(1000.0, SAMPLE_RATE));
    assert!((chain_db - 9.0).abs() < 0.05);
}

#[tokio::test]
async fn test_monitor_task_publishes_changes() {
    let store = Arc::new(ParameterStore::new());
    let monitor = ResponseMonitor::new(Arc::clone(&store), SAMPLE_RATE).unwrap();
    let (curve_tx, curve_rx) = bounded(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(monitor.run(Duration::from_millis(2), 128, curve_tx, shutdown_rx));

    let initial = tokio::task::spawn_blocking({
        let curve_rx = curve_rx.clone();
        move || curve_rx.recv().unwrap()
    })
    .await
    .unwrap();
    assert!(initial.magnitudes_db.iter().all(|db| db.abs() < 3.1));

    store.set(ParamId::HighCutFreq, 1000.0);
    store.set(ParamId::HighCutSlope, 3.0);

    let updated = tokio::task::spawn_blocking(move || {
        // Wait for a curve showing the new high cut
        loop {
            let curve = curve_rx.recv().unwrap();
            if curve.nearest(10000.0).unwrap() < -60.0 {
                return curve;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(updated.len(), 128);

    shutdown_tx.send(true).unwrap();
    let published = task.await.unwrap();
    assert!(published >= 2);
}
