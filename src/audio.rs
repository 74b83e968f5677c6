// Procedural audio engine.
//
// Every sound is synthesized into a sample buffer at trigger time; there are
// no audio assets. The falling-bomb whistle is a sawtooth pitch drop pushed
// through a swept band-pass over a looping noise bed, retained per bomb so
// detonation can cut it short. The explosion layers an impact burst, a
// low-passed noise body with a sub-sine drop, an LFO-modulated rumble and a
// handful of high-passed crackle bursts.
//
// When no output device can be opened at startup the engine stays disabled
// and every call is a no-op: sound is not essential to simulation
// correctness.
use bevy::prelude::*;
use rand::Rng;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::collections::HashMap;
use std::f32::consts::TAU;

use crate::constants::*;
use crate::error::SimError;

/// Keeps the OS output stream alive for the lifetime of the app. Not Send,
/// so it lives apart from the engine as a non-send resource.
pub struct AudioOutputDevice {
    _stream: OutputStream,
}

#[derive(Resource)]
pub struct AudioEngine {
    handle: Option<OutputStreamHandle>,
    /// Retained voices by id: falling whistles (stopped early on impact) and
    /// explosion playbacks (released by a deferred task after their natural
    /// duration).
    voices: HashMap<u64, Sink>,
    next_voice: u64,
    /// The whistle is deterministic apart from its noise bed; rendered once.
    falling_samples: Vec<f32>,
}

impl AudioEngine {
    pub fn init() -> (Self, Option<AudioOutputDevice>) {
        match OutputStream::try_default() {
            Ok((stream, handle)) => {
                let mut rng = rand::thread_rng();
                let engine = Self {
                    handle: Some(handle),
                    voices: HashMap::new(),
                    next_voice: 0,
                    falling_samples: render_falling_sound(&mut rng),
                };
                (engine, Some(AudioOutputDevice { _stream: stream }))
            }
            Err(err) => {
                warn!(
                    "{}",
                    SimError::AudioUnavailable {
                        reason: err.to_string(),
                    }
                );
                (Self::disabled(), None)
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            handle: None,
            voices: HashMap::new(),
            next_voice: 0,
            falling_samples: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    fn play_retained(&mut self, samples: Vec<f32>, volume: f32) -> Option<u64> {
        let handle = self.handle.as_ref()?;
        let sink = Sink::try_new(handle).ok()?;
        sink.set_volume(volume);
        sink.append(SamplesBuffer::new(1, AUDIO_SAMPLE_RATE, samples));
        let id = self.next_voice;
        self.next_voice += 1;
        self.voices.insert(id, sink);
        Some(id)
    }

    /// Start the whistle for a newly launched bomb. The returned id lets the
    /// fall system stop this exact voice when its bomb detonates.
    pub fn start_falling_voice(&mut self) -> Option<u64> {
        if self.handle.is_none() {
            return None;
        }
        let samples = self.falling_samples.clone();
        self.play_retained(samples, 1.0)
    }

    /// Play a freshly synthesized explosion, volume scaled by the capped
    /// power factor. The caller schedules the voice release.
    pub fn play_explosion(&mut self, volume: f32) -> Option<u64> {
        if self.handle.is_none() {
            return None;
        }
        let mut rng = rand::thread_rng();
        let samples = render_explosion_sound(&mut rng);
        self.play_retained(samples, volume)
    }

    /// Cut a voice short (bomb detonated before its whistle finished).
    pub fn stop_voice(&mut self, id: u64) {
        if let Some(sink) = self.voices.remove(&id) {
            sink.stop();
        }
    }

    /// Drop a voice that has played out. Fired by the deferred task queue;
    /// harmless if the voice was already stopped.
    pub fn release_voice(&mut self, id: u64) {
        self.voices.remove(&id);
    }
}

// ===== SYNTHESIS =====

/// RBJ biquad filter; retuning keeps the delay-line state so swept filters
/// stay click-free.
struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    fn lowpass(fc: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        f.retune_lowpass(fc, q, sample_rate);
        f
    }

    fn highpass(fc: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        let (sin_w0, cos_w0) = (TAU * fc / sample_rate).sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        f.b0 = (1.0 + cos_w0) / 2.0 / a0;
        f.b1 = -(1.0 + cos_w0) / a0;
        f.b2 = (1.0 + cos_w0) / 2.0 / a0;
        f.a1 = -2.0 * cos_w0 / a0;
        f.a2 = (1.0 - alpha) / a0;
        f
    }

    fn bandpass(fc: f32, q: f32, sample_rate: f32) -> Self {
        let mut f = Self::new();
        f.retune_bandpass(fc, q, sample_rate);
        f
    }

    fn retune_lowpass(&mut self, fc: f32, q: f32, sample_rate: f32) {
        let (sin_w0, cos_w0) = (TAU * fc / sample_rate).sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        self.b0 = (1.0 - cos_w0) / 2.0 / a0;
        self.b1 = (1.0 - cos_w0) / a0;
        self.b2 = (1.0 - cos_w0) / 2.0 / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Constant 0 dB peak-gain band-pass.
    fn retune_bandpass(&mut self, fc: f32, q: f32, sample_rate: f32) {
        let (sin_w0, cos_w0) = (TAU * fc / sample_rate).sin_cos();
        let alpha = sin_w0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        self.b0 = alpha / a0;
        self.b1 = 0.0;
        self.b2 = -alpha / a0;
        self.a1 = -2.0 * cos_w0 / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    fn process(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

#[inline]
fn white(rng: &mut impl Rng) -> f32 {
    rng.gen::<f32>() * 2.0 - 1.0
}

/// Exponential ramp from `from` to `to` at normalized progress `t`.
#[inline]
fn exp_ramp(from: f32, to: f32, t: f32) -> f32 {
    from * (to / from).powf(t.clamp(0.0, 1.0))
}

/// The falling-bomb whistle: sawtooth sweeping 1300 -> 250 Hz through a
/// narrow band-pass gliding 1600 -> 400 Hz, over a quiet noise bed, with a
/// 0.6 s fade-in.
pub fn render_falling_sound(rng: &mut impl Rng) -> Vec<f32> {
    let sample_rate = AUDIO_SAMPLE_RATE as f32;
    let len = (FALLING_SOUND_SECS * sample_rate) as usize;
    let mut filter = Biquad::bandpass(1600.0, 18.0, sample_rate);
    let mut phase = 0.0f32;
    let mut out = Vec::with_capacity(len);

    for i in 0..len {
        let t = i as f32 / sample_rate;
        let sweep = (t / FALLING_SWEEP_SECS).min(1.0);

        let freq = 1300.0 * (250.0f32 / 1300.0).powf(sweep);
        phase = (phase + freq / sample_rate).fract();
        let saw = 2.0 * phase - 1.0;

        let center = 1600.0 + (400.0 - 1600.0) * sweep;
        filter.retune_bandpass(center, 18.0, sample_rate);
        let whistle = filter.process(saw);

        let noise = white(rng) * 0.18;
        let gain = (t / 0.6).min(1.0) * 0.35;
        out.push(((whistle + noise) * gain).clamp(-1.0, 1.0));
    }
    out
}

/// The four-layer explosion. Layer timings follow the natural 4.5 s decay;
/// the crackle bursts are randomized per detonation.
pub fn render_explosion_sound(rng: &mut impl Rng) -> Vec<f32> {
    let sample_rate = AUDIO_SAMPLE_RATE as f32;
    let duration = EXPLOSION_SOUND_SECS;
    let len = (duration * sample_rate) as usize;
    let mut out = vec![0.0f32; len];

    // Layer 1: impact - a short filtered noise burst.
    let mut impact_lp = Biquad::lowpass(1500.0, 2.0, sample_rate);
    let impact_len = (0.15 * sample_rate) as usize;
    for (i, sample) in out.iter_mut().enumerate().take(impact_len) {
        let t = i as f32 / sample_rate;
        *sample += impact_lp.process(white(rng)) * exp_ramp(1.2, 0.01, t / 0.15);
    }

    // Layer 2: body - noise through a low-pass falling 800 -> 60 Hz, plus a
    // sub sine dropping 50 -> 25 Hz.
    let body_secs = duration * 0.8;
    let body_len = (body_secs * sample_rate) as usize;
    let mut body_lp = Biquad::lowpass(800.0, 4.0, sample_rate);
    for (i, sample) in out.iter_mut().enumerate().take(body_len) {
        let t = i as f32 / sample_rate;
        let fc = 800.0 * (60.0f32 / 800.0).powf((t / (duration * 0.7)).min(1.0));
        body_lp.retune_lowpass(fc, 4.0, sample_rate);
        let env = if t < 0.1 {
            t / 0.1 * 0.9
        } else {
            exp_ramp(0.9, 0.01, (t - 0.1) / (body_secs - 0.1))
        };
        *sample += body_lp.process(white(rng)) * env;
    }

    let mut sub_phase = 0.0f32;
    for (i, sample) in out.iter_mut().enumerate().take(body_len) {
        let t = i as f32 / sample_rate;
        let freq = 50.0 * (25.0f32 / 50.0).powf((t / (duration * 0.6)).min(1.0));
        sub_phase = (sub_phase + freq / sample_rate).fract();
        let env = if t < 0.05 {
            t / 0.05
        } else {
            exp_ramp(1.0, 0.01, (t - 0.05) / (duration * 0.7 - 0.05))
        };
        *sample += (sub_phase * TAU).sin() * env;
    }

    // Layer 3: rumble - low-passed noise, gain modulated by a slow LFO.
    let lfo_freq = 5.0 + rng.gen::<f32>() * 3.0;
    let mut rumble_lp = Biquad::lowpass(100.0, 1.0, sample_rate);
    let rumble_start = (0.2 * sample_rate) as usize;
    for (i, sample) in out.iter_mut().enumerate().skip(rumble_start) {
        let t = i as f32 / sample_rate;
        let base = if t < 1.0 {
            0.5 + (t - 0.2) / 0.8 * 0.3
        } else {
            exp_ramp(0.8, 0.01, (t - 1.0) / (duration - 1.0))
        };
        let lfo = 1.0 + 0.3 * (TAU * lfo_freq * t).sin();
        *sample += rumble_lp.process(white(rng)) * base * lfo;
    }

    // Layer 4: crackle - scattered high-passed sputter.
    for _ in 0..8 {
        let delay = 0.2 + rng.gen::<f32>() * 1.5;
        let crackle_secs = 0.1 + rng.gen::<f32>() * 0.4;
        let peak = 0.15 + rng.gen::<f32>() * 0.1;
        let mut hp = Biquad::highpass(1500.0 + rng.gen::<f32>() * 1000.0, 0.5, sample_rate);
        let begin = (delay * sample_rate) as usize;
        let count = (crackle_secs * sample_rate) as usize;

        for j in 0..count {
            let i = begin + j;
            if i >= len {
                break;
            }
            let t = j as f32 / sample_rate;
            let env = if t < 0.02 {
                t / 0.02 * peak
            } else {
                exp_ramp(peak, 0.01, (t - 0.02) / crackle_secs)
            };
            let sputter = white(rng) * rng.gen::<f32>().powi(3);
            out[i] += hp.process(sputter) * env;
        }
    }

    for sample in &mut out {
        *sample = (*sample * MASTER_EXPLOSION_GAIN).clamp(-1.0, 1.0);
    }
    out
}
