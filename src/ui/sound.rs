/// Sound engine: procedural 8-bit effects via rodio.
///
/// Every effect, countdown ticks included, is rendered to an in-memory
/// WAV buffer once at start-up and played fire-and-forget through a
/// detached `Sink`.
///
/// Build without the "sound" feature to compile a silent stub instead.

#[cfg(feature = "sound")]
mod inner {
    use std::f32::consts::TAU;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    pub(super) const SAMPLE_RATE: u32 = 22050;

    /// Countdown seconds with a distinct tick pitch; longer counts reuse the lowest.
    pub(super) const TICK_STEPS: u32 = 5;

    pub(super) fn tick_freq(secs_left: u32) -> f32 {
        900.0 - secs_left.min(TICK_STEPS) as f32 * 100.0
    }

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_shot: Arc<Vec<u8>>,
        sfx_hit: Arc<Vec<u8>>,
        sfx_lines: Arc<Vec<u8>>,
        sfx_out: Arc<Vec<u8>>,
        sfx_escape: Arc<Vec<u8>>,
        sfx_land: Arc<Vec<u8>>,
        sfx_go: Arc<Vec<u8>>,
        sfx_end: Arc<Vec<u8>>,
        sfx_ticks: Vec<Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;
            let wav = |s: Vec<f32>| Arc::new(make_wav(&s));
            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_shot: wav(sweep(500.0, 1400.0, 0.08, 0.0, 0.2)),
                sfx_hit: wav(sweep(500.0, 150.0, 0.12, 0.6, 0.3)),
                sfx_lines: wav(notes(&[(1047.0, 0.05), (1319.0, 0.05), (1568.0, 0.05), (2093.0, 0.12)], 0.25)),
                sfx_out: wav(notes(&[(440.0, 0.12), (370.0, 0.12), (311.0, 0.12), (261.0, 0.2)], 0.3)),
                sfx_escape: wav(sweep(200.0, 900.0, 0.35, 0.1, 0.3)),
                sfx_land: wav(sweep(160.0, 90.0, 0.05, 0.3, 0.25)),
                sfx_go: wav(notes(&[(784.0, 0.08), (1047.0, 0.15)], 0.3)),
                sfx_end: wav(notes(&[(523.0, 0.1), (659.0, 0.1), (784.0, 0.1), (1047.0, 0.35)], 0.3)),
                sfx_ticks: (0..=TICK_STEPS).map(|s| wav(notes(&[(tick_freq(s), 0.05)], 0.2))).collect(),
            })
        }

        fn play(&self, buf: &Arc<Vec<u8>>) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }

        /// Countdown tick. Pitch rises as the count nears zero.
        pub fn play_tick(&self, secs_left: u32) {
            if let Some(buf) = self.sfx_ticks.get(secs_left.min(TICK_STEPS) as usize) {
                self.play(buf);
            }
        }

        pub fn play_shot(&self) { self.play(&self.sfx_shot); }
        pub fn play_hit(&self) { self.play(&self.sfx_hit); }
        pub fn play_lines(&self) { self.play(&self.sfx_lines); }
        pub fn play_eliminated(&self) { self.play(&self.sfx_out); }
        pub fn play_escape(&self) { self.play(&self.sfx_escape); }
        pub fn play_land(&self) { self.play(&self.sfx_land); }
        pub fn play_go(&self) { self.play(&self.sfx_go); }
        pub fn play_end(&self) { self.play(&self.sfx_end); }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples in [-1, 1]
    // ════════════════════════════════════════════════════════════

    fn samples_for(secs: f32) -> usize {
        (SAMPLE_RATE as f32 * secs) as usize
    }

    /// A run of (frequency, seconds) notes, sine plus a third harmonic,
    /// each with a soft fade.
    pub(super) fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut out = Vec::new();
        for &(freq, dur) in seq {
            let n = samples_for(dur);
            out.extend((0..n).map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.7 + (t * freq * 3.0 * TAU).sin() * 0.3;
                wave * env * volume
            }));
        }
        out
    }

    /// Linear pitch sweep mixed with LCG noise (`noise` in 0..=1).
    pub(super) fn sweep(from: f32, to: f32, secs: f32, noise: f32, volume: f32) -> Vec<f32> {
        let n = samples_for(secs);
        let mut rng: u32 = 12345;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let p = i as f32 / n as f32;
                phase += (from + (to - from) * p) * TAU / SAMPLE_RATE as f32;
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let hiss = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - p).powf(0.7);
                (phase.sin() * (1.0 - noise) + hiss * noise) * env * volume
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let channels: u16 = 1;
        let bits: u16 = 16;
        let byte_rate = SAMPLE_RATE * channels as u32 * bits as u32 / 8;
        let block_align = channels * bits / 8;
        let data_size = samples.len() as u32 * 2;

        let mut buf = Vec::with_capacity(44 + data_size as usize);
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&(36 + data_size).to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&v.to_le_bytes());
        }
        buf
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_tick(&self, _secs_left: u32) {}
    pub fn play_shot(&self) {}
    pub fn play_hit(&self) {}
    pub fn play_lines(&self) {}
    pub fn play_eliminated(&self) {}
    pub fn play_escape(&self) {}
    pub fn play_land(&self) {}
    pub fn play_go(&self) {}
    pub fn play_end(&self) {}
}
