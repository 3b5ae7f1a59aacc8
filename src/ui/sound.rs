/// Sound engine: procedural 8-bit style effects and an ambient music loop
/// via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// Effects are fire-and-forget (detached Sink); the music loop lives on
/// its own Sink whose volume the pause menu controls.
///
/// Compile without the "sound" feature to disable audio entirely: the
/// engine then only tracks the music volume (the menu bar still shows it).

use crate::sim::ports::{Effect, SoundSystem};

/// Music volume at startup.
pub const INITIAL_MUSIC_VOLUME: f32 = 0.10;

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

    use crate::sim::ports::Effect;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = std::f32::consts::PI * 2.0;

    /// Open audio device plus pre-generated WAV buffers.
    pub struct Output {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_click: Arc<Vec<u8>>,
        sfx_enter: Arc<Vec<u8>>,
        sfx_open: Arc<Vec<u8>>,
        sfx_close: Arc<Vec<u8>>,
        music: Option<Sink>,
    }

    impl Output {
        pub fn open(volume: f32) -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    log::warn!("no audio output: {e}");
                    return None;
                }
            };

            let music = Sink::try_new(&handle).ok().and_then(|sink| {
                let src = rodio::Decoder::new(Cursor::new(make_wav(&gen_ambient()))).ok()?;
                sink.set_volume(volume);
                sink.append(src.repeat_infinite());
                Some(sink)
            });
            if music.is_none() {
                log::warn!("background music could not be started");
            }

            Some(Output {
                _stream: stream,
                handle,
                sfx_click: Arc::new(make_wav(&gen_click())),
                sfx_enter: Arc::new(make_wav(&gen_enter())),
                sfx_open: Arc::new(make_wav(&gen_sweep(440.0, 880.0))),
                sfx_close: Arc::new(make_wav(&gen_sweep(880.0, 440.0))),
                music,
            })
        }

        pub fn play(&self, effect: Effect) {
            let buf = match effect {
                Effect::MenuClick => &self.sfx_click,
                Effect::StageEnter => &self.sfx_enter,
                Effect::OverlayOpen => &self.sfx_open,
                Effect::OverlayClose => &self.sfx_close,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }

        pub fn set_music_volume(&self, volume: f32) {
            if let Some(sink) = &self.music {
                sink.set_volume(volume);
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators — all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    fn samples(duration: f32) -> usize {
        (SAMPLE_RATE as f32 * duration) as usize
    }

    /// Menu click: very short square-ish tick
    fn gen_click() -> Vec<f32> {
        let n = samples(0.03);
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - i as f32 / n as f32;
                let wave = (t * 1200.0 * TAU).sin() * 0.7 + (t * 3600.0 * TAU).sin() * 0.3;
                wave * env * 0.25
            })
            .collect()
    }

    /// Stage enter: two rising notes G4→D5
    fn gen_enter() -> Vec<f32> {
        let mut out = Vec::new();
        for &freq in &[392.0_f32, 587.0] {
            let n = samples(0.07);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                out.push((t * freq * TAU).sin() * env * 0.25);
            }
        }
        out
    }

    /// Overlay open / close: short pitch sweep between two frequencies
    fn gen_sweep(from: f32, to: f32) -> Vec<f32> {
        let n = samples(0.09);
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.7);
                (phase * TAU).sin() * env * 0.2
            })
            .collect()
    }

    /// Ambient loop: slow minor arpeggio A3 C4 E4 C4 with soft attack,
    /// 4 s long so the repeat is seamless at note boundaries.
    fn gen_ambient() -> Vec<f32> {
        let notes = [220.0_f32, 261.6, 329.6, 261.6];
        let mut out = Vec::new();
        for &freq in &notes {
            let n = samples(1.0);
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let pos = i as f32 / n as f32;
                let env = (pos * 10.0).min(1.0) * (1.0 - pos).powf(0.3);
                let wave = (t * freq * TAU).sin() * 0.8 + (t * freq * 0.5 * TAU).sin() * 0.2;
                out.push(wave * env * 0.5);
            }
        }
        out
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder — wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }
}

#[cfg(not(feature = "sound"))]
mod inner {
    use crate::sim::ports::Effect;

    pub struct Output;

    impl Output {
        pub fn open(_volume: f32) -> Option<Self> { Some(Output) }
        pub fn play(&self, _effect: Effect) {}
        pub fn set_music_volume(&self, _volume: f32) {}
    }
}

// ════════════════════════════════════════════════════════════
//  Public API
// ════════════════════════════════════════════════════════════

pub struct SoundEngine {
    output: Option<inner::Output>,
    volume: f32,
}

impl SoundEngine {
    /// Open the audio device. Without one the engine stays silent but
    /// keeps tracking the volume.
    pub fn new() -> Self {
        SoundEngine {
            output: inner::Output::open(INITIAL_MUSIC_VOLUME),
            volume: INITIAL_MUSIC_VOLUME,
        }
    }

    #[cfg(test)]
    fn silent() -> Self {
        SoundEngine { output: None, volume: INITIAL_MUSIC_VOLUME }
    }
}

impl SoundSystem for SoundEngine {
    fn play(&mut self, effect: Effect) {
        if let Some(out) = &self.output {
            out.play(effect);
        }
    }

    fn set_music_volume(&mut self, delta: f32) {
        // round to whole percent so repeated ±0.1 steps land on the grid
        self.volume = ((self.volume + delta).clamp(0.0, 1.0) * 100.0).round() / 100.0;
        log::debug!("music volume {:.2}", self.volume);
        if let Some(out) = &self.output {
            out.set_music_volume(self.volume);
        }
    }

    fn music_volume(&self) -> f32 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_starts_low_and_steps() {
        let mut s = SoundEngine::silent();
        assert_eq!(s.music_volume(), 0.10);
        s.set_music_volume(0.1);
        assert_eq!(s.music_volume(), 0.2);
        s.set_music_volume(-0.1);
        s.set_music_volume(-0.1);
        assert_eq!(s.music_volume(), 0.0);
    }

    #[test]
    fn volume_is_clamped() {
        let mut s = SoundEngine::silent();
        s.set_music_volume(-0.5);
        assert_eq!(s.music_volume(), 0.0);
        for _ in 0..20 {
            s.set_music_volume(0.1);
        }
        assert_eq!(s.music_volume(), 1.0);
    }

    #[test]
    fn silent_engine_accepts_effects() {
        let mut s = SoundEngine::silent();
        s.play(Effect::MenuClick);
        s.play(Effect::StageEnter);
    }

    #[cfg(feature = "sound")]
    #[test]
    fn wav_header_is_well_formed() {
        let wav = inner::make_wav(&[0.0, 0.5, -0.5, 2.0]);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 8);
        // clamped sample
        assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), 32767);
    }
}
