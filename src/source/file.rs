use anyhow::{Context, Result, anyhow, bail};
use hound::WavReader;
use log::{debug, info, warn};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::{Path, PathBuf};

use crate::audio::engine::EngineHandle;
use crate::source::{Producer, Readiness, SourceError, SourceKind};

/// Decode a WAV file to mono at `target_sample_rate`.
pub fn decode_file(path: &Path, target_sample_rate: usize) -> Result<Vec<f32>> {
    let reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = if spec.sample_format == hound::SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")?
    } else {
        let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / max_val))
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read integer samples")?
    };

    if samples.is_empty() {
        bail!("{} contains no audio", path.display());
    }

    let mono = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|c| c.iter().sum::<f32>() / spec.channels as f32)
            .collect()
    } else {
        samples
    };

    if spec.sample_rate == target_sample_rate as u32 {
        return Ok(mono);
    }

    debug!(
        "Resampling {} from {} Hz to {} Hz",
        path.display(),
        spec.sample_rate,
        target_sample_rate
    );
    resample(&mono, spec.sample_rate, target_sample_rate as u32)
}

fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    let ratio = f64::from(to_rate) / f64::from(from_rate);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)
        .context("Failed to build resampler")?;

    let input = vec![samples.to_vec()];
    let output = resampler
        .process(&input, None)
        .context("Failed to resample audio")?;

    output
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Resampler returned no channels"))
}

/// Decoded file playback, owned by the audio thread.
///
/// Plays once. Starting again after the end rewinds to the beginning.
pub struct FilePlayer {
    samples: Vec<f32>,
    position: usize,
    playing: bool,
}

impl FilePlayer {
    pub const fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            position: 0,
            playing: false,
        }
    }

    pub fn play(&mut self) {
        if self.position >= self.samples.len() {
            self.position = 0;
        }
        self.playing = true;
    }

    pub const fn pause(&mut self) {
        self.playing = false;
    }

    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    pub const fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the next block, padding with silence once the file ends.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.playing {
            out.fill(0.0);
            return;
        }

        let remaining = self.samples.len() - self.position;
        let count = remaining.min(out.len());
        out[..count].copy_from_slice(&self.samples[self.position..self.position + count]);
        out[count..].fill(0.0);
        self.position += count;

        if self.position >= self.samples.len() {
            self.playing = false;
        }
    }
}

/// Control-side view of file playback.
pub struct FileSource {
    engine: EngineHandle,
    loaded: Option<PathBuf>,
    playing: bool,
}

impl FileSource {
    pub const fn new(engine: EngineHandle) -> Self {
        Self {
            engine,
            loaded: None,
            playing: false,
        }
    }

    /// Decode `path` and hand the buffer to the engine, replacing any
    /// previous file. Does not start playback.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let samples = decode_file(path, self.engine.sample_rate())?;
        info!(
            "Loaded {} ({:.1} s)",
            path.display(),
            samples.len() as f32 / self.engine.sample_rate() as f32
        );

        self.engine.load_file(FilePlayer::new(samples));
        self.loaded = Some(path.to_path_buf());
        self.playing = false;
        Ok(())
    }

    /// Drop the decoded buffer.
    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            self.engine.unload_file();
        }
        self.playing = false;
    }

    pub const fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn loaded_path(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }
}

impl Producer for FileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn start(&mut self) -> Result<Readiness, SourceError> {
        if self.loaded.is_none() {
            return Err(SourceError::NotLoaded);
        }
        if !self.engine.set_file_playing(true) {
            return Err(SourceError::PlaybackRejected);
        }
        self.playing = true;
        Ok(Readiness::Ready)
    }

    fn stop(&mut self) {
        if self.playing {
            if !self.engine.set_file_playing(false) {
                warn!("Engine did not take the file pause");
            }
            self.playing = false;
        }
    }

    fn is_live(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in frames {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_stereo_to_mono() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("stereo.wav");
        write_wav(&path, 48_000, 2, &[16384, 0, -16384, -16384]);

        let mono = decode_file(&path, 48_000)?;
        assert_eq!(mono, vec![0.25, -0.5]);
        Ok(())
    }

    #[test]
    fn resamples_to_engine_rate() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("low.wav");
        let frames: Vec<i16> = (0..24_000)
            .map(|n| ((n as f32 * 0.05).sin() * 8000.0) as i16)
            .collect();
        write_wav(&path, 24_000, 1, &frames);

        let decoded = decode_file(&path, 48_000)?;
        assert!(decoded.len() > 46_000 && decoded.len() < 50_000);
        Ok(())
    }

    #[test]
    fn missing_or_empty_files_fail() -> Result<()> {
        let tmp = TempDir::new()?;
        assert!(decode_file(&tmp.path().join("nope.wav"), 48_000).is_err());

        let empty = tmp.path().join("empty.wav");
        write_wav(&empty, 48_000, 1, &[]);
        assert!(decode_file(&empty, 48_000).is_err());
        Ok(())
    }

    #[test]
    fn player_stops_at_end_and_rewinds_on_play() {
        let mut player = FilePlayer::new(vec![1.0, 2.0, 3.0]);
        let mut out = [9.0; 2];

        player.render(&mut out);
        assert_eq!(out, [0.0, 0.0], "paused player is silent");

        player.play();
        player.render(&mut out);
        assert_eq!(out, [1.0, 2.0]);
        player.render(&mut out);
        assert_eq!(out, [3.0, 0.0]);
        assert!(!player.is_playing());

        player.play();
        assert_eq!(player.position(), 0);
        player.render(&mut out);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn pause_keeps_position() {
        let mut player = FilePlayer::new(vec![1.0, 2.0, 3.0, 4.0]);
        let mut out = [0.0; 1];
        player.play();
        player.render(&mut out);
        player.pause();
        player.render(&mut out);
        assert_eq!(out, [0.0]);

        player.play();
        player.render(&mut out);
        assert_eq!(out, [2.0]);
    }
}
