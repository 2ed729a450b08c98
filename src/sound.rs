//! Sound effects: WAV files decoded once, played on a worker thread each.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hound::{SampleFormat, WavReader};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "audio")]
mod device;
#[cfg(feature = "audio")]
pub use device::DeviceLine;

/// Line the viewer plays through
#[cfg(feature = "audio")]
pub type OutputLine = DeviceLine;
#[cfg(not(feature = "audio"))]
pub type OutputLine = SilentLine;

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("Failed to load sound '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Audio line error: {0}")]
    Line(#[from] io::Error),

    #[error("Playback thread panicked")]
    WorkerPanicked,
}

/// Effects the game triggers. The display name is the WAV file stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SoundId {
    GameStart,
    Hit,
    Miss,
    Bust,
    Finish,
    Highscore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoundFormat {
    pub channels: u16,
    pub sample_rate: u32,
}

impl SoundFormat {
    /// Interleaved samples in 100ms of audio
    pub fn chunk_len(&self) -> usize {
        let frames = (self.sample_rate as usize / 10).max(1);
        frames * self.channels.max(1) as usize
    }

    pub fn duration_of(&self, samples: usize) -> Duration {
        let per_second = self.sample_rate as f64 * self.channels.max(1) as f64;
        if per_second == 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(samples as f64 / per_second)
    }
}

/// Output the samples are pushed into, e.g. a sound card line
pub trait Line: Send + 'static {
    fn open(&mut self, format: SoundFormat, buffer_len: usize) -> io::Result<()>;
    /// Blocks until the device accepted `samples`
    fn write(&mut self, samples: &[i16]) -> io::Result<()>;
    /// Blocks until everything written has been played
    fn drain(&mut self) -> io::Result<()>;
    fn close(&mut self);
}

/// Line without a device that still takes real time to play
#[derive(Debug, Default)]
pub struct SilentLine {
    format: Option<SoundFormat>,
}

impl Line for SilentLine {
    fn open(&mut self, format: SoundFormat, _buffer_len: usize) -> io::Result<()> {
        self.format = Some(format);
        Ok(())
    }

    fn write(&mut self, samples: &[i16]) -> io::Result<()> {
        let format = self
            .format
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "line not open"))?;
        thread::sleep(format.duration_of(samples.len()));
        Ok(())
    }

    fn drain(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.format = None;
    }
}

/// A decoded effect. Samples are immutable and shared by every playback.
#[derive(Debug, Clone)]
pub struct SoundEffect {
    id: SoundId,
    format: SoundFormat,
    samples: Arc<[i16]>,
}

impl SoundEffect {
    /// Loads `<dir>/<set>/<id>.wav`
    pub fn load(dir: &Path, set: &str, id: SoundId) -> Result<Self, SoundError> {
        let path = dir.join(set).join(format!("{id}.wav"));
        let load_err = |source| SoundError::Load {
            path: path.clone(),
            source,
        };

        let reader = WavReader::open(&path).map_err(load_err)?;
        let spec = reader.spec();
        let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, bits) if bits <= 16 => {
                let shift = 16 - bits as u32;
                reader
                    .into_samples::<i16>()
                    .map(|s| s.map(|v| v << shift))
                    .collect::<Result<_, _>>()
                    .map_err(load_err)?
            }
            (SampleFormat::Int, bits) => {
                let shift = bits as u32 - 16;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| (v >> shift) as i16))
                    .collect::<Result<_, _>>()
                    .map_err(load_err)?
            }
            (SampleFormat::Float, _) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<_, _>>()
                .map_err(load_err)?,
        };

        debug!(path = %path.display(), samples = samples.len(), "loaded sound effect");
        Ok(Self {
            id,
            format: SoundFormat {
                channels: spec.channels,
                sample_rate: spec.sample_rate,
            },
            samples: samples.into(),
        })
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn format(&self) -> SoundFormat {
        self.format
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration(&self) -> Duration {
        self.format.duration_of(self.samples.len())
    }

    /// Starts playing on a dedicated thread
    pub fn play<L: Line>(&self, line: L) -> Result<Playback, SoundError> {
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let samples = Arc::clone(&self.samples);
        let format = self.format;

        let handle = thread::Builder::new()
            .name(format!("sound-{}", self.id))
            .spawn(move || stream(line, format, &samples, &worker_stop))?;

        Ok(Playback {
            stop,
            handle: Some(handle),
        })
    }
}

fn stream<L: Line>(
    mut line: L,
    format: SoundFormat,
    samples: &[i16],
    stop: &AtomicBool,
) -> io::Result<usize> {
    let chunk = format.chunk_len();
    line.open(format, chunk)?;

    let mut played = 0;
    let result = samples
        .chunks(chunk)
        .take_while(|_| !stop.load(Ordering::Relaxed))
        .try_for_each(|block| {
            line.write(block)?;
            played += block.len();
            Ok::<(), io::Error>(())
        })
        .and_then(|()| line.drain());
    line.close();

    result.map(|()| played)
}

/// Handle to one playing effect
#[derive(Debug)]
pub struct Playback {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<io::Result<usize>>>,
}

impl Playback {
    /// Asks the worker to stop after the chunk it is writing
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the line to drain; returns the number of samples played
    pub fn wait(mut self) -> Result<usize, SoundError> {
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(result) => Ok(result?),
                Err(_) => Err(SoundError::WorkerPanicked),
            },
            None => Ok(0),
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.stop();
            let _ = handle.join();
        }
    }
}

/// Loads effects of one sound set on first use
#[derive(Debug)]
pub struct SoundBoard {
    dir: PathBuf,
    set: String,
    enabled: bool,
    effects: HashMap<SoundId, SoundEffect>,
}

impl SoundBoard {
    pub fn new<P: AsRef<Path>>(dir: P, set: &str, enabled: bool) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            set: set.to_string(),
            enabled,
            effects: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Plays `id` on `line`. Missing or broken files are logged and skipped.
    pub fn play<L: Line>(&mut self, id: SoundId, line: L) -> Option<Playback> {
        if !self.enabled {
            return None;
        }

        if !self.effects.contains_key(&id) {
            match SoundEffect::load(&self.dir, &self.set, id) {
                Ok(effect) => {
                    self.effects.insert(id, effect);
                }
                Err(e) => {
                    warn!(sound = %id, error = %e, "sound effect unavailable");
                    return None;
                }
            }
        }

        let effect = self.effects.get(&id)?;
        match effect.play(line) {
            Ok(playback) => Some(playback),
            Err(e) => {
                warn!(sound = %id, error = %e, "could not start playback");
                None
            }
        }
    }
}
