//! Speaker output through cpal.
//!
//! cpal streams must stay on the thread that built them, so `open` starts a
//! small owner thread that keeps the stream alive until `close`. Samples pass
//! through a shared queue the stream callback drains; underruns play silence.

use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig};
use tracing::{debug, warn};

use super::{Line, SoundFormat};

const POLL: Duration = Duration::from_millis(5);
const DRAIN_GRACE: Duration = Duration::from_secs(1);

type Queue = Arc<Mutex<VecDeque<i16>>>;

/// Line backed by the default output device
#[derive(Debug, Default)]
pub struct DeviceLine {
    queue: Queue,
    format: Option<SoundFormat>,
    capacity: usize,
    shutdown: Option<Sender<()>>,
    owner: Option<JoinHandle<()>>,
}

fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<i16>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn build_stream(format: SoundFormat, queue: Queue) -> io::Result<Stream> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no audio output device"))?;
    let config = StreamConfig {
        channels: format.channels,
        sample_rate: SampleRate(format.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let mut queue = lock(&queue);
                for sample in data.iter_mut() {
                    *sample = queue.pop_front().unwrap_or(0);
                }
            },
            |err| warn!(error = %err, "audio stream error"),
            None,
        )
        .map_err(io::Error::other)?;
    stream.play().map_err(io::Error::other)?;

    Ok(stream)
}

impl DeviceLine {
    fn not_open() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "line not open")
    }
}

impl Line for DeviceLine {
    fn open(&mut self, format: SoundFormat, buffer_len: usize) -> io::Result<()> {
        let queue = Arc::clone(&self.queue);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let owner = thread::Builder::new()
            .name("sound-device".to_string())
            .spawn(move || {
                let stream = match build_stream(format, queue) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Sender dropped or signalled: either way the line is closed
                let _ = shutdown_rx.recv();
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!(?format, "audio device opened");
                self.format = Some(format);
                self.capacity = buffer_len.max(1) * 2;
                self.shutdown = Some(shutdown_tx);
                self.owner = Some(owner);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = owner.join();
                Err(e)
            }
            Err(_) => {
                let _ = owner.join();
                Err(io::Error::other("audio device thread exited"))
            }
        }
    }

    fn write(&mut self, samples: &[i16]) -> io::Result<()> {
        let format = self.format.ok_or_else(Self::not_open)?;
        loop {
            let queued = lock(&self.queue).len();
            if queued == 0 || queued + samples.len() <= self.capacity {
                break;
            }
            thread::sleep(POLL.min(format.duration_of(queued)));
        }
        lock(&self.queue).extend(samples.iter().copied());
        Ok(())
    }

    fn drain(&mut self) -> io::Result<()> {
        let format = self.format.ok_or_else(Self::not_open)?;
        let deadline = Instant::now() + format.duration_of(lock(&self.queue).len()) + DRAIN_GRACE;
        while !lock(&self.queue).is_empty() {
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "audio device stopped consuming samples",
                ));
            }
            thread::sleep(POLL);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.format = None;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(owner) = self.owner.take() {
            let _ = owner.join();
        }
        lock(&self.queue).clear();
    }
}

impl Drop for DeviceLine {
    fn drop(&mut self) {
        self.close();
    }
}
