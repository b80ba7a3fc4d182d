//! Cue audio.
//!
//! `AudioCueLibrary` keeps decoded cue buffers in memory for low-latency
//! playback and falls back to streaming the cue file when a buffer is not
//! ready. Every playback failure is logged and swallowed: the timer keeps
//! running with no sound at all.
//!
//! Decoding and output sit behind `CueDecoder` and `CueOutput` so the
//! library works (silently) without an audio device and without the
//! `audio` feature.

#[cfg(feature = "audio")]
mod rodio_backend;

#[cfg(feature = "audio")]
pub use rodio_backend::{RodioDecoder, RodioOutput};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::AudioError;
use crate::storage::AudioConfig;

/// What the engine needs from an audio layer.
pub trait CuePlayer {
    /// Play `cue_id` now, cutting off whatever cue is still sounding.
    fn play(&mut self, cue_id: &str);
    /// Best-effort preparation so the first `play` of `cue_id` is quick.
    fn warm_up(&mut self, cue_id: &str);
}

/// A fully decoded cue, ready to hand to the output.
#[derive(Debug, Clone)]
pub struct DecodedCue {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

pub trait CueDecoder: Send + Sync {
    fn decode(&self, cue_id: &str, path: &Path) -> Result<DecodedCue, AudioError>;
}

pub trait CueOutput {
    /// Low-latency path: play an in-memory buffer.
    fn play_decoded(&mut self, cue: &DecodedCue) -> Result<(), AudioError>;
    /// Fallback path: decode while playing straight from the file.
    fn play_source(&mut self, path: &Path) -> Result<(), AudioError>;
    fn stop_current(&mut self);
    /// Bring the output device up if it is not already.
    fn resume(&mut self) -> Result<(), AudioError>;
}

/// Output that plays nothing. Used without the `audio` feature and with `--no-audio`.
#[derive(Debug, Default)]
pub struct SilentOutput;

impl CueOutput for SilentOutput {
    fn play_decoded(&mut self, _cue: &DecodedCue) -> Result<(), AudioError> {
        Ok(())
    }

    fn play_source(&mut self, _path: &Path) -> Result<(), AudioError> {
        Ok(())
    }

    fn stop_current(&mut self) {}

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Decoder that always fails, leaving every cue on the fallback path.
#[derive(Debug, Default)]
pub struct NoDecoder;

impl CueDecoder for NoDecoder {
    fn decode(&self, _cue_id: &str, _path: &Path) -> Result<DecodedCue, AudioError> {
        Err(AudioError::Unavailable)
    }
}

type BufferMap = Arc<Mutex<HashMap<String, DecodedCue>>>;
type PendingSet = Arc<Mutex<HashSet<String>>>;

/// Handle to a background preload. Dropping it detaches the thread.
pub struct Preload {
    handle: JoinHandle<()>,
}

impl Preload {
    /// Block until the preload finished. Used by tests and shutdown paths.
    pub fn wait(self) {
        if self.handle.join().is_err() {
            warn!("cue preload thread panicked");
        }
    }
}

pub struct AudioCueLibrary {
    sources: HashMap<String, PathBuf>,
    buffers: BufferMap,
    /// Cues a preload thread is decoding right now.
    pending: PendingSet,
    decoder: Arc<dyn CueDecoder>,
    output: Box<dyn CueOutput>,
    enabled: bool,
}

impl AudioCueLibrary {
    pub fn new(decoder: Arc<dyn CueDecoder>, output: Box<dyn CueOutput>) -> Self {
        Self {
            sources: HashMap::new(),
            buffers: Arc::new(Mutex::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashSet::new())),
            decoder,
            output,
            enabled: true,
        }
    }

    /// A library that never makes a sound.
    pub fn silent() -> Self {
        let mut lib = Self::new(Arc::new(NoDecoder), Box::new(SilentOutput));
        lib.enabled = false;
        lib
    }

    /// Build from configuration, resolving cue files against `cue_dir`.
    ///
    /// With the `audio` feature this opens the real output lazily on first use.
    pub fn from_config(config: &AudioConfig, cue_dir: &Path) -> Self {
        if !config.enabled {
            return Self::silent();
        }
        let mut lib = Self::with_default_backend(config.volume);
        for cue in &config.cues {
            let path = if Path::new(&cue.file).is_absolute() {
                PathBuf::from(&cue.file)
            } else {
                cue_dir.join(&cue.file)
            };
            lib.register(&cue.id, path);
        }
        lib
    }

    #[cfg(feature = "audio")]
    fn with_default_backend(volume: u32) -> Self {
        Self::new(
            Arc::new(RodioDecoder),
            Box::new(RodioOutput::new(volume as f32 / 100.0)),
        )
    }

    #[cfg(not(feature = "audio"))]
    fn with_default_backend(_volume: u32) -> Self {
        debug!("built without the audio feature, cues are silent");
        Self::new(Arc::new(NoDecoder), Box::new(SilentOutput))
    }

    /// Map a cue id to the file it plays.
    pub fn register(&mut self, cue_id: &str, path: impl Into<PathBuf>) {
        self.sources.insert(cue_id.to_string(), path.into());
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_decoded(&self, cue_id: &str) -> bool {
        lock(&self.buffers).contains_key(cue_id)
    }

    /// Decode `cue_ids` on a background thread.
    ///
    /// Each cue is decoded independently; a failure is logged and the rest
    /// carry on. Cues already decoded or being decoded by another preload are
    /// skipped. `play` never waits for this.
    pub fn preload<I, S>(&self, cue_ids: I) -> Option<Preload>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.enabled {
            return None;
        }
        let jobs: Vec<(String, PathBuf)> = {
            let buffers = lock(&self.buffers);
            let mut pending = lock(&self.pending);
            cue_ids
                .into_iter()
                .filter_map(|id| {
                    let id = id.as_ref();
                    let Some(path) = self.sources.get(id) else {
                        warn!(cue = id, "cannot preload unregistered cue");
                        return None;
                    };
                    if buffers.contains_key(id) || !pending.insert(id.to_string()) {
                        debug!(cue = id, "cue already decoded or in flight");
                        return None;
                    }
                    Some((id.to_string(), path.clone()))
                })
                .collect()
        };
        if jobs.is_empty() {
            return None;
        }

        let ids: Vec<String> = jobs.iter().map(|(id, _)| id.clone()).collect();
        let decoder = Arc::clone(&self.decoder);
        let buffers = Arc::clone(&self.buffers);
        let pending = Arc::clone(&self.pending);
        let spawned = std::thread::Builder::new()
            .name("cue-preload".into())
            .spawn(move || {
                for (id, path) in jobs {
                    match decoder.decode(&id, &path) {
                        Ok(cue) => {
                            debug!(cue = %id, "cue decoded");
                            lock(&buffers).insert(id.clone(), cue);
                        }
                        Err(e) => warn!(cue = %id, path = %path.display(), "cue preload failed: {e}"),
                    }
                    lock(&pending).remove(&id);
                }
            });
        match spawned {
            Ok(handle) => Some(Preload { handle }),
            Err(e) => {
                warn!("could not spawn cue preload thread: {e}");
                let mut pending = lock(&self.pending);
                for id in &ids {
                    pending.remove(id);
                }
                None
            }
        }
    }

    /// Preload every registered cue.
    pub fn preload_all(&self) -> Option<Preload> {
        let ids: Vec<String> = self.sources.keys().cloned().collect();
        self.preload(ids)
    }
}

impl CuePlayer for AudioCueLibrary {
    fn play(&mut self, cue_id: &str) {
        if !self.enabled {
            return;
        }

        let decoded = lock(&self.buffers).get(cue_id).cloned();
        if let Some(cue) = decoded {
            self.output.stop_current();
            match self.output.play_decoded(&cue) {
                Ok(()) => return,
                Err(e) => debug!(cue = cue_id, "buffer playback failed, streaming instead: {e}"),
            }
        }

        let Some(path) = self.sources.get(cue_id) else {
            debug!(cue = cue_id, "no source registered for cue");
            return;
        };
        self.output.stop_current();
        if let Err(e) = self.output.play_source(path) {
            debug!(cue = cue_id, "cue playback failed: {e}");
        }
    }

    fn warm_up(&mut self, cue_id: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.output.resume() {
            debug!("audio output warm-up failed: {e}");
        }
        if !self.is_decoded(cue_id) {
            // Detached; playback falls back to streaming until it lands.
            let _ = self.preload([cue_id]);
        }
    }
}

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Decoded(u32),
        Source(PathBuf),
        Stop,
        Resume,
    }

    struct RecordingOutput {
        calls: Rc<RefCell<Vec<Call>>>,
        fail_decoded: bool,
        fail_source: bool,
    }

    impl CueOutput for RecordingOutput {
        fn play_decoded(&mut self, cue: &DecodedCue) -> Result<(), AudioError> {
            if self.fail_decoded {
                return Err(AudioError::Play("blocked".into()));
            }
            self.calls.borrow_mut().push(Call::Decoded(cue.sample_rate));
            Ok(())
        }

        fn play_source(&mut self, path: &Path) -> Result<(), AudioError> {
            if self.fail_source {
                return Err(AudioError::Play("autoplay blocked".into()));
            }
            self.calls.borrow_mut().push(Call::Source(path.to_path_buf()));
            Ok(())
        }

        fn stop_current(&mut self) {
            self.calls.borrow_mut().push(Call::Stop);
        }

        fn resume(&mut self) -> Result<(), AudioError> {
            self.calls.borrow_mut().push(Call::Resume);
            Ok(())
        }
    }

    /// Decodes everything except paths containing "broken".
    struct FakeDecoder;

    impl CueDecoder for FakeDecoder {
        fn decode(&self, cue_id: &str, path: &Path) -> Result<DecodedCue, AudioError> {
            if path.to_string_lossy().contains("broken") {
                return Err(AudioError::Decode {
                    cue_id: cue_id.into(),
                    message: "bad header".into(),
                });
            }
            Ok(DecodedCue {
                channels: 1,
                sample_rate: 44_100,
                samples: Arc::from(vec![0.0f32; 8]),
            })
        }
    }

    fn library(
        fail_decoded: bool,
        fail_source: bool,
    ) -> (AudioCueLibrary, Rc<RefCell<Vec<Call>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let output = RecordingOutput {
            calls: Rc::clone(&calls),
            fail_decoded,
            fail_source,
        };
        let mut lib = AudioCueLibrary::new(Arc::new(FakeDecoder), Box::new(output));
        lib.register("ding", "/cues/ding.mp3");
        lib.register("windchime", "/cues/broken-windchime.mp3");
        (lib, calls)
    }

    #[test]
    fn partial_preload_keeps_good_cues() {
        let (lib, _) = library(false, false);
        lib.preload(["ding", "windchime", "missing"]).unwrap().wait();
        assert!(lib.is_decoded("ding"));
        assert!(!lib.is_decoded("windchime"));
    }

    #[test]
    fn decoded_cue_stops_previous_then_plays_buffer() {
        let (mut lib, calls) = library(false, false);
        lib.preload_all().unwrap().wait();
        lib.play("ding");
        assert_eq!(*calls.borrow(), vec![Call::Stop, Call::Decoded(44_100)]);
    }

    #[test]
    fn undecoded_cue_streams_from_source() {
        let (mut lib, calls) = library(false, false);
        lib.play("ding");
        assert_eq!(
            *calls.borrow(),
            vec![Call::Stop, Call::Source(PathBuf::from("/cues/ding.mp3"))]
        );
    }

    #[test]
    fn failed_buffer_playback_falls_back_to_stream() {
        let (mut lib, calls) = library(true, false);
        lib.preload(["ding"]).unwrap().wait();
        lib.play("ding");
        assert_eq!(
            calls.borrow().last(),
            Some(&Call::Source(PathBuf::from("/cues/ding.mp3")))
        );
    }

    #[test]
    fn playback_failures_are_swallowed() {
        let (mut lib, _) = library(true, true);
        lib.play("ding");
        lib.play("unknown");
    }

    #[test]
    fn warm_up_resumes_output() {
        let (mut lib, calls) = library(false, false);
        lib.warm_up("ding");
        assert_eq!(calls.borrow().first(), Some(&Call::Resume));
    }

    /// Counts decodes and holds each one until released.
    struct GatedDecoder {
        decodes: Arc<AtomicUsize>,
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl CueDecoder for GatedDecoder {
        fn decode(&self, _cue_id: &str, _path: &Path) -> Result<DecodedCue, AudioError> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            let _ = lock(&self.gate).recv();
            Ok(DecodedCue {
                channels: 1,
                sample_rate: 48_000,
                samples: Arc::from(vec![0.0f32; 4]),
            })
        }
    }

    #[test]
    fn warm_up_does_not_decode_a_cue_already_in_flight() {
        let decodes = Arc::new(AtomicUsize::new(0));
        let (release, gate) = mpsc::channel();
        let decoder = GatedDecoder {
            decodes: Arc::clone(&decodes),
            gate: Mutex::new(gate),
        };
        let calls = Rc::new(RefCell::new(Vec::new()));
        let output = RecordingOutput {
            calls: Rc::clone(&calls),
            fail_decoded: false,
            fail_source: false,
        };
        let mut lib = AudioCueLibrary::new(Arc::new(decoder), Box::new(output));
        lib.register("ding", "/cues/ding.mp3");

        let first = lib.preload_all().unwrap();
        lib.warm_up("ding");
        assert!(lib.preload(["ding"]).is_none());

        release.send(()).unwrap();
        first.wait();
        assert!(lib.is_decoded("ding"));
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
        assert!(lib.preload(["ding"]).is_none());
    }

    #[test]
    fn failed_decode_can_be_retried() {
        let (lib, _) = library(false, false);
        lib.preload(["windchime"]).unwrap().wait();
        assert!(lib.preload(["windchime"]).is_some());
    }

    #[test]
    fn silent_library_does_nothing() {
        let mut lib = AudioCueLibrary::silent();
        assert!(!lib.is_enabled());
        assert!(lib.preload(["ding"]).is_none());
        lib.play("ding");
        lib.warm_up("ding");
    }
}
