//! rodio-backed decoding and output.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use super::{CueDecoder, CueOutput, DecodedCue};
use crate::error::AudioError;

/// Decodes a cue file fully into f32 samples.
#[derive(Debug, Default)]
pub struct RodioDecoder;

impl CueDecoder for RodioDecoder {
    fn decode(&self, cue_id: &str, path: &Path) -> Result<DecodedCue, AudioError> {
        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            cue_id: cue_id.to_string(),
            message: e.to_string(),
        })?;
        let channels = source.channels();
        let sample_rate = source.sample_rate();
        let samples: Vec<f32> = source.convert_samples().collect();
        Ok(DecodedCue {
            channels,
            sample_rate,
            samples: samples.into(),
        })
    }
}

/// Plays cues through the default output device.
///
/// The device is opened on first use. One `Sink` is kept for the cue in
/// flight; replacing it stops the previous cue.
pub struct RodioOutput {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    current: Option<Sink>,
    volume: f32,
}

impl RodioOutput {
    pub fn new(volume: f32) -> Self {
        Self {
            stream: None,
            current: None,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    fn new_sink(&mut self) -> Result<Sink, AudioError> {
        self.resume()?;
        let (_, handle) = self.stream.as_ref().ok_or(AudioError::Unavailable)?;
        let sink = Sink::try_new(handle).map_err(|e| AudioError::Play(e.to_string()))?;
        sink.set_volume(self.volume);
        Ok(sink)
    }
}

impl CueOutput for RodioOutput {
    fn play_decoded(&mut self, cue: &DecodedCue) -> Result<(), AudioError> {
        let sink = self.new_sink()?;
        sink.append(SamplesBuffer::new(
            cue.channels,
            cue.sample_rate,
            cue.samples.to_vec(),
        ));
        self.current = Some(sink);
        Ok(())
    }

    fn play_source(&mut self, path: &Path) -> Result<(), AudioError> {
        let file = File::open(path)?;
        let source = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            cue_id: path.display().to_string(),
            message: e.to_string(),
        })?;
        let sink = self.new_sink()?;
        sink.append(source);
        self.current = Some(sink);
        Ok(())
    }

    fn stop_current(&mut self) {
        if let Some(sink) = self.current.take() {
            sink.stop();
        }
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        if self.stream.is_none() {
            let pair = OutputStream::try_default().map_err(|e| AudioError::Stream(e.to_string()))?;
            debug!("audio output opened");
            self.stream = Some(pair);
        }
        Ok(())
    }
}
