use std::fs::File;
use std::io;
use std::path::Path;

use log::info;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio output device: {0}")]
    Device(#[from] rodio::StreamError),
    #[error("failed to create playback voice: {0}")]
    Voice(#[from] rodio::PlayError),
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("failed to decode WAV {path}: {source}")]
    Wav { path: String, source: hound::Error },
    #[error("failed to decode OGG {path}: {source}")]
    Ogg {
        path: String,
        source: lewton::VorbisError,
    },
    #[error("unsupported sample layout in {path}: {channels} channel(s), {detail}")]
    UnsupportedFormat {
        path: String,
        channels: u16,
        detail: String,
    },
}

/// Sample encodings a clip can arrive in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    I16,
    F32,
}

/// The playback formats the output path understands, one per recognized
/// (channel count, sample kind) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipFormat {
    Mono8,
    Mono16,
    MonoF32,
    Stereo8,
    Stereo16,
    StereoF32,
}

/// Maps a decoded channel count and sample kind to a playback format.
/// Anything outside the six recognized pairs has no format.
pub fn clip_format(channels: u16, sample: SampleKind) -> Option<ClipFormat> {
    match (channels, sample) {
        (1, SampleKind::U8) => Some(ClipFormat::Mono8),
        (1, SampleKind::I16) => Some(ClipFormat::Mono16),
        (1, SampleKind::F32) => Some(ClipFormat::MonoF32),
        (2, SampleKind::U8) => Some(ClipFormat::Stereo8),
        (2, SampleKind::I16) => Some(ClipFormat::Stereo16),
        (2, SampleKind::F32) => Some(ClipFormat::StereoF32),
        _ => None,
    }
}

#[derive(Debug, Clone)]
enum Samples {
    I16(Vec<i16>),
    F32(Vec<f32>),
}

/// Fully decoded PCM data, ready to be queued on a voice.
#[derive(Debug, Clone)]
pub struct Clip {
    channels: u16,
    sample_rate: u32,
    samples: Samples,
}

impl Clip {
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in sample frames.
    pub fn frames(&self) -> usize {
        let count = match &self.samples {
            Samples::I16(data) => data.len(),
            Samples::F32(data) => data.len(),
        };
        count / self.channels.max(1) as usize
    }
}

/// Widens an 8-bit sample (hound hands them over as signed) to 16 bits.
fn widen_u8(sample: i8) -> i16 {
    (sample as i16) << 8
}

/// Decodes a whole WAV file into a clip. The sample layout must be one of
/// the recognized [`ClipFormat`]s.
pub fn load_wav(path: &Path) -> Result<Clip, AudioError> {
    let display = path.display().to_string();
    let mut reader = hound::WavReader::open(path).map_err(|source| AudioError::Wav {
        path: display.clone(),
        source,
    })?;
    let spec = reader.spec();

    let kind = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => SampleKind::U8,
        (hound::SampleFormat::Int, 16) => SampleKind::I16,
        (hound::SampleFormat::Float, 32) => SampleKind::F32,
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat {
                path: display,
                channels: spec.channels,
                detail: format!("{bits}-bit {format:?}"),
            })
        }
    };

    let format = clip_format(spec.channels, kind).ok_or_else(|| AudioError::UnsupportedFormat {
        path: display.clone(),
        channels: spec.channels,
        detail: format!("{kind:?}"),
    })?;

    let samples = match format {
        ClipFormat::Mono8 | ClipFormat::Stereo8 => reader
            .samples::<i8>()
            .map(|s| s.map(widen_u8))
            .collect::<Result<Vec<i16>, _>>()
            .map(Samples::I16),
        ClipFormat::Mono16 | ClipFormat::Stereo16 => reader
            .samples::<i16>()
            .collect::<Result<Vec<i16>, _>>()
            .map(Samples::I16),
        ClipFormat::MonoF32 | ClipFormat::StereoF32 => reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, _>>()
            .map(Samples::F32),
    }
    .map_err(|source| AudioError::Wav {
        path: display,
        source,
    })?;

    Ok(Clip {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Decodes a whole OGG/Vorbis file into a clip. Vorbis always decodes to
/// interleaved 16-bit samples.
pub fn load_ogg(path: &Path) -> Result<Clip, AudioError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|source| AudioError::Open {
        path: display.clone(),
        source,
    })?;
    let mut reader =
        lewton::inside_ogg::OggStreamReader::new(file).map_err(|source| AudioError::Ogg {
            path: display.clone(),
            source,
        })?;

    let channels = reader.ident_hdr.audio_channels as u16;
    let sample_rate = reader.ident_hdr.audio_sample_rate;
    clip_format(channels, SampleKind::I16).ok_or_else(|| AudioError::UnsupportedFormat {
        path: display.clone(),
        channels,
        detail: format!("{:?}", SampleKind::I16),
    })?;

    let mut samples = Vec::new();
    loop {
        match reader.read_dec_packet_itl() {
            Ok(Some(packet)) => samples.extend(packet),
            Ok(None) => break,
            Err(source) => {
                return Err(AudioError::Ogg {
                    path: display,
                    source,
                })
            }
        }
    }

    Ok(Clip {
        channels,
        sample_rate,
        samples: Samples::I16(samples),
    })
}

/// The opened audio output device. Dropping this stops all playback, so it
/// must outlive every voice created from it.
pub struct AudioOutput {
    handle: OutputStreamHandle,
    _stream: OutputStream,
}

impl AudioOutput {
    pub fn open() -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        info!("audio output device opened");
        Ok(Self {
            handle,
            _stream: stream,
        })
    }

    /// Creates a playback voice with a clip attached.
    pub fn voice(&self, clip: Clip) -> Result<Voice, AudioError> {
        let sink = Sink::try_new(&self.handle)?;
        Ok(Voice { sink, clip })
    }
}

/// One playback voice with its attached clip.
pub struct Voice {
    sink: Sink,
    clip: Clip,
}

impl Voice {
    /// Starts the attached clip from the beginning. A press during playback
    /// cuts the running clip off rather than scheduling a second run.
    pub fn play(&self) {
        // stop() empties the sink's queue, so the append below is the only
        // scheduled sound afterwards.
        self.sink.stop();
        let channels = self.clip.channels;
        let sample_rate = self.clip.sample_rate;
        match &self.clip.samples {
            Samples::I16(data) => {
                self.sink
                    .append(SamplesBuffer::new(channels, sample_rate, data.clone()))
            }
            Samples::F32(data) => {
                self.sink
                    .append(SamplesBuffer::new(channels, sample_rate, data.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_pairs_map_to_their_format() {
        assert_eq!(clip_format(1, SampleKind::U8), Some(ClipFormat::Mono8));
        assert_eq!(clip_format(1, SampleKind::I16), Some(ClipFormat::Mono16));
        assert_eq!(clip_format(1, SampleKind::F32), Some(ClipFormat::MonoF32));
        assert_eq!(clip_format(2, SampleKind::U8), Some(ClipFormat::Stereo8));
        assert_eq!(clip_format(2, SampleKind::I16), Some(ClipFormat::Stereo16));
        assert_eq!(clip_format(2, SampleKind::F32), Some(ClipFormat::StereoF32));
    }

    #[test]
    fn unrecognized_pairs_have_no_format() {
        assert_eq!(clip_format(0, SampleKind::I16), None);
        assert_eq!(clip_format(3, SampleKind::I16), None);
        assert_eq!(clip_format(6, SampleKind::F32), None);
    }

    #[test]
    fn eight_bit_samples_widen_to_full_scale() {
        assert_eq!(widen_u8(0), 0);
        assert_eq!(widen_u8(127), 127 << 8);
        assert_eq!(widen_u8(-128), i16::MIN);
    }

    #[test]
    fn frames_counts_per_channel() {
        let clip = Clip {
            channels: 2,
            sample_rate: 44_100,
            samples: Samples::I16(vec![0; 8]),
        };
        assert_eq!(clip.frames(), 4);
    }

    #[test]
    fn replaying_a_voice_restarts_instead_of_stacking() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;
        use std::time::Duration;

        let (sink, mut mixer) = Sink::new_idle();
        let voice = Voice {
            sink,
            // Long enough that the first run cannot finish on its own while
            // the test is polling.
            clip: Clip {
                channels: 1,
                sample_rate: 44_100,
                samples: Samples::I16(vec![1_000; 44_100 * 30]),
            },
        };

        // Drains the queue at a bounded rate, standing in for the device.
        let running = Arc::new(AtomicBool::new(true));
        let driver = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                while running.load(Ordering::Relaxed) {
                    for _ in 0..256 {
                        mixer.next();
                    }
                    thread::sleep(Duration::from_millis(2));
                }
            })
        };

        voice.play();
        thread::sleep(Duration::from_millis(50));
        voice.play();

        // The second press replaces the first clip, so the sink settles at a
        // single scheduled sound instead of two.
        let mut settled = false;
        for _ in 0..300 {
            if voice.sink.len() == 1 {
                settled = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        running.store(false, Ordering::Relaxed);
        driver.join().unwrap();
        assert!(
            settled,
            "second press left {} sounds scheduled",
            voice.sink.len()
        );
    }
}
