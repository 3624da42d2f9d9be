//! ============================================================================
//! Speech-to-Text - Whisper-RS transcription of uploaded audio
//! ============================================================================
//! Single-pass, whole-file transcription:
//! - Decode the file (WAV/MP3/FLAC/Vorbis) via rodio
//! - Resample to 16kHz and average channels down to mono
//! - Run one greedy whisper pass and join the segment texts
//!
//! No chunking, streaming or timestamps. Everything here blocks; async
//! callers go through `tokio::task::spawn_blocking`.
//! ============================================================================

use anyhow::Result;
use std::path::Path;

/// Audio sample rate for whisper (16kHz mono)
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

/// Turns an audio file into text
pub trait Transcriber: Send + Sync {
    /// Transcribe the whole file at `path`
    fn transcribe(&self, path: &Path) -> Result<String>;
}

/// Average interleaved frames of `channels` samples into one mono sample each.
/// A trailing partial frame is averaged over what is present.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(feature = "native-audio")]
pub use whisper::{load_audio, WhisperTranscriber};

#[cfg(feature = "native-audio")]
mod whisper {
    use super::{downmix_to_mono, Transcriber, WHISPER_SAMPLE_RATE};
    use anyhow::{anyhow, Result};
    use rodio::source::UniformSourceIterator;
    use rodio::{Decoder, Source};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use tracing::{debug, info};
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// Decode `path` and return mono f32 samples at `sample_rate`
    pub fn load_audio(path: &Path, sample_rate: u32) -> Result<Vec<f32>> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Failed to open audio file {}: {}", path.display(), e))?;
        let decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| anyhow!("Failed to decode audio file {}: {}", path.display(), e))?;

        let channels = decoder.channels();
        debug!(
            "Decoding {} ({} ch @ {} Hz) to {} Hz mono",
            path.display(),
            channels,
            decoder.sample_rate(),
            sample_rate
        );

        let resampled: Vec<f32> =
            UniformSourceIterator::<_, f32>::new(decoder, channels, sample_rate).collect();

        Ok(downmix_to_mono(&resampled, channels))
    }

    /// Local whisper.cpp model
    pub struct WhisperTranscriber {
        ctx: WhisperContext,
        language: String,
    }

    impl WhisperTranscriber {
        /// Load a ggml whisper model.
        /// Download from: https://huggingface.co/ggerganov/whisper.cpp
        /// Recommended: ggml-base.en.bin for English, ggml-small.bin for multilingual
        pub fn load(model_path: &str, language: &str) -> Result<Self> {
            info!("Loading whisper model from: {}", model_path);

            if !Path::new(model_path).exists() {
                return Err(anyhow!(
                    "Whisper model not found at: {}. Download from HuggingFace.",
                    model_path
                ));
            }

            let ctx = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .map_err(|e| anyhow!("Failed to load whisper model: {:?}", e))?;

            info!("Whisper model loaded successfully");
            Ok(Self {
                ctx,
                language: language.to_string(),
            })
        }

        fn transcribe_samples(&self, samples: &[f32]) -> Result<String> {
            let mut state = self
                .ctx
                .create_state()
                .map_err(|e| anyhow!("Failed to create whisper state: {:?}", e))?;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(Some(self.language.as_str()));
            params.set_print_special(false);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            state
                .full(params, samples)
                .map_err(|e| anyhow!("Whisper inference failed: {:?}", e))?;

            let segments = state
                .full_n_segments()
                .map_err(|e| anyhow!("Failed to read whisper segments: {:?}", e))?;

            let mut text = String::new();
            for i in 0..segments {
                let segment = state
                    .full_get_segment_text(i)
                    .map_err(|e| anyhow!("Failed to read segment {}: {:?}", i, e))?;
                text.push_str(&segment);
            }

            Ok(text.trim().to_string())
        }
    }

    impl Transcriber for WhisperTranscriber {
        fn transcribe(&self, path: &Path) -> Result<String> {
            let samples = load_audio(path, WHISPER_SAMPLE_RATE)?;
            debug!("Transcribing {} samples", samples.len());

            let text = self.transcribe_samples(&samples)?;
            info!("Transcribed {} chars from {}", text.len(), path.display());
            Ok(text)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_missing_model() {
            let result = WhisperTranscriber::load("/nonexistent/ggml-base.en.bin", "en");
            assert!(result.is_err());
        }

        #[test]
        fn test_undecodable_audio() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(b"definitely not audio").unwrap();
            assert!(load_audio(file.path(), WHISPER_SAMPLE_RATE).is_err());
        }

        /// Minimal 16-bit PCM WAV writer for fixtures
        fn write_wav(samples: &[i16], channels: u16, rate: u32) -> tempfile::NamedTempFile {
            let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
            let data_len = (samples.len() * 2) as u32;
            let mut bytes = Vec::new();
            bytes.extend_from_slice(b"RIFF");
            bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
            bytes.extend_from_slice(b"WAVEfmt ");
            bytes.extend_from_slice(&16u32.to_le_bytes());
            bytes.extend_from_slice(&1u16.to_le_bytes());
            bytes.extend_from_slice(&channels.to_le_bytes());
            bytes.extend_from_slice(&rate.to_le_bytes());
            bytes.extend_from_slice(&(rate * channels as u32 * 2).to_le_bytes());
            bytes.extend_from_slice(&(channels * 2).to_le_bytes());
            bytes.extend_from_slice(&16u16.to_le_bytes());
            bytes.extend_from_slice(b"data");
            bytes.extend_from_slice(&data_len.to_le_bytes());
            for s in samples {
                bytes.extend_from_slice(&s.to_le_bytes());
            }
            file.write_all(&bytes).unwrap();
            file
        }

        #[test]
        fn test_load_stereo_wav_downmixes() {
            // One second of stereo at 16kHz: left at +half scale, right silent
            let samples: Vec<i16> = (0..16000).flat_map(|_| [16384i16, 0i16]).collect();
            let wav = write_wav(&samples, 2, 16000);

            let mono = load_audio(wav.path(), WHISPER_SAMPLE_RATE).unwrap();
            assert!((mono.len() as i64 - 16000).abs() <= 1);
            assert!((mono[100] - 0.25).abs() < 0.01);
        }
    }
}
