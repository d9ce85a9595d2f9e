//! WAV file reading and writing.
//!
//! Reading accepts 8/16/24/32-bit integer PCM and 32-bit float files and
//! mixes multi-channel audio down to mono by averaging. Writing always
//! produces 16-bit mono PCM.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::clip::AudioClip;
use crate::error::{TransformError, TransformResult};

/// Loads a WAV file as a mono clip at the file's own sample rate.
///
/// # Errors
/// Returns `Wav` if the file cannot be opened or decoded, or if its bit
/// depth is not 8, 16, 24 or 32.
pub fn read_wav(path: &Path) -> TransformResult<AudioClip> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = int_scale(spec.bits_per_sample)?;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = mix_to_mono(&interleaved, spec.channels);
    debug!(
        "read {} ({} Hz, {} ch, {}-bit {:?}): {} samples",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample,
        spec.sample_format,
        samples.len()
    );
    Ok(AudioClip::new(samples, spec.sample_rate))
}

/// Writes a clip as 16-bit mono PCM. Samples are clipped to [-1, 1].
pub fn write_wav(path: &Path, clip: &AudioClip) -> TransformResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in clip.samples() {
        writer.write_sample(pcm16(sample))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Converts a sample to 16-bit PCM, mapping NaN to silence.
fn pcm16(sample: f64) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Full-scale magnitude for a signed integer bit depth.
fn int_scale(bits_per_sample: u16) -> TransformResult<f64> {
    match bits_per_sample {
        8 => Ok(128.0),
        16 => Ok(32768.0),
        24 => Ok(8_388_608.0),
        32 => Ok(2_147_483_648.0),
        _ => Err(TransformError::Wav(hound::Error::Unsupported)),
    }
}

/// Averages interleaved channels.
fn mix_to_mono(interleaved: &[f64], channels: u16) -> Vec<f64> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm16_clips_and_rounds() {
        assert_eq!(pcm16(0.0), 0);
        assert_eq!(pcm16(1.0), 32767);
        assert_eq!(pcm16(2.0), 32767);
        assert_eq!(pcm16(-3.0), -32767);
        assert_eq!(pcm16(f64::NAN), 0);
    }

    #[test]
    fn test_mix_to_mono_averages_frames() {
        assert_eq!(mix_to_mono(&[1.0, 0.0, 0.5, 0.5], 2), vec![0.5, 0.5]);
        assert_eq!(mix_to_mono(&[0.25, 0.75], 1), vec![0.25, 0.75]);
    }

    #[test]
    fn test_int_scale_rejects_odd_depths() {
        assert_eq!(int_scale(16).unwrap(), 32768.0);
        assert!(int_scale(12).is_err());
    }
}
