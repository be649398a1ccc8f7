use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use rubato::{FftFixedIn, Resampler};
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::analysis::preprocess::unpack_fifo_word;
use crate::config::{InputFormat, LedChannel};

/// Bytes per FIFO record: one 3-byte word per LED, red first.
pub const FIFO_RECORD_LEN: usize = 6;

const RESAMPLE_CHUNK: usize = 1024;

/// A recorded PPG stream, ready to feed sample by sample.
#[derive(Clone, Debug)]
pub struct DecodedInput {
    pub samples: Vec<f32>,
    /// Format actually used once `Auto` is resolved.
    pub format: InputFormat,
    /// Native rate of a WAV source before resampling.
    pub source_sample_rate: Option<u32>,
}

/// Picks a concrete format from the file extension when `Auto` is asked.
pub fn resolve_format(path: &Path, format: InputFormat) -> InputFormat {
    if format != InputFormat::Auto {
        return format;
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("wav") => InputFormat::Wav,
        Some("bin" | "fifo" | "raw") => InputFormat::Fifo,
        _ => InputFormat::Text,
    }
}

/// Loads one channel of a recording. `column` selects the text column or
/// the WAV channel; `channel` selects the LED of a FIFO dump.
pub fn load_samples(
    path: &Path,
    format: InputFormat,
    channel: LedChannel,
    column: usize,
    sample_rate: f64,
) -> Result<DecodedInput> {
    let format = resolve_format(path, format);
    let mut source_sample_rate = None;
    let samples = match format {
        InputFormat::Wav => {
            // The resampler works in whole hertz; anything else would skew
            // the estimator's time axis.
            if sample_rate.fract() != 0.0 || !(1.0..=f64::from(u32::MAX)).contains(&sample_rate) {
                bail!("WAV input needs a whole-number sample rate in hertz, got {}", sample_rate);
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let target_sr = sample_rate as u32;
            let (samples, native) = decode_wav_channel(path, column, target_sr)?;
            source_sample_rate = Some(native);
            samples
        }
        InputFormat::Fifo => {
            let bytes = fs::read(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            parse_fifo(&bytes, channel)?
        }
        InputFormat::Text | InputFormat::Auto => {
            let file = fs::File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            parse_text(BufReader::new(file), column)?
        }
    };
    debug!(?format, samples = samples.len(), path = %path.display(), "input decoded");
    Ok(DecodedInput { samples, format, source_sample_rate })
}

/// Reads a sample table: one value per line, or `column` of a table split
/// on commas, semicolons, tabs or spaces. Blank lines and `#` comments are
/// skipped, and so is a non-numeric first row (a header).
pub fn parse_text<R: BufRead>(reader: R, column: usize) -> Result<Vec<f32>> {
    let mut samples = Vec::new();
    let mut seen_row = false;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read error at line {}", line_no + 1))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let first_row = !seen_row;
        seen_row = true;

        let field = line
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .nth(column);
        let Some(field) = field else {
            bail!("line {}: no column {}", line_no + 1, column);
        };
        match field.parse::<f32>() {
            Ok(v) => samples.push(v),
            Err(_) if first_row => continue,
            Err(e) => bail!("line {}: invalid sample {:?}: {}", line_no + 1, field, e),
        }
    }
    Ok(samples)
}

/// Extracts one LED channel from a raw FIFO dump.
pub fn parse_fifo(bytes: &[u8], channel: LedChannel) -> Result<Vec<f32>> {
    if bytes.len() % FIFO_RECORD_LEN != 0 {
        bail!(
            "FIFO dump of {} bytes is not a whole number of {}-byte records",
            bytes.len(),
            FIFO_RECORD_LEN
        );
    }
    let offset = match channel {
        LedChannel::Red => 0,
        LedChannel::Ir => 3,
    };
    Ok(bytes
        .chunks_exact(FIFO_RECORD_LEN)
        .map(|record| {
            let word = [record[offset], record[offset + 1], record[offset + 2]];
            unpack_fifo_word(word) as f32
        })
        .collect())
}

/// Decodes a WAV file and returns channel `channel` resampled to
/// `target_sr`, together with the file's native rate.
pub fn decode_wav_channel(path: &Path, channel: usize, target_sr: u32) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("cannot open WAV file {}", path.display()))?;

    let spec = reader.spec();
    let channels = usize::from(spec.channels).max(1);
    let source_sr = spec.sample_rate;
    if channel >= channels {
        bail!("WAV file has {} channel(s), channel {} requested", channels, channel);
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read WAV samples")?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .context("failed to convert WAV samples")?
        }
    };

    let samples: Vec<f32> = interleaved
        .chunks_exact(channels)
        .map(|frame| frame[channel])
        .collect();

    if source_sr == target_sr || samples.is_empty() {
        return Ok((samples, source_sr));
    }
    debug!(source_sr, target_sr, "resampling WAV input");
    Ok((resample(&samples, source_sr, target_sr)?, source_sr))
}

/// Resamples a single channel to `target_sr`.
fn resample(samples: &[f32], source_sr: u32, target_sr: u32) -> Result<Vec<f32>> {
    let mut resampler = FftFixedIn::<f32>::new(
        source_sr as usize,
        target_sr as usize,
        RESAMPLE_CHUNK,
        1,
        1,
    )
    .context("failed to initialise resampler")?;

    let mut output = vec![vec![0.0f32; resampler.output_frames_max()]; 1];
    let mut resampled = Vec::with_capacity(
        (samples.len() as u64 * u64::from(target_sr) / u64::from(source_sr)) as usize + 1,
    );
    for chunk in samples.chunks(RESAMPLE_CHUNK) {
        let input = vec![chunk];
        let (_, out_len) = if chunk.len() == RESAMPLE_CHUNK {
            resampler.process_into_buffer(&input, &mut output, None)
        } else {
            resampler.process_partial_into_buffer(Some(input.as_slice()), &mut output, None)
        }
        .context("resampling failed")?;
        resampled.extend_from_slice(&output[0][..out_len]);
    }
    Ok(resampled)
}
