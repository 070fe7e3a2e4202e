//! Audio assembly: turn the speech API's base64 payload into playable bytes.
//!
//! The voice API returns raw linear 16-bit PCM (media type `audio/L16` or
//! `audio/x-raw-int`, usually with parameters such as `;rate=24000`
//! appended). Raw PCM has no container, so standard players refuse it; this
//! module prepends the fixed 44-byte RIFF/WAVE header that makes it
//! playable. Any other media type passes through byte-for-byte with its
//! original type.
//!
//! The PCM parameters (mono, 24 000 Hz, 16-bit) are contract values fixed by
//! the upstream voice API, not derived from the payload.

use crate::backend::SpeechPayload;
use crate::error::LessonError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

/// Channel count the voice API emits.
pub const PCM_CHANNELS: u16 = 1;
/// Sample rate the voice API emits.
pub const PCM_SAMPLE_RATE: u32 = 24_000;
/// Bit depth the voice API emits.
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// WAV header length; total output = header + raw data.
const WAV_HEADER_LEN: usize = 44;

/// A decoded, playable audio blob with its effective media type.
///
/// Replacing a stored `PlayableAudio` drops the previous buffer, so callers
/// that keep at most one handle (the orchestrator does) cannot accumulate
/// audio across repeated narration requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayableAudio {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// Decode a speech payload into playable bytes.
///
/// # Errors
/// [`LessonError::MediaDecoding`] when the base64 payload is invalid. This
/// is fatal for the narration feature only; it never invalidates the lesson.
pub fn assemble_playable(payload: &SpeechPayload) -> Result<PlayableAudio, LessonError> {
    let raw = BASE64
        .decode(&payload.audio_base64)
        .map_err(|e| LessonError::MediaDecoding {
            detail: format!("invalid base64 audio payload: {e}"),
        })?;

    if is_raw_pcm(&payload.media_type) {
        debug!(
            media_type = payload.media_type,
            data_len = raw.len(),
            "wrapping raw PCM in a WAV container"
        );
        let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + raw.len());
        bytes.extend_from_slice(&wav_header(
            raw.len() as u32,
            PCM_CHANNELS,
            PCM_SAMPLE_RATE,
            PCM_BITS_PER_SAMPLE,
        ));
        bytes.extend_from_slice(&raw);
        Ok(PlayableAudio {
            bytes,
            media_type: "audio/wav".to_string(),
        })
    } else {
        Ok(PlayableAudio {
            bytes: raw,
            media_type: payload.media_type.clone(),
        })
    }
}

/// Whether the declared media type indicates headerless linear PCM.
///
/// Matched by prefix: the API appends parameters (`audio/L16;rate=24000`).
pub fn is_raw_pcm(media_type: &str) -> bool {
    let lower = media_type.to_ascii_lowercase();
    lower.starts_with("audio/l16") || lower.starts_with("audio/x-raw-int")
}

/// Build the canonical 44-byte RIFF/WAVE header for a PCM data chunk.
///
/// Layout (all multi-byte fields little-endian):
/// bytes 0–3 "RIFF", 4–7 chunk size = 36 + data, 8–11 "WAVE",
/// 12–15 "fmt ", 16–19 sub-chunk size 16, 20–21 format 1 (PCM),
/// 22–23 channels, 24–27 sample rate, 28–31 byte rate,
/// 32–33 block align, 34–35 bits per sample, 36–39 "data",
/// 40–43 data length.
pub fn wav_header(data_len: u32, channels: u16, sample_rate: u32, bits_per_sample: u16) -> [u8; WAV_HEADER_LEN] {
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate * u32::from(block_align);

    let mut header = [0u8; WAV_HEADER_LEN];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bits_per_sample.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());
    header
}
