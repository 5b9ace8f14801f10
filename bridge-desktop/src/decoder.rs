//! # Symphonia Decoder
//!
//! Decodes a complete in-memory resource into a planar
//! [`DecodedBuffer`] using Symphonia's probe, demuxer and codec registry.

use bridge_traits::{
    error::{BridgeError, Result},
    DecodedBuffer,
};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, error, instrument, warn};

const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Whole-buffer decoder backed by Symphonia.
///
/// Decoding is CPU bound and runs on the blocking thread pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `data` on the blocking pool.
    pub async fn decode(&self, data: Bytes) -> Result<DecodedBuffer> {
        tokio::task::spawn_blocking(move || Self::decode_blocking(data))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Decode task failed: {}", e)))?
    }

    /// Decode `data` on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::OperationFailed`] if the container cannot be
    /// probed, no decodable audio track exists, or too many packets in a row
    /// fail to decode.
    #[instrument(skip(data), fields(bytes = data.len()))]
    pub fn decode_blocking(data: Bytes) -> Result<DecodedBuffer> {
        let media_source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                BridgeError::OperationFailed(format!("Unrecognized audio format: {}", e))
            })?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                BridgeError::OperationFailed("No supported audio tracks".to_string())
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to create codec decoder: {}", e))
            })?;

        let mut planes: Vec<Vec<f32>> = Vec::new();
        let mut consecutive_errors = 0;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(BridgeError::OperationFailed(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(BridgeError::OperationFailed(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    sample_rate = Some(decoded.spec().rate);
                    append_planar(&decoded, &mut planes);
                }
                Err(err @ (SymphoniaError::IoError(_) | SymphoniaError::DecodeError(_))) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(BridgeError::OperationFailed(format!(
                            "Decoder failure after {} failed packets: {}",
                            MAX_CONSECUTIVE_ERRORS, err
                        )));
                    }
                }
                Err(e) => {
                    return Err(BridgeError::OperationFailed(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }

        let sample_rate = sample_rate
            .ok_or_else(|| BridgeError::OperationFailed("Missing sample rate".to_string()))?;
        if planes.is_empty() {
            planes.push(Vec::new());
        }

        let buffer = DecodedBuffer::new(planes, sample_rate)?;
        debug!(
            channels = buffer.channel_count(),
            frames = buffer.frame_count(),
            sample_rate,
            "Decoded buffer"
        );
        Ok(buffer)
    }
}

/// Append a decoded packet to per-channel planes, converting to f32.
fn append_planar(buffer: &AudioBufferRef<'_>, planes: &mut Vec<Vec<f32>>) {
    match buffer {
        AudioBufferRef::F32(buf) => append_converted(buf, planes),
        AudioBufferRef::F64(buf) => append_converted(buf, planes),
        AudioBufferRef::S32(buf) => append_converted(buf, planes),
        AudioBufferRef::S24(buf) => append_converted(buf, planes),
        AudioBufferRef::S16(buf) => append_converted(buf, planes),
        AudioBufferRef::S8(buf) => append_converted(buf, planes),
        AudioBufferRef::U32(buf) => append_converted(buf, planes),
        AudioBufferRef::U24(buf) => append_converted(buf, planes),
        AudioBufferRef::U16(buf) => append_converted(buf, planes),
        AudioBufferRef::U8(buf) => append_converted(buf, planes),
    }
}

fn append_converted<T>(buf: &AudioBuffer<T>, planes: &mut Vec<Vec<f32>>)
where
    T: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    if planes.len() < channels {
        // Channels that appear late start with silence for the frames so far.
        let frames_so_far = planes.first().map_or(0, Vec::len);
        planes.resize_with(channels, || vec![0.0; frames_so_far]);
    }

    for (index, plane) in planes.iter_mut().enumerate() {
        if index < channels {
            plane.extend(buf.chan(index).iter().map(|&s| s.into_sample()));
        } else {
            plane.extend(std::iter::repeat(0.0).take(buf.frames()));
        }
    }
}
