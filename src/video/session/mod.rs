//! Decoder sessions
//!
//! A session owns an open container, the selected video stream, an open
//! codec and the conversion stage, and hands out one presentation frame per
//! pull. The hardware and software variants share the packet/frame loop in
//! [`Pipeline`] and differ only in codec setup and frame residency.

mod hardware;
mod software;

#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::time::Duration;

use ffmpeg_next::frame;

use super::accel::{AccelBackend, AccelerationNegotiator};
use super::backend::{
    default_frame_interval, CodecSetup, Demuxer, MediaBackend, Receive, StreamInfo, VideoCodec,
};
use super::codec::FfmpegBackend;
use super::convert::{PresentationFrame, ScalingAlgorithm};
use crate::error::DecodeError;

pub use hardware::HardwareSession;
pub use software::SoftwareSession;

/// Which decode path a session uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Hardware(AccelBackend),
    Software,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Hardware(backend) => write!(f, "hardware ({})", backend),
            SessionKind::Software => write!(f, "software"),
        }
    }
}

/// Pull-based source of presentation frames
pub trait DecoderSession {
    fn kind(&self) -> SessionKind;

    /// Open the container, select its video stream and open the codec
    ///
    /// Must be called exactly once before [`decode_next_frame`](Self::decode_next_frame).
    fn open(&mut self, locator: &str) -> Result<(), DecodeError>;

    /// Decode and convert the next displayable frame
    ///
    /// Returns `Ok(None)` at end of stream, and keeps doing so on later calls.
    fn decode_next_frame(&mut self) -> Result<Option<PresentationFrame<'_>>, DecodeError>;

    /// Frame period declared by the stream, for pacing only
    fn nominal_frame_interval(&self) -> Duration;

    /// The selected stream, once open
    fn stream(&self) -> Option<&StreamInfo>;
}

/// Choices made once, before a session is opened
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub prefer_hardware: bool,
    pub allow_list: Vec<AccelBackend>,
    pub scaling: ScalingAlgorithm,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            prefer_hardware: true,
            allow_list: AccelBackend::default_allow_list(),
            scaling: ScalingAlgorithm::default(),
        }
    }
}

/// Pick the container's best video stream and a decoder for it
///
/// Nothing is allocated on the codec side until both succeed.
pub(crate) fn select_stream<B: MediaBackend>(
    backend: &B,
    source: &B::Source,
) -> Result<(StreamInfo, B::Descriptor), DecodeError> {
    let stream = source
        .best_video_stream()
        .and_then(|index| source.streams().iter().find(|s| s.index == index))
        .filter(|stream| stream.is_video())
        .cloned()
        .ok_or_else(|| DecodeError::NoStream(source.locator().to_string()))?;

    let descriptor = backend.find_decoder(&stream).ok_or_else(|| {
        DecodeError::codec(format!(
            "no decoder for {:?} in stream {}",
            stream.codec_id, stream.index
        ))
    })?;

    tracing::info!(
        "Selected video stream {} of {}: {:?} {}x{}",
        stream.index,
        source.locator(),
        stream.codec_id,
        stream.width,
        stream.height
    );

    Ok((stream, descriptor))
}

/// The demux/decode loop shared by both session variants
pub(crate) struct Pipeline<B: MediaBackend> {
    source: B::Source,
    codec: B::Codec,
    stream: StreamInfo,
    interval: Duration,
    /// End of container reached and signalled to the codec
    draining: bool,
    /// Codec fully drained; every later pull is end of stream
    finished: bool,
}

impl<B: MediaBackend> Pipeline<B> {
    pub fn start(
        backend: &B,
        source: B::Source,
        stream: StreamInfo,
        descriptor: &B::Descriptor,
        setup: &CodecSetup,
    ) -> Result<Self, DecodeError> {
        let codec = backend.open_codec(&source, &stream, descriptor, setup)?;
        let interval = stream.nominal_frame_interval();
        Ok(Self {
            source,
            codec,
            stream,
            interval,
            draining: false,
            finished: false,
        })
    }

    pub fn stream(&self) -> &StreamInfo {
        &self.stream
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn codec_mut(&mut self) -> &mut B::Codec {
        &mut self.codec
    }

    pub fn codec(&self) -> &B::Codec {
        &self.codec
    }

    /// Fill `slot` with the next decoded picture, or report end of stream
    pub fn next_decoded(&mut self, slot: &mut frame::Video) -> Result<bool, DecodeError> {
        if self.finished {
            return Ok(false);
        }

        loop {
            match self.codec.receive_frame(slot)? {
                Receive::Frame => return Ok(true),
                Receive::Drained => {
                    self.finish();
                    return Ok(false);
                }
                Receive::NeedsInput if self.draining => {
                    // Nothing left to feed; a codec asking for more after EOF is done.
                    self.finish();
                    return Ok(false);
                }
                Receive::NeedsInput => self.feed()?,
            }
        }
    }

    /// Send the next packet of the selected stream, or EOF once the container is exhausted
    fn feed(&mut self) -> Result<(), DecodeError> {
        loop {
            match self.source.read_packet()? {
                Some(coded) if coded.stream_index == self.stream.index => {
                    return self.codec.send_packet(&coded.packet);
                }
                Some(_) => continue,
                None => {
                    tracing::debug!("Container exhausted, draining decoder");
                    self.draining = true;
                    return self.codec.send_eof();
                }
            }
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            tracing::info!("End of stream {} reached", self.stream.index);
        }
        self.finished = true;
    }
}

fn interval_of<B: MediaBackend>(pipeline: Option<&Pipeline<B>>) -> Duration {
    pipeline.map_or_else(default_frame_interval, Pipeline::interval)
}

/// Open `locator` on FFmpeg, negotiating hardware decoding when allowed
pub fn open_session(
    locator: &str,
    options: &SessionOptions,
) -> Result<Box<dyn DecoderSession>, DecodeError> {
    open_session_with(FfmpegBackend::new(), locator, options)
}

/// Open `locator` on any backend
///
/// The container is opened once and the stream and decoder are selected
/// before the variant is chosen. If the negotiated device cannot be
/// created, the source is reopened for software decoding. Every other
/// hardware open failure is returned as is.
pub fn open_session_with<B>(
    backend: B,
    locator: &str,
    options: &SessionOptions,
) -> Result<Box<dyn DecoderSession>, DecodeError>
where
    B: MediaBackend + Clone + 'static,
{
    let source = backend.open_source(locator)?;
    let (stream, descriptor) = select_stream(&backend, &source)?;

    let capability = if options.prefer_hardware {
        AccelerationNegotiator::new(options.allow_list.clone())
            .negotiate(&backend.available_accelerators(), &descriptor)
    } else {
        tracing::info!("Hardware decoding disabled");
        None
    };

    if let Some(capability) = capability {
        let mut session = HardwareSession::new(backend.clone(), capability, options.scaling);
        match session.attach(source, stream, &descriptor) {
            Ok(()) => return Ok(Box::new(session)),
            Err(DecodeError::Device(reason)) => {
                tracing::warn!(
                    "{} decoding unavailable: {}. Falling back to software decode.",
                    capability.backend,
                    reason
                );
            }
            Err(e) => return Err(e),
        }

        let mut session = SoftwareSession::new(backend, options.scaling);
        session.open(locator)?;
        return Ok(Box::new(session));
    }

    let mut session = SoftwareSession::new(backend, options.scaling);
    session.attach(source, stream, &descriptor)?;
    Ok(Box::new(session))
}
