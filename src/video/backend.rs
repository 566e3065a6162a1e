//! Seams between decoder sessions and the media library
//!
//! Sessions drive any [`MediaBackend`]: the production one wraps FFmpeg,
//! tests plug in scripted demuxers and codecs. Frames are always
//! `ffmpeg_next::frame::Video` so the conversion stage is shared.

use std::time::Duration;

use ffmpeg_next::{codec, ffi, frame, media, Packet, Rational};

use super::accel::{AccelBackend, AccelerationCapability, HwConfig};
use crate::error::DecodeError;

/// Frame rate assumed when a stream declares none
pub const DEFAULT_FRAME_RATE: u64 = 30;

/// Header information for one container stream
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub index: usize,
    pub medium: media::Type,
    pub codec_id: codec::Id,
    pub width: u32,
    pub height: u32,
    /// Declared (real base) frame rate
    pub frame_rate: Rational,
    pub avg_frame_rate: Rational,
    pub time_base: Rational,
}

impl StreamInfo {
    pub fn is_video(&self) -> bool {
        self.medium == media::Type::Video
    }

    /// Time between frames at the stream's declared rate
    ///
    /// Falls back to the average rate, then to [`DEFAULT_FRAME_RATE`].
    pub fn nominal_frame_interval(&self) -> Duration {
        interval_from_rate(self.frame_rate)
            .or_else(|| interval_from_rate(self.avg_frame_rate))
            .unwrap_or_else(default_frame_interval)
    }
}

pub(crate) fn default_frame_interval() -> Duration {
    Duration::from_nanos(1_000_000_000 / DEFAULT_FRAME_RATE)
}

fn interval_from_rate(rate: Rational) -> Option<Duration> {
    let (num, den) = (rate.numerator(), rate.denominator());
    if num <= 0 || den <= 0 {
        return None;
    }
    Some(Duration::from_nanos(
        den as u64 * 1_000_000_000 / num as u64,
    ))
}

/// One demuxed access unit
pub struct CodedPacket {
    pub stream_index: usize,
    pub packet: Packet,
}

/// Outcome of asking a codec for a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receive {
    /// The frame slot now holds a decoded picture
    Frame,
    /// The codec must be fed more packets first
    NeedsInput,
    /// End of stream was signalled and every buffered picture has been returned
    Drained,
}

/// Where a decoded picture's pixels live
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    Host,
    Device,
}

/// Parallelism a codec advertises for software decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingHint {
    Frame,
    Slice,
    Single,
}

impl ThreadingHint {
    /// Prefer frame threads, then slice threads
    pub fn from_support(frame_threads: bool, slice_threads: bool) -> Self {
        if frame_threads {
            ThreadingHint::Frame
        } else if slice_threads {
            ThreadingHint::Slice
        } else {
            ThreadingHint::Single
        }
    }

    pub(crate) fn config(self) -> codec::threading::Config {
        match self {
            ThreadingHint::Frame => codec::threading::Config::kind(codec::threading::Type::Frame),
            ThreadingHint::Slice => codec::threading::Config::kind(codec::threading::Type::Slice),
            ThreadingHint::Single => codec::threading::Config::count(1),
        }
    }
}

/// How the codec instance should be configured before it is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecSetup {
    Software(ThreadingHint),
    Hardware(AccelerationCapability),
}

/// Read side of an open container
pub trait Demuxer {
    fn locator(&self) -> &str;

    fn streams(&self) -> &[StreamInfo];

    /// Index of the video stream the container layer ranks highest
    fn best_video_stream(&self) -> Option<usize>;

    /// Next packet from any stream, or `None` once the container is exhausted
    fn read_packet(&mut self) -> Result<Option<CodedPacket>, DecodeError>;
}

/// Static facts about a decoder implementation
pub trait CodecDescriptor {
    fn name(&self) -> &str;

    fn hw_configs(&self) -> Vec<HwConfig>;

    fn threading_hint(&self) -> ThreadingHint;
}

/// An opened, stateful decoding device
pub trait VideoCodec {
    fn send_packet(&mut self, packet: &Packet) -> Result<(), DecodeError>;

    fn send_eof(&mut self) -> Result<(), DecodeError>;

    fn receive_frame(&mut self, frame: &mut frame::Video) -> Result<Receive, DecodeError>;

    fn residency(&self, frame: &frame::Video) -> Residency {
        let on_device = unsafe { !(*frame.as_ptr()).hw_frames_ctx.is_null() };
        if on_device {
            Residency::Device
        } else {
            Residency::Host
        }
    }

    /// Copy a device-resident picture into `host`
    ///
    /// `host` keeps its buffers between calls once they have been allocated.
    fn transfer_to_host(
        &mut self,
        device: &frame::Video,
        host: &mut frame::Video,
    ) -> Result<(), DecodeError> {
        unsafe {
            let ret = ffi::av_hwframe_transfer_data(host.as_mut_ptr(), device.as_ptr(), 0);
            if ret < 0 {
                return Err(DecodeError::transfer(ffmpeg_next::Error::from(ret)));
            }
            let ret = ffi::av_frame_copy_props(host.as_mut_ptr(), device.as_ptr());
            if ret < 0 {
                return Err(DecodeError::transfer(ffmpeg_next::Error::from(ret)));
            }
        }
        Ok(())
    }
}

/// Factory for the demuxer and codec a session runs on
pub trait MediaBackend {
    type Source: Demuxer;
    type Descriptor: CodecDescriptor;
    type Codec: VideoCodec;

    fn open_source(&self, locator: &str) -> Result<Self::Source, DecodeError>;

    fn find_decoder(&self, stream: &StreamInfo) -> Option<Self::Descriptor>;

    fn available_accelerators(&self) -> Vec<AccelBackend>;

    fn open_codec(
        &self,
        source: &Self::Source,
        stream: &StreamInfo,
        descriptor: &Self::Descriptor,
        setup: &CodecSetup,
    ) -> Result<Self::Codec, DecodeError>;
}
