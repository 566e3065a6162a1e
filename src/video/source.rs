//! FFmpeg container source

use ffmpeg_next::{format, media, Packet};

use super::backend::{CodedPacket, Demuxer, StreamInfo};
use crate::error::DecodeError;

/// An opened FFmpeg input with its stream headers already read
pub struct FfmpegSource {
    locator: String,
    input: format::context::Input,
    streams: Vec<StreamInfo>,
}

impl FfmpegSource {
    /// Open a file path or URL and read its stream table
    pub fn open(locator: &str) -> Result<Self, DecodeError> {
        let input = format::input(&locator).map_err(|e| DecodeError::open(locator, e))?;

        let streams: Vec<StreamInfo> = input.streams().map(|s| stream_info(&s)).collect();
        tracing::debug!("Opened {} with {} stream(s)", locator, streams.len());

        Ok(Self {
            locator: locator.to_string(),
            input,
            streams,
        })
    }

    pub(crate) fn input(&self) -> &format::context::Input {
        &self.input
    }
}

fn stream_info(stream: &format::stream::Stream) -> StreamInfo {
    let parameters = stream.parameters();
    let (width, height) = unsafe {
        let raw = parameters.as_ptr();
        ((*raw).width.max(0) as u32, (*raw).height.max(0) as u32)
    };

    StreamInfo {
        index: stream.index(),
        medium: parameters.medium(),
        codec_id: parameters.id(),
        width,
        height,
        frame_rate: stream.rate(),
        avg_frame_rate: stream.avg_frame_rate(),
        time_base: stream.time_base(),
    }
}

impl Demuxer for FfmpegSource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn best_video_stream(&self) -> Option<usize> {
        self.input
            .streams()
            .best(media::Type::Video)
            .map(|stream| stream.index())
    }

    fn read_packet(&mut self) -> Result<Option<CodedPacket>, DecodeError> {
        let mut packet = Packet::empty();
        loop {
            match packet.read(&mut self.input) {
                Ok(()) => {
                    return Ok(Some(CodedPacket {
                        stream_index: packet.stream(),
                        packet,
                    }))
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::error::EAGAIN,
                }) => continue,
                Err(e) => return Err(DecodeError::decode(e)),
            }
        }
    }
}
