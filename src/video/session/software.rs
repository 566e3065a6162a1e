//! Software decoder session

use std::time::Duration;

use ffmpeg_next::frame;

use super::{interval_of, select_stream, DecoderSession, Pipeline, SessionKind};
use crate::error::DecodeError;
use crate::video::backend::{CodecDescriptor, CodecSetup, MediaBackend, StreamInfo};
use crate::video::codec::FfmpegBackend;
use crate::video::convert::{PixelConverter, PresentationFrame, ScalingAlgorithm};

/// Session decoding on the CPU
pub struct SoftwareSession<B: MediaBackend = FfmpegBackend> {
    backend: B,
    pipeline: Option<Pipeline<B>>,
    decoded: frame::Video,
    converter: PixelConverter,
}

impl<B: MediaBackend> SoftwareSession<B> {
    pub fn new(backend: B, scaling: ScalingAlgorithm) -> Self {
        Self {
            backend,
            pipeline: None,
            decoded: frame::Video::empty(),
            converter: PixelConverter::new(scaling),
        }
    }

    /// Open the codec on an already-opened source and selected stream
    pub fn attach(
        &mut self,
        source: B::Source,
        stream: StreamInfo,
        descriptor: &B::Descriptor,
    ) -> Result<(), DecodeError> {
        if self.pipeline.is_some() {
            return Err(DecodeError::AlreadyOpen);
        }
        let hint = descriptor.threading_hint();
        tracing::debug!("Software decode of {} with {:?} threading", descriptor.name(), hint);

        let setup = CodecSetup::Software(hint);
        self.pipeline = Some(Pipeline::start(
            &self.backend,
            source,
            stream,
            descriptor,
            &setup,
        )?);
        Ok(())
    }
}

impl<B: MediaBackend> DecoderSession for SoftwareSession<B> {
    fn kind(&self) -> SessionKind {
        SessionKind::Software
    }

    fn open(&mut self, locator: &str) -> Result<(), DecodeError> {
        if self.pipeline.is_some() {
            return Err(DecodeError::AlreadyOpen);
        }
        let source = self.backend.open_source(locator)?;
        let (stream, descriptor) = select_stream(&self.backend, &source)?;
        self.attach(source, stream, &descriptor)
    }

    fn decode_next_frame(&mut self) -> Result<Option<PresentationFrame<'_>>, DecodeError> {
        let pipeline = self.pipeline.as_mut().ok_or(DecodeError::NotOpen)?;
        if !pipeline.next_decoded(&mut self.decoded)? {
            return Ok(None);
        }
        self.converter.convert(&self.decoded).map(Some)
    }

    fn nominal_frame_interval(&self) -> Duration {
        interval_of(self.pipeline.as_ref())
    }

    fn stream(&self) -> Option<&StreamInfo> {
        self.pipeline.as_ref().map(Pipeline::stream)
    }
}
