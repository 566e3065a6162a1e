//! Hardware decoder session
//!
//! Frames decode on the device and are copied to system memory before
//! conversion.

use std::time::Duration;

use ffmpeg_next::frame;

use super::{interval_of, select_stream, DecoderSession, Pipeline, SessionKind};
use crate::error::DecodeError;
use crate::video::accel::AccelerationCapability;
use crate::video::backend::{CodecSetup, MediaBackend, Residency, StreamInfo, VideoCodec};
use crate::video::codec::FfmpegBackend;
use crate::video::convert::{PixelConverter, PresentationFrame, ScalingAlgorithm};

/// Session decoding on a hardware device
///
/// Device-resident pictures are copied into a host slot before conversion.
pub struct HardwareSession<B: MediaBackend = FfmpegBackend> {
    backend: B,
    capability: AccelerationCapability,
    pipeline: Option<Pipeline<B>>,
    /// Picture as the codec returned it, possibly in device memory
    device_frame: frame::Video,
    /// Host copy of `device_frame`, reused across transfers
    host_frame: frame::Video,
    converter: PixelConverter,
}

impl<B: MediaBackend> HardwareSession<B> {
    pub fn new(backend: B, capability: AccelerationCapability, scaling: ScalingAlgorithm) -> Self {
        Self {
            backend,
            capability,
            pipeline: None,
            device_frame: frame::Video::empty(),
            host_frame: frame::Video::empty(),
            converter: PixelConverter::new(scaling),
        }
    }

    pub fn capability(&self) -> AccelerationCapability {
        self.capability
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
        let setup = CodecSetup::Hardware(self.capability);
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

impl<B: MediaBackend> DecoderSession for HardwareSession<B> {
    fn kind(&self) -> SessionKind {
        SessionKind::Hardware(self.capability.backend)
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
        if !pipeline.next_decoded(&mut self.device_frame)? {
            return Ok(None);
        }

        let host = match pipeline.codec().residency(&self.device_frame) {
            Residency::Device => {
                pipeline
                    .codec_mut()
                    .transfer_to_host(&self.device_frame, &mut self.host_frame)?;
                &self.host_frame
            }
            Residency::Host => &self.device_frame,
        };

        self.converter.convert(host).map(Some)
    }

    fn nominal_frame_interval(&self) -> Duration {
        interval_of(self.pipeline.as_ref())
    }

    fn stream(&self) -> Option<&StreamInfo> {
        self.pipeline.as_ref().map(Pipeline::stream)
    }
}
