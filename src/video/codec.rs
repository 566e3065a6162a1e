//! FFmpeg decoder and backend

use ffmpeg_next::{codec, decoder, ffi, frame, Packet};

use super::accel::{
    self, AccelBackend, HwConfig, HwDeviceContext, HW_CONFIG_METHOD_HW_DEVICE_CTX,
};
use super::backend::{
    CodecDescriptor, CodecSetup, MediaBackend, Receive, StreamInfo, ThreadingHint, VideoCodec,
};
use super::source::FfmpegSource;
use crate::error::DecodeError;

impl CodecDescriptor for ffmpeg_next::Codec {
    fn name(&self) -> &str {
        ffmpeg_next::Codec::name(self)
    }

    fn hw_configs(&self) -> Vec<HwConfig> {
        let mut configs = Vec::new();
        for index in 0.. {
            let config = unsafe { ffi::avcodec_get_hw_config(self.as_ptr(), index) };
            if config.is_null() {
                break;
            }
            let (device_type, pixel_format, methods) =
                unsafe { ((*config).device_type, (*config).pix_fmt, (*config).methods) };

            if let Some(backend) = AccelBackend::from_device_type(device_type) {
                configs.push(HwConfig {
                    backend,
                    pixel_format: pixel_format.into(),
                    device_ctx: methods & HW_CONFIG_METHOD_HW_DEVICE_CTX != 0,
                });
            }
        }
        configs
    }

    fn threading_hint(&self) -> ThreadingHint {
        let capabilities = self.capabilities();
        ThreadingHint::from_support(
            capabilities.contains(codec::Capabilities::FRAME_THREADS),
            capabilities.contains(codec::Capabilities::SLICE_THREADS),
        )
    }
}

/// An opened FFmpeg video decoder
pub struct FfmpegCodec {
    decoder: decoder::Video,
    /// Must outlive `decoder`, which holds its own reference
    _device: Option<HwDeviceContext>,
}

impl VideoCodec for FfmpegCodec {
    fn send_packet(&mut self, packet: &Packet) -> Result<(), DecodeError> {
        self.decoder.send_packet(packet).map_err(DecodeError::decode)
    }

    fn send_eof(&mut self) -> Result<(), DecodeError> {
        self.decoder.send_eof().map_err(DecodeError::decode)
    }

    fn receive_frame(&mut self, frame: &mut frame::Video) -> Result<Receive, DecodeError> {
        match self.decoder.receive_frame(frame) {
            Ok(()) => Ok(Receive::Frame),
            Err(ffmpeg_next::Error::Other {
                errno: ffmpeg_next::error::EAGAIN,
            }) => Ok(Receive::NeedsInput),
            Err(ffmpeg_next::Error::Eof) => Ok(Receive::Drained),
            Err(e) => Err(DecodeError::decode(e)),
        }
    }
}

/// Production backend over the linked FFmpeg libraries
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for FfmpegBackend {
    type Source = FfmpegSource;
    type Descriptor = ffmpeg_next::Codec;
    type Codec = FfmpegCodec;

    fn open_source(&self, locator: &str) -> Result<FfmpegSource, DecodeError> {
        FfmpegSource::open(locator)
    }

    fn find_decoder(&self, stream: &StreamInfo) -> Option<ffmpeg_next::Codec> {
        decoder::find(stream.codec_id)
    }

    fn available_accelerators(&self) -> Vec<AccelBackend> {
        accel::available_accelerators()
    }

    fn open_codec(
        &self,
        source: &FfmpegSource,
        stream: &StreamInfo,
        descriptor: &ffmpeg_next::Codec,
        setup: &CodecSetup,
    ) -> Result<FfmpegCodec, DecodeError> {
        let parameters = source
            .input()
            .stream(stream.index)
            .ok_or_else(|| DecodeError::codec(format!("stream {} disappeared", stream.index)))?
            .parameters();

        let mut context =
            codec::context::Context::from_parameters(parameters).map_err(DecodeError::codec)?;

        let device = match setup {
            CodecSetup::Software(hint) => {
                context.set_threading(hint.config());
                None
            }
            CodecSetup::Hardware(capability) => {
                let device = HwDeviceContext::create(capability.backend)?;
                device.attach(&mut context)?;
                Some(device)
            }
        };

        let decoder = context
            .decoder()
            .open_as(*descriptor)
            .and_then(|opened| opened.video())
            .map_err(|e| {
                DecodeError::codec(format!("failed to open {}: {}", descriptor.name(), e))
            })?;

        tracing::info!(
            "Opened {} decoder for stream {}: {}x{}, {:?}",
            descriptor.name(),
            stream.index,
            decoder.width(),
            decoder.height(),
            setup
        );

        Ok(FfmpegCodec {
            decoder,
            _device: device,
        })
    }
}
