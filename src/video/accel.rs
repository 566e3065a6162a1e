//! Hardware acceleration negotiation
//!
//! Matches the process's available FFmpeg hardware device types against the
//! configurations a codec advertises. The first allow-listed backend with a
//! device-context configuration wins; no match means software decoding.

use std::fmt;
use std::ptr;
use std::str::FromStr;

use ffmpeg_next::ffi;
use ffmpeg_next::format::Pixel;

use super::backend::CodecDescriptor;
use crate::error::DecodeError;

/// `AV_CODEC_HW_CONFIG_METHOD_HW_DEVICE_CTX`
pub(crate) const HW_CONFIG_METHOD_HW_DEVICE_CTX: i32 = 0x01;

/// Hardware device families FFmpeg can decode on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccelBackend {
    /// NVIDIA CUDA / NVDEC
    Cuda,
    /// Linux VA-API
    Vaapi,
    /// Linux VDPAU
    Vdpau,
    /// macOS VideoToolbox
    VideoToolbox,
    /// Windows D3D11VA
    D3d11va,
    /// Windows DXVA2
    Dxva2,
    /// Intel QuickSync
    Qsv,
    OpenCl,
    Vulkan,
    Drm,
}

impl AccelBackend {
    pub const ALL: [AccelBackend; 10] = [
        AccelBackend::Cuda,
        AccelBackend::Vaapi,
        AccelBackend::Vdpau,
        AccelBackend::VideoToolbox,
        AccelBackend::D3d11va,
        AccelBackend::Dxva2,
        AccelBackend::Qsv,
        AccelBackend::OpenCl,
        AccelBackend::Vulkan,
        AccelBackend::Drm,
    ];

    /// Backends that are trusted for production decoding unless configured otherwise
    pub fn default_allow_list() -> Vec<AccelBackend> {
        vec![
            AccelBackend::Cuda,
            AccelBackend::VideoToolbox,
            AccelBackend::Vaapi,
            AccelBackend::D3d11va,
            AccelBackend::OpenCl,
        ]
    }

    /// Name used by FFmpeg and in settings files
    pub fn name(&self) -> &'static str {
        match self {
            AccelBackend::Cuda => "cuda",
            AccelBackend::Vaapi => "vaapi",
            AccelBackend::Vdpau => "vdpau",
            AccelBackend::VideoToolbox => "videotoolbox",
            AccelBackend::D3d11va => "d3d11va",
            AccelBackend::Dxva2 => "dxva2",
            AccelBackend::Qsv => "qsv",
            AccelBackend::OpenCl => "opencl",
            AccelBackend::Vulkan => "vulkan",
            AccelBackend::Drm => "drm",
        }
    }

    pub(crate) fn device_type(self) -> ffi::AVHWDeviceType {
        use ffi::AVHWDeviceType::*;
        match self {
            AccelBackend::Cuda => AV_HWDEVICE_TYPE_CUDA,
            AccelBackend::Vaapi => AV_HWDEVICE_TYPE_VAAPI,
            AccelBackend::Vdpau => AV_HWDEVICE_TYPE_VDPAU,
            AccelBackend::VideoToolbox => AV_HWDEVICE_TYPE_VIDEOTOOLBOX,
            AccelBackend::D3d11va => AV_HWDEVICE_TYPE_D3D11VA,
            AccelBackend::Dxva2 => AV_HWDEVICE_TYPE_DXVA2,
            AccelBackend::Qsv => AV_HWDEVICE_TYPE_QSV,
            AccelBackend::OpenCl => AV_HWDEVICE_TYPE_OPENCL,
            AccelBackend::Vulkan => AV_HWDEVICE_TYPE_VULKAN,
            AccelBackend::Drm => AV_HWDEVICE_TYPE_DRM,
        }
    }

    pub(crate) fn from_device_type(device_type: ffi::AVHWDeviceType) -> Option<Self> {
        AccelBackend::ALL
            .into_iter()
            .find(|backend| backend.device_type() == device_type)
    }
}

impl fmt::Display for AccelBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AccelBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        AccelBackend::ALL
            .into_iter()
            .find(|backend| backend.name() == wanted)
            .ok_or_else(|| format!("unknown hardware backend '{}'", s))
    }
}

/// One hardware configuration entry advertised by a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HwConfig {
    pub backend: AccelBackend,
    /// Pixel format of frames left in device memory
    pub pixel_format: Pixel,
    /// Whether the codec accepts a device context for this backend
    pub device_ctx: bool,
}

/// Result of a successful negotiation, fixed for the life of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccelerationCapability {
    pub backend: AccelBackend,
    pub device_format: Pixel,
}

/// Chooses a hardware backend for a codec
///
/// Only the codec descriptor and the list of available backends are
/// consulted; container and stream state never enter the decision.
#[derive(Debug, Clone)]
pub struct AccelerationNegotiator {
    allow_list: Vec<AccelBackend>,
}

impl AccelerationNegotiator {
    pub fn new(allow_list: Vec<AccelBackend>) -> Self {
        Self { allow_list }
    }

    pub fn allow_list(&self) -> &[AccelBackend] {
        &self.allow_list
    }

    /// First allow-listed backend, in `available` order, that the codec supports
    pub fn negotiate<D>(
        &self,
        available: &[AccelBackend],
        codec: &D,
    ) -> Option<AccelerationCapability>
    where
        D: CodecDescriptor + ?Sized,
    {
        if self.allow_list.is_empty() {
            tracing::debug!("Hardware allow-list is empty, using software decode");
            return None;
        }

        let configs = codec.hw_configs();
        let chosen = available
            .iter()
            .filter(|backend| self.allow_list.contains(backend))
            .find_map(|backend| {
                configs
                    .iter()
                    .find(|config| config.backend == *backend && config.device_ctx)
                    .map(|config| AccelerationCapability {
                        backend: *backend,
                        device_format: config.pixel_format,
                    })
            });

        match chosen {
            Some(capability) => tracing::info!(
                "Using hardware backend {} ({:?}) for decoder {}",
                capability.backend,
                capability.device_format,
                codec.name()
            ),
            None => tracing::info!(
                "Decoder {} has no configuration for allowed backends {:?}",
                codec.name(),
                self.allow_list
            ),
        }

        chosen
    }
}

impl Default for AccelerationNegotiator {
    fn default() -> Self {
        Self::new(AccelBackend::default_allow_list())
    }
}

/// Device types compiled into the linked FFmpeg, in FFmpeg's iteration order
pub fn available_accelerators() -> Vec<AccelBackend> {
    let mut backends = Vec::new();
    let mut device_type = ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_NONE;
    loop {
        device_type = unsafe { ffi::av_hwdevice_iterate_types(device_type) };
        if device_type == ffi::AVHWDeviceType::AV_HWDEVICE_TYPE_NONE {
            break;
        }
        if let Some(backend) = AccelBackend::from_device_type(device_type) {
            backends.push(backend);
        }
    }
    backends
}

/// Owned FFmpeg hardware device context
pub(crate) struct HwDeviceContext {
    ctx: *mut ffi::AVBufferRef,
    backend: AccelBackend,
}

impl HwDeviceContext {
    /// Create a device context on the default device of `backend`
    pub fn create(backend: AccelBackend) -> Result<Self, DecodeError> {
        let mut ctx: *mut ffi::AVBufferRef = ptr::null_mut();
        let ret = unsafe {
            ffi::av_hwdevice_ctx_create(
                &mut ctx,
                backend.device_type(),
                ptr::null(),
                ptr::null_mut(),
                0,
            )
        };

        if ret < 0 || ctx.is_null() {
            return Err(DecodeError::device(format!(
                "failed to create {} device context: {}",
                backend,
                ffmpeg_next::Error::from(ret)
            )));
        }

        tracing::debug!("Created {} device context", backend);
        Ok(Self { ctx, backend })
    }

    /// Give the codec context its own reference to this device
    pub fn attach(
        &self,
        context: &mut ffmpeg_next::codec::context::Context,
    ) -> Result<(), DecodeError> {
        unsafe {
            let reference = ffi::av_buffer_ref(self.ctx);
            if reference.is_null() {
                return Err(DecodeError::device("failed to reference device context"));
            }
            (*context.as_mut_ptr()).hw_device_ctx = reference;
        }
        Ok(())
    }
}

impl Drop for HwDeviceContext {
    fn drop(&mut self) {
        if !self.ctx.is_null() {
            unsafe {
                ffi::av_buffer_unref(&mut self.ctx);
            }
            tracing::debug!("Released {} device context", self.backend);
        }
    }
}

// SAFETY: the buffer reference is exclusively owned and FFmpeg reference
// counting is thread-safe.
unsafe impl Send for HwDeviceContext {}
