//! Conversion from decoded pictures to the presentation layout
//!
//! The scaler and the RGB24 destination buffer are built from the first
//! picture that arrives and reused for every later one. A picture whose
//! format or size differs from that first one is rejected.

use std::fmt;
use std::str::FromStr;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::frame;
use ffmpeg_next::software::scaling;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, FrameLayout};

/// Pixel format every presentation frame is delivered in
pub const PRESENTATION_FORMAT: Pixel = Pixel::RGB24;

/// Bytes per pixel of [`PRESENTATION_FORMAT`]
pub const PRESENTATION_BYTES_PER_PIXEL: usize = 3;

/// Filter used by the conversion stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum ScalingAlgorithm {
    FastBilinear,
    #[default]
    Bilinear,
    Bicubic,
    Point,
    Area,
    Lanczos,
}

impl ScalingAlgorithm {
    fn flags(self) -> scaling::Flags {
        match self {
            ScalingAlgorithm::FastBilinear => scaling::Flags::FAST_BILINEAR,
            ScalingAlgorithm::Bilinear => scaling::Flags::BILINEAR,
            ScalingAlgorithm::Bicubic => scaling::Flags::BICUBIC,
            ScalingAlgorithm::Point => scaling::Flags::POINT,
            ScalingAlgorithm::Area => scaling::Flags::AREA,
            ScalingAlgorithm::Lanczos => scaling::Flags::LANCZOS,
        }
    }
}

impl fmt::Display for ScalingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ScalingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as clap::ValueEnum>::from_str(s, true)
    }
}

/// A converted picture borrowed from the session that produced it
///
/// Valid until the next pull from the same session.
#[derive(Debug, Clone, Copy)]
pub struct PresentationFrame<'a> {
    /// RGB24 rows, `stride` bytes apart
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    /// Presentation timestamp in stream time base units
    pub pts: Option<i64>,
}

impl<'a> PresentationFrame<'a> {
    /// Visible pixels of row `y`, without stride padding
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * PRESENTATION_BYTES_PER_PIXEL]
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.height).map(move |y| self.row(y))
    }
}

struct ConversionContext {
    scaler: scaling::Context,
    source: FrameLayout,
    output: frame::Video,
}

impl ConversionContext {
    fn new(source: FrameLayout, algorithm: ScalingAlgorithm) -> Result<Self, DecodeError> {
        let scaler = scaling::Context::get(
            source.format,
            source.width,
            source.height,
            PRESENTATION_FORMAT,
            source.width,
            source.height,
            algorithm.flags(),
        )
        .map_err(|e| {
            DecodeError::decode(format!("failed to create converter for {}: {}", source, e))
        })?;

        let output = frame::Video::new(PRESENTATION_FORMAT, source.width, source.height);

        tracing::info!(
            "Conversion configured: {} -> {:?} ({:?}, stride {})",
            source,
            PRESENTATION_FORMAT,
            algorithm,
            output.stride(0)
        );

        Ok(Self {
            scaler,
            source,
            output,
        })
    }
}

/// Converts host-resident pictures to RGB24
pub struct PixelConverter {
    algorithm: ScalingAlgorithm,
    context: Option<ConversionContext>,
}

impl PixelConverter {
    pub fn new(algorithm: ScalingAlgorithm) -> Self {
        Self {
            algorithm,
            context: None,
        }
    }

    pub fn algorithm(&self) -> ScalingAlgorithm {
        self.algorithm
    }

    /// Layout the conversion was configured for, once the first picture arrived
    pub fn source_layout(&self) -> Option<FrameLayout> {
        self.context.as_ref().map(|ctx| ctx.source)
    }

    pub fn convert(
        &mut self,
        decoded: &frame::Video,
    ) -> Result<PresentationFrame<'_>, DecodeError> {
        let found = FrameLayout::of(decoded);

        let ctx = match self.context.take() {
            Some(ctx) => ctx,
            None => ConversionContext::new(found, self.algorithm)?,
        };
        let ctx = self.context.insert(ctx);

        let expected = ctx.source;
        if expected != found {
            return Err(DecodeError::ConversionMismatch { expected, found });
        }

        ctx.scaler
            .run(decoded, &mut ctx.output)
            .map_err(|e| match e {
                ffmpeg_next::Error::InputChanged => {
                    DecodeError::ConversionMismatch { expected, found }
                }
                e => DecodeError::decode(e),
            })?;

        Ok(PresentationFrame {
            data: ctx.output.data(0),
            width: ctx.source.width,
            height: ctx.source.height,
            stride: ctx.output.stride(0),
            pts: decoded.timestamp().or_else(|| decoded.pts()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A picture whose planes hold a fixed pattern derived from `seed`
    fn patterned_frame(format: Pixel, width: u32, height: u32, seed: u8) -> frame::Video {
        let mut frame = frame::Video::new(format, width, height);
        for plane in 0..frame.planes() {
            for (i, byte) in frame.data_mut(plane).iter_mut().enumerate() {
                *byte = (i as u8)
                    .wrapping_mul(31)
                    .wrapping_add(plane as u8 * 7)
                    .wrapping_add(seed);
            }
        }
        frame
    }

    fn visible_bytes(frame: &PresentationFrame<'_>) -> Vec<u8> {
        frame.rows().flatten().copied().collect()
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let formats = [
            Pixel::YUV420P,
            Pixel::YUV422P,
            Pixel::YUV444P,
            Pixel::NV12,
            Pixel::GRAY8,
            Pixel::RGB24,
            Pixel::BGRA,
        ];

        for format in formats {
            let input = patterned_frame(format, 64, 48, 5);
            let copy = patterned_frame(format, 64, 48, 5);

            let mut first = PixelConverter::new(ScalingAlgorithm::Bilinear);
            let a = visible_bytes(&first.convert(&input).unwrap());
            let b = visible_bytes(&first.convert(&copy).unwrap());

            let mut second = PixelConverter::new(ScalingAlgorithm::Bilinear);
            let c = visible_bytes(&second.convert(&copy).unwrap());

            assert_eq!(a.len(), 64 * 48 * 3, "{:?}", format);
            assert_eq!(a, b, "{:?} differs on reuse", format);
            assert_eq!(a, c, "{:?} differs between converters", format);
        }
    }

    #[test]
    fn test_presentation_layout() {
        let input = patterned_frame(Pixel::YUV420P, 70, 30, 0);
        let mut converter = PixelConverter::new(ScalingAlgorithm::default());
        let frame = converter.convert(&input).unwrap();

        assert_eq!(frame.width, 70);
        assert_eq!(frame.height, 30);
        assert!(frame.stride >= 70 * PRESENTATION_BYTES_PER_PIXEL);
        assert!(frame.data.len() >= frame.stride * 29 + 70 * PRESENTATION_BYTES_PER_PIXEL);
        assert_eq!(frame.rows().count(), 30);
    }

    #[test]
    fn test_size_change_is_rejected() {
        let mut converter = PixelConverter::new(ScalingAlgorithm::Bilinear);
        converter
            .convert(&patterned_frame(Pixel::YUV420P, 64, 48, 0))
            .unwrap();

        let err = converter
            .convert(&patterned_frame(Pixel::YUV420P, 32, 32, 0))
            .unwrap_err();
        match err {
            DecodeError::ConversionMismatch { expected, found } => {
                assert_eq!(expected, FrameLayout::new(Pixel::YUV420P, 64, 48));
                assert_eq!(found, FrameLayout::new(Pixel::YUV420P, 32, 32));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_format_change_is_rejected() {
        let mut converter = PixelConverter::new(ScalingAlgorithm::Bilinear);
        converter
            .convert(&patterned_frame(Pixel::YUV420P, 64, 48, 0))
            .unwrap();

        let err = converter
            .convert(&patterned_frame(Pixel::NV12, 64, 48, 0))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ConversionMismatch { .. }));
        assert_eq!(
            converter.source_layout(),
            Some(FrameLayout::new(Pixel::YUV420P, 64, 48))
        );
    }

    #[test]
    fn test_scaling_algorithm_parse() {
        assert_eq!("lanczos".parse::<ScalingAlgorithm>(), Ok(ScalingAlgorithm::Lanczos));
        assert_eq!(
            "fast-bilinear".parse::<ScalingAlgorithm>(),
            Ok(ScalingAlgorithm::FastBilinear)
        );
        assert!("nearest".parse::<ScalingAlgorithm>().is_err());
    }
}
