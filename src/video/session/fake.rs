//! Scripted backend for exercising sessions without real media

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::{codec, frame, media, Packet, Rational};

use crate::error::DecodeError;
use crate::video::accel::{AccelBackend, HwConfig};
use crate::video::backend::{
    CodecDescriptor, CodecSetup, CodedPacket, Demuxer, MediaBackend, Receive, Residency,
    StreamInfo, ThreadingHint, VideoCodec,
};

pub(crate) struct FakeStream(StreamInfo);

impl FakeStream {
    pub fn video(index: usize, width: u32, height: u32) -> Self {
        Self(StreamInfo {
            index,
            medium: media::Type::Video,
            codec_id: codec::Id::RAWVIDEO,
            width,
            height,
            frame_rate: Rational::new(25, 1),
            avg_frame_rate: Rational::new(25, 1),
            time_base: Rational::new(1, 25),
        })
    }

    pub fn audio(index: usize) -> Self {
        Self(StreamInfo {
            index,
            medium: media::Type::Audio,
            codec_id: codec::Id::PCM_S16LE,
            width: 0,
            height: 0,
            frame_rate: Rational::new(0, 1),
            avg_frame_rate: Rational::new(0, 1),
            time_base: Rational::new(1, 48000),
        })
    }

    pub fn with_rate(mut self, num: i32, den: i32) -> Self {
        self.0.frame_rate = Rational::new(num, den);
        self
    }
}

#[derive(Default)]
struct Counters {
    sources: Cell<usize>,
    codecs: Cell<usize>,
    packets: Cell<usize>,
    eofs: Cell<usize>,
    transfers: Cell<usize>,
}

fn bump(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

#[derive(Clone)]
pub(crate) struct FakeBackend {
    streams: Vec<StreamInfo>,
    frames: usize,
    packets_per_frame: usize,
    delay: usize,
    interleaved_audio: bool,
    has_decoder: bool,
    hw_configs: Vec<HwConfig>,
    device_frames: bool,
    failing_transfer: bool,
    failing_device: bool,
    failing_hw_codec: bool,
    counters: Rc<Counters>,
}

impl FakeBackend {
    pub fn new(streams: Vec<FakeStream>) -> Self {
        Self {
            streams: streams.into_iter().map(|s| s.0).collect(),
            frames: 0,
            packets_per_frame: 1,
            delay: 0,
            interleaved_audio: false,
            has_decoder: true,
            hw_configs: Vec::new(),
            device_frames: false,
            failing_transfer: false,
            failing_device: false,
            failing_hw_codec: false,
            counters: Rc::new(Counters::default()),
        }
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_packets_per_frame(mut self, packets: usize) -> Self {
        self.packets_per_frame = packets.max(1);
        self
    }

    /// Hold back `frames` pictures until EOF, like a reordering decoder
    pub fn with_delay(mut self, frames: usize) -> Self {
        self.delay = frames;
        self
    }

    pub fn with_interleaved_audio(mut self) -> Self {
        self.interleaved_audio = true;
        self
    }

    pub fn without_decoder(mut self) -> Self {
        self.has_decoder = false;
        self
    }

    pub fn with_hw_config(mut self, backend: AccelBackend) -> Self {
        self.hw_configs.push(HwConfig {
            backend,
            pixel_format: Pixel::NV12,
            device_ctx: true,
        });
        self
    }

    pub fn with_device_frames(mut self) -> Self {
        self.device_frames = true;
        self
    }

    pub fn with_failing_transfer(mut self) -> Self {
        self.failing_transfer = true;
        self
    }

    pub fn with_failing_device(mut self) -> Self {
        self.failing_device = true;
        self
    }

    /// Device creation succeeds but the hardware codec refuses to open
    pub fn with_failing_hw_codec(mut self) -> Self {
        self.failing_hw_codec = true;
        self
    }

    pub fn sources_opened(&self) -> usize {
        self.counters.sources.get()
    }

    pub fn codecs_opened(&self) -> usize {
        self.counters.codecs.get()
    }

    pub fn packets_sent(&self) -> usize {
        self.counters.packets.get()
    }

    pub fn eofs_sent(&self) -> usize {
        self.counters.eofs.get()
    }

    pub fn transfers(&self) -> usize {
        self.counters.transfers.get()
    }
}

pub(crate) struct FakeSource {
    locator: String,
    streams: Vec<StreamInfo>,
    packets: VecDeque<CodedPacket>,
}

impl Demuxer for FakeSource {
    fn locator(&self) -> &str {
        &self.locator
    }

    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn best_video_stream(&self) -> Option<usize> {
        self.streams.iter().find(|s| s.is_video()).map(|s| s.index)
    }

    fn read_packet(&mut self) -> Result<Option<CodedPacket>, DecodeError> {
        Ok(self.packets.pop_front())
    }
}

pub(crate) struct FakeDescriptor {
    hw_configs: Vec<HwConfig>,
}

impl CodecDescriptor for FakeDescriptor {
    fn name(&self) -> &str {
        "fake"
    }

    fn hw_configs(&self) -> Vec<HwConfig> {
        self.hw_configs.clone()
    }

    fn threading_hint(&self) -> ThreadingHint {
        ThreadingHint::Frame
    }
}

pub(crate) struct FakeCodec {
    width: u32,
    height: u32,
    packets_per_frame: usize,
    delay: usize,
    received: usize,
    next_pts: i64,
    buffered: VecDeque<i64>,
    ready: VecDeque<i64>,
    eof: bool,
    device_frames: bool,
    failing_transfer: bool,
    counters: Rc<Counters>,
}

impl VideoCodec for FakeCodec {
    fn send_packet(&mut self, _packet: &Packet) -> Result<(), DecodeError> {
        bump(&self.counters.packets);
        self.received += 1;
        if self.received % self.packets_per_frame == 0 {
            self.buffered.push_back(self.next_pts);
            self.next_pts += 1;
            while self.buffered.len() > self.delay {
                if let Some(pts) = self.buffered.pop_front() {
                    self.ready.push_back(pts);
                }
            }
        }
        Ok(())
    }

    fn send_eof(&mut self) -> Result<(), DecodeError> {
        bump(&self.counters.eofs);
        self.eof = true;
        self.ready.extend(self.buffered.drain(..));
        Ok(())
    }

    fn receive_frame(&mut self, frame: &mut frame::Video) -> Result<Receive, DecodeError> {
        let Some(pts) = self.ready.pop_front() else {
            return Ok(if self.eof {
                Receive::Drained
            } else {
                Receive::NeedsInput
            });
        };

        if frame.width() != self.width
            || frame.height() != self.height
            || frame.format() != Pixel::YUV420P
        {
            *frame = frame::Video::new(Pixel::YUV420P, self.width, self.height);
        }
        for plane in 0..frame.planes() {
            let fill = (pts as u8).wrapping_mul(17).wrapping_add(plane as u8 * 40);
            frame.data_mut(plane).fill(fill);
        }
        frame.set_pts(Some(pts));
        Ok(Receive::Frame)
    }

    fn residency(&self, _frame: &frame::Video) -> Residency {
        if self.device_frames {
            Residency::Device
        } else {
            Residency::Host
        }
    }

    fn transfer_to_host(
        &mut self,
        device: &frame::Video,
        host: &mut frame::Video,
    ) -> Result<(), DecodeError> {
        if self.failing_transfer {
            return Err(DecodeError::transfer("device lost"));
        }
        bump(&self.counters.transfers);
        if host.width() == device.width() && host.height() == device.height() {
            host.clone_from(device);
        } else {
            *host = device.clone();
        }
        Ok(())
    }
}

impl MediaBackend for FakeBackend {
    type Source = FakeSource;
    type Descriptor = FakeDescriptor;
    type Codec = FakeCodec;

    fn open_source(&self, locator: &str) -> Result<FakeSource, DecodeError> {
        bump(&self.counters.sources);

        let video = self.streams.iter().find(|s| s.is_video()).map(|s| s.index);
        let audio = self.streams.iter().find(|s| !s.is_video()).map(|s| s.index);

        let mut packets = VecDeque::new();
        if let Some(video) = video {
            for i in 0..self.frames * self.packets_per_frame {
                packets.push_back(CodedPacket {
                    stream_index: video,
                    packet: Packet::copy(&[i as u8; 16]),
                });
                if let (true, Some(audio)) = (self.interleaved_audio, audio) {
                    packets.push_back(CodedPacket {
                        stream_index: audio,
                        packet: Packet::copy(&[0u8; 8]),
                    });
                }
            }
        }

        Ok(FakeSource {
            locator: locator.to_string(),
            streams: self.streams.clone(),
            packets,
        })
    }

    fn find_decoder(&self, _stream: &StreamInfo) -> Option<FakeDescriptor> {
        self.has_decoder.then(|| FakeDescriptor {
            hw_configs: self.hw_configs.clone(),
        })
    }

    fn available_accelerators(&self) -> Vec<AccelBackend> {
        AccelBackend::ALL.to_vec()
    }

    fn open_codec(
        &self,
        _source: &FakeSource,
        stream: &StreamInfo,
        _descriptor: &FakeDescriptor,
        setup: &CodecSetup,
    ) -> Result<FakeCodec, DecodeError> {
        let on_device = matches!(setup, CodecSetup::Hardware(_));
        if on_device && self.failing_device {
            return Err(DecodeError::device("no such device"));
        }
        if on_device && self.failing_hw_codec {
            return Err(DecodeError::codec("failed to open fake: unsupported profile"));
        }
        bump(&self.counters.codecs);

        Ok(FakeCodec {
            width: stream.width,
            height: stream.height,
            packets_per_frame: self.packets_per_frame,
            delay: self.delay,
            received: 0,
            next_pts: 0,
            buffered: VecDeque::new(),
            ready: VecDeque::new(),
            eof: false,
            device_frames: on_device && self.device_frames,
            failing_transfer: self.failing_transfer,
            counters: Rc::clone(&self.counters),
        })
    }
}
