//! End-to-end decoding through the FFmpeg backend
//!
//! Media files are generated on the fly: a YUV4MPEG2 clip for video and a
//! PCM WAV file for an audio-only container.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use hwplay::video::{
    self, DecoderSession, FfmpegBackend, ScalingAlgorithm, SessionKind, SessionOptions,
    SoftwareSession, PRESENTATION_BYTES_PER_PIXEL,
};
use hwplay::DecodeError;

const WIDTH: usize = 64;
const HEIGHT: usize = 48;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("hwplay-it-{}-{}", std::process::id(), name))
}

/// Write a 25 fps 4:2:0 clip whose luma steps up every frame
fn write_y4m(name: &str, frames: usize) -> PathBuf {
    let header = format!("YUV4MPEG2 W{} H{} F25:1 Ip A1:1 C420jpeg\n", WIDTH, HEIGHT);
    let mut data = header.into_bytes();
    for i in 0..frames {
        data.extend_from_slice(b"FRAME\n");
        data.extend(std::iter::repeat(16 + (i as u8) * 40).take(WIDTH * HEIGHT));
        data.extend(std::iter::repeat(128u8).take(WIDTH * HEIGHT / 2));
    }

    let path = temp_path(name);
    fs::write(&path, data).unwrap();
    path
}

/// Write a short 16-bit mono PCM WAV file
fn write_wav(name: &str) -> PathBuf {
    let sample_rate: u32 = 8000;
    let samples = vec![0u8; 1600];

    let mut data = Vec::new();
    data.extend_from_slice(b"RIFF");
    data.extend_from_slice(&(36 + samples.len() as u32).to_le_bytes());
    data.extend_from_slice(b"WAVE");
    data.extend_from_slice(b"fmt ");
    data.extend_from_slice(&16u32.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes()); // PCM
    data.extend_from_slice(&1u16.to_le_bytes()); // mono
    data.extend_from_slice(&sample_rate.to_le_bytes());
    data.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    data.extend_from_slice(&2u16.to_le_bytes());
    data.extend_from_slice(&16u16.to_le_bytes());
    data.extend_from_slice(b"data");
    data.extend_from_slice(&(samples.len() as u32).to_le_bytes());
    data.extend_from_slice(&samples);

    let path = temp_path(name);
    fs::write(&path, data).unwrap();
    path
}

fn software_options() -> SessionOptions {
    SessionOptions {
        prefer_hardware: false,
        ..SessionOptions::default()
    }
}

#[test]
fn test_software_session_decodes_every_frame() {
    video::init().unwrap();
    let path = write_y4m("five.y4m", 5);

    let mut session =
        video::open_session(path.to_str().unwrap(), &software_options()).unwrap();
    assert_eq!(session.kind(), SessionKind::Software);
    assert_eq!(session.nominal_frame_interval(), Duration::from_millis(40));

    let stream = session.stream().unwrap();
    assert_eq!((stream.width, stream.height), (WIDTH as u32, HEIGHT as u32));

    let mut first_pixels = Vec::new();
    while let Some(frame) = session.decode_next_frame().unwrap() {
        assert_eq!((frame.width, frame.height), (WIDTH as u32, HEIGHT as u32));
        assert!(frame.stride >= WIDTH * PRESENTATION_BYTES_PER_PIXEL);
        assert_eq!(frame.rows().count(), HEIGHT);
        first_pixels.push(frame.row(0)[0]);
    }

    assert_eq!(first_pixels.len(), 5);
    assert!(first_pixels.windows(2).all(|w| w[0] < w[1]));

    // End of stream is sticky
    assert!(session.decode_next_frame().unwrap().is_none());
    assert!(session.decode_next_frame().unwrap().is_none());

    fs::remove_file(path).ok();
}

#[test]
fn test_hardware_preference_falls_back_for_rawvideo() {
    video::init().unwrap();
    let path = write_y4m("fallback.y4m", 3);

    let mut session =
        video::open_session(path.to_str().unwrap(), &SessionOptions::default()).unwrap();

    let mut frames = 0;
    while let Some(frame) = session.decode_next_frame().unwrap() {
        assert_eq!(frame.width, WIDTH as u32);
        frames += 1;
    }
    assert_eq!(frames, 3);

    fs::remove_file(path).ok();
}

#[test]
fn test_direct_open_and_scaling_choice() {
    video::init().unwrap();
    let path = write_y4m("direct.y4m", 2);

    let mut session = SoftwareSession::new(FfmpegBackend::new(), ScalingAlgorithm::Point);
    assert!(matches!(session.decode_next_frame(), Err(DecodeError::NotOpen)));

    session.open(path.to_str().unwrap()).unwrap();
    assert!(matches!(
        session.open(path.to_str().unwrap()),
        Err(DecodeError::AlreadyOpen)
    ));
    assert!(session.decode_next_frame().unwrap().is_some());

    fs::remove_file(path).ok();
}

#[test]
fn test_audio_only_container_has_no_video_stream() {
    video::init().unwrap();
    let path = write_wav("tone.wav");

    let result = video::open_session(path.to_str().unwrap(), &software_options());
    assert!(matches!(result, Err(DecodeError::NoStream(_))));

    fs::remove_file(path).ok();
}

#[test]
fn test_missing_file_fails_to_open() {
    video::init().unwrap();
    let path = temp_path("does-not-exist.mp4");

    let result = video::open_session(path.to_str().unwrap(), &software_options());
    match result {
        Err(DecodeError::Open { locator, .. }) => assert_eq!(locator, path.to_str().unwrap()),
        Err(other) => panic!("expected open error, got {other}"),
        Ok(_) => panic!("expected open error"),
    }
}
