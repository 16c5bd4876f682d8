use std::io::{self, Write};

use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imgpack::codec::channel::BitWriter;
use imgpack::codec::{
    self, CodecConfig, CodecError, CoverImage, Decoder, Detection, Field, FrameHeader,
    SessionState,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noisy_rgb(width: u32, height: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(width, height, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]))
}

fn write_raw(img: &mut RgbImage, bytes: &[u8]) {
    BitWriter::new(img, 1).write(bytes).unwrap();
}

/// Accepts nothing, as a full disk would.
struct FullSink;

impl Write for FullSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn oversized_payload_leaves_cover_untouched() {
    let config = CodecConfig::default();
    let cover = noisy_rgb(10, 10, 11);
    let data = vec![0x5a; 100];
    let header = FrameHeader::file("secret.bin", data.len() as u64);

    let err = codec::embed(&cover, &mut data.as_slice(), &header, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::CapacityExceeded {
            requested: 134,
            written: 0
        }
    ));
    assert_eq!(cover, noisy_rgb(10, 10, 11));
}

#[test]
fn length_wider_than_its_field_is_rejected() {
    let mut config = CodecConfig::default();
    config.frame.payload_length_width = 2;
    let cover = noisy_rgb(64, 64, 12);
    let data = vec![1u8; 100];
    let header = FrameHeader::file("big.bin", 100);

    let err = codec::embed(&cover, &mut data.as_slice(), &header, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::FieldOverflow {
            field: Field::PayloadLength,
            value: 100,
            width: 2
        }
    ));
}

#[test]
fn tiny_cover_is_too_small_to_code() {
    let config = CodecConfig::default();
    let cover = noisy_rgb(3, 3, 13);
    let header = FrameHeader::file("a", 0);

    let err = codec::embed(&cover, &mut io::empty(), &header, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::TooSmallToCode {
            capacity: 3,
            required: 24
        }
    ));
}

#[test]
fn tiny_image_decodes_as_not_coded() {
    let config = CodecConfig::default();
    let img = noisy_rgb(2, 2, 14);
    assert_eq!(codec::decode(&img, &config).unwrap(), Detection::NotCoded);
    assert!(matches!(
        codec::extract(&img, &mut Vec::new(), &config),
        Err(CodecError::NotCoded)
    ));
}

#[test]
fn non_ascii_name_is_rejected() {
    let config = CodecConfig::default();
    let cover = noisy_rgb(32, 32, 15);
    let header = FrameHeader::file("résumé.txt", 0);

    let err = codec::embed(&cover, &mut io::empty(), &header, &config).unwrap_err();
    assert!(matches!(err, CodecError::NonAsciiField { field: Field::Name }));
}

#[test]
fn source_ending_early_is_a_short_read() {
    let config = CodecConfig::default();
    let cover = noisy_rgb(32, 32, 16);
    let header = FrameHeader::file("short", 10);

    let err = codec::embed(&cover, &mut &b"four"[..], &header, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::ShortRead {
            expected: 10,
            actual: 4
        }
    ));
    assert_eq!(cover, noisy_rgb(32, 32, 16));
}

#[test]
fn declared_length_beyond_channel_is_truncated() {
    let config = CodecConfig::default();
    let mut img = noisy_rgb(10, 10, 17);
    // 29 header bytes leave 271 of the 300 bytes across all eight levels.
    write_raw(&mut img, b"imgpack0001005a.txt0009999999");

    let err = codec::decode(&img, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::TruncatedFrame {
            field: Field::Payload,
            requested: 9_999_999,
            actual: 271
        }
    ));
}

#[test]
fn short_field_after_preamble_is_truncated() {
    let config = CodecConfig::default();
    let mut img = noisy_rgb(10, 10, 18);
    // Name length 999 runs past the end of the channel.
    write_raw(&mut img, b"imgpack0001999");

    let err = codec::decode(&img, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::TruncatedFrame {
            field: Field::Name,
            requested: 999,
            actual: 286
        }
    ));
}

#[test]
fn non_digit_field_is_malformed() {
    let config = CodecConfig::default();
    let mut img = noisy_rgb(16, 16, 19);
    write_raw(&mut img, b"imgpack0x");

    let err = codec::decode(&img, &config).unwrap_err();
    assert!(matches!(
        err,
        CodecError::MalformedField {
            field: Field::PasswordLength,
            ..
        }
    ));
}

#[test]
fn grayscale_cover_is_ineligible() {
    let image = DynamicImage::ImageLuma8(GrayImage::new(16, 16));
    assert!(!codec::validate(&image).is_eligible());

    let err = CoverImage::from_dynamic(image).unwrap_err();
    assert!(matches!(err, CodecError::IneligibleImage { layout } if layout == "L8"));
}

#[test]
fn full_sink_is_a_short_write() {
    let config = CodecConfig::default();
    let cover = noisy_rgb(32, 32, 20);
    let data = vec![7u8; 64];
    let header = FrameHeader::file("x.bin", data.len() as u64);
    let (coded, _) = codec::embed(&cover, &mut data.as_slice(), &header, &config).unwrap();

    let mut decoder = Decoder::new(&coded, &config);
    assert_eq!(decoder.detect().unwrap(), Detection::Coded(header));
    let err = decoder.extract(&mut FullSink).unwrap_err();
    assert!(matches!(err, CodecError::ShortWrite { .. }));
    assert_eq!(decoder.state(), SessionState::Failed);
    assert!(matches!(
        decoder.extract(&mut Vec::new()),
        Err(CodecError::SessionFailed)
    ));
}

#[test]
fn invalid_config_is_reported_before_work() {
    let config = CodecConfig::default().with_ratio(1.5);
    let img = noisy_rgb(8, 8, 21);
    assert!(matches!(
        codec::decode(&img, &config),
        Err(CodecError::Config(_))
    ));
}
