use rtsp_preview::detect::container::{detect_container, detect_image, ContainerFormat, ImageFormat};
use rtsp_preview::detect::embed::parse_embed_target;
use rtsp_preview::detect::media_kind::{kind_from_extension, kind_from_mime, MediaKind};
use rtsp_preview::source::direct::head_matches;

#[test]
fn test_detect_mp4() {
    // MP4/MOV: bytes 4..8 = "ftyp"
    let mut header = vec![0u8; 256];
    header[0..4].copy_from_slice(&8u32.to_be_bytes());
    header[4..8].copy_from_slice(b"ftyp");
    assert_eq!(detect_container(&header), ContainerFormat::Mp4);
}

#[test]
fn test_detect_mkv() {
    let mut header = vec![0u8; 256];
    header[0..4].copy_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]);
    assert_eq!(detect_container(&header), ContainerFormat::Matroska);
}

#[test]
fn test_detect_ts() {
    // MPEG-TS: sync byte 0x47 at offsets 0 and 188
    let mut header = vec![0u8; 256];
    header[0] = 0x47;
    header[188] = 0x47;
    assert_eq!(detect_container(&header), ContainerFormat::TransportStream);
}

#[test]
fn test_detect_images() {
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    assert_eq!(detect_image(&png), Some(ImageFormat::Png));
    assert_eq!(detect_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
    assert_eq!(detect_image(b"GIF89a...."), Some(ImageFormat::Gif));
    assert_eq!(detect_image(b"RIFF\x10\0\0\0WEBPVP8 "), Some(ImageFormat::Webp));
    assert_eq!(detect_image(b"<html></html>"), None);
}

#[test]
fn test_head_matches_requested_kind() {
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    assert!(head_matches(MediaKind::Image, &png));
    assert!(!head_matches(MediaKind::Video, &png));

    let mut mp4 = vec![0u8; 16];
    mp4[4..8].copy_from_slice(b"ftyp");
    assert!(head_matches(MediaKind::Video, &mp4));
    assert!(!head_matches(MediaKind::Image, &mp4));
}

#[test]
fn test_header_wins_over_extension() {
    // Resolution order: content-type first, extension only when it is ambiguous.
    let url = "https://cdn.test/poster.mp4";
    let kind = kind_from_mime("image/png").or_else(|| kind_from_extension(url));
    assert_eq!(kind, Some(MediaKind::Image));

    let kind = kind_from_mime("application/octet-stream").or_else(|| kind_from_extension(url));
    assert_eq!(kind, Some(MediaKind::Video));
}

#[test]
fn test_embed_short_link_with_start() {
    let target = parse_embed_target("https://youtu.be/ABC123?t=42").unwrap();
    let embed = target.embed_url();
    assert!(embed.contains("ABC123"));
    assert!(embed.contains("start=42"));
}
