// Magic-byte sniffing for the first bytes of a resource.

#[derive(Debug, PartialEq)]
pub enum ContainerFormat {
    Mp4,
    Matroska, // MKV/WebM
    TransportStream,
    Ogg,
    Unknown,
}

#[derive(Debug, PartialEq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
}

/// Detect a video container from header bytes.
pub fn detect_container(header: &[u8]) -> ContainerFormat {
    // MP4/MOV: bytes 4..8 == "ftyp"
    if header.len() >= 8 && &header[4..8] == b"ftyp" {
        return ContainerFormat::Mp4;
    }

    // MKV/WebM: EBML magic bytes at offset 0
    if header.len() >= 4 && header[0..4] == [0x1A, 0x45, 0xDF, 0xA3] {
        return ContainerFormat::Matroska;
    }

    // MPEG-TS: sync byte 0x47 at offset 0 and offset 188
    if header.len() > 188 && header[0] == 0x47 && header[188] == 0x47 {
        return ContainerFormat::TransportStream;
    }

    if header.starts_with(b"OggS") {
        return ContainerFormat::Ogg;
    }

    ContainerFormat::Unknown
}

/// Detect an image format from header bytes.
pub fn detect_image(header: &[u8]) -> Option<ImageFormat> {
    if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageFormat::Png);
    }
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    // RIFF....WEBP
    if header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if header.starts_with(b"BM") && header.len() >= 14 {
        return Some(ImageFormat::Bmp);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_header_is_unknown() {
        assert_eq!(detect_container(&[0x00, 0x01]), ContainerFormat::Unknown);
        assert_eq!(detect_image(&[]), None);
    }

    #[test]
    fn test_riff_without_webp_is_not_image() {
        let mut header = b"RIFF\0\0\0\0AVI ".to_vec();
        header.resize(32, 0);
        assert_eq!(detect_image(&header), None);
    }
}
