//! Read the pixel size of a rendered page from its file header.
//!
//! Only the header is interpreted; pixel data is never decoded.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder};

use crate::error::ImageError;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Bytes read before the first attempt; JPEG metadata segments can push
/// the frame header further, in which case the prefix grows.
const HEADER_PREFIX: u64 = 64 * 1024;

/// `(width, height)` in pixels of the PNG or JPEG at `path`.
pub fn image_dimensions<P: AsRef<Path>>(path: P) -> Result<(u32, u32), ImageError> {
    let mut file = File::open(path)?;
    let mut data = Vec::new();
    let mut limit = HEADER_PREFIX;
    loop {
        let wanted = limit - data.len() as u64;
        let read = file.by_ref().take(wanted).read_to_end(&mut data)? as u64;
        match dimensions_from_bytes(&data) {
            // More of the file is left; the header may be in it.
            Err(ImageError::Truncated) if read == wanted => limit = limit.saturating_mul(2),
            result => return result,
        }
    }
}

pub fn dimensions_from_bytes(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if data.starts_with(&PNG_SIGNATURE) {
        png_dimensions(data)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        jpeg_dimensions(data)
    } else {
        Err(ImageError::UnsupportedFormat)
    }
}

/// IHDR is always the first chunk: length, "IHDR", width, height.
fn png_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if data.len() < 24 || &data[12..16] != b"IHDR" {
        return Err(ImageError::Truncated);
    }
    Ok((
        BigEndian::read_u32(&data[16..20]),
        BigEndian::read_u32(&data[20..24]),
    ))
}

/// Walk the marker segments until a start-of-frame header.
fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    let mut pos = 2;
    loop {
        // Markers may be padded with any number of 0xFF fill bytes.
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        let Some(&marker) = data.get(pos) else {
            return Err(ImageError::Truncated);
        };
        pos += 1;

        match marker {
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 => return Err(ImageError::MissingFrameHeader),
            _ => {}
        }

        let segment = data.get(pos..pos + 2).ok_or(ImageError::Truncated)?;
        let length = BigEndian::read_u16(segment) as usize;
        if is_start_of_frame(marker) {
            let frame = data.get(pos + 3..pos + 7).ok_or(ImageError::Truncated)?;
            let height = BigEndian::read_u16(&frame[0..2]) as u32;
            let width = BigEndian::read_u16(&frame[2..4]) as u32;
            return Ok((width, height));
        }
        if length < 2 {
            return Err(ImageError::Truncated);
        }
        pos += length;
    }
}

/// SOF0..SOF15, except DHT (C4), JPG (C8) and DAC (CC).
fn is_start_of_frame(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}
