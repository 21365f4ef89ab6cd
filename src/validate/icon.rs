//! Icon image validation
//!
//! Catalog icons are 10x10 1-bit PNGs. Width, height, bit depth, and color
//! type all live in the IHDR chunk, which by specification is the first
//! chunk after the 8-byte signature, so the check reads the header only.

/// Required icon dimensions
pub const ICON_SIZE: (u32, u32) = (10, 10);

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// Parsed IHDR fields relevant to icon validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
}

/// Read the IHDR of a PNG byte stream
pub fn parse_png_header(data: &[u8]) -> Result<PngHeader, String> {
    if data.len() < 33 {
        return Err("file too short to be a PNG".to_string());
    }
    if data[..8] != PNG_SIGNATURE {
        return Err("not a PNG file (bad signature)".to_string());
    }
    // First chunk: 4-byte length, 4-byte type, 13-byte IHDR payload
    if &data[12..16] != b"IHDR" {
        return Err("malformed PNG: first chunk is not IHDR".to_string());
    }
    let ihdr_len = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    if ihdr_len != 13 {
        return Err(format!("malformed PNG: IHDR length {ihdr_len}, expected 13"));
    }

    Ok(PngHeader {
        width: u32::from_be_bytes([data[16], data[17], data[18], data[19]]),
        height: u32::from_be_bytes([data[20], data[21], data[22], data[23]]),
        bit_depth: data[24],
        color_type: data[25],
    })
}

/// Check that icon bytes are a 10x10 1-bit PNG.
/// Returns a human-readable problem description on failure.
pub fn check_icon(data: &[u8]) -> Result<(), String> {
    let header = parse_png_header(data)?;

    if (header.width, header.height) != ICON_SIZE {
        return Err(format!(
            "expected {}x{} pixels, got {}x{}",
            ICON_SIZE.0, ICON_SIZE.1, header.width, header.height
        ));
    }
    if header.bit_depth != 1 {
        return Err(format!(
            "expected 1-bit color depth, got {}-bit",
            header.bit_depth
        ));
    }

    Ok(())
}

/// Build a minimal PNG byte stream with the given IHDR fields.
/// Only the fields the validator reads are meaningful.
#[cfg(test)]
pub fn png_bytes(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&PNG_SIGNATURE);
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.push(bit_depth);
    data.push(color_type);
    data.extend_from_slice(&[0, 0, 0]); // compression, filter, interlace
    data.extend_from_slice(&[0, 0, 0, 0]); // IHDR crc (not verified)
    data
}
