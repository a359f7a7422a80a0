//! Pixel to bit mapping for packed 1 bit per pixel rows.
//!
//! Every packed row produced by this crate is `width_in_bytes(width)` bytes
//! long and stores its leftmost pixel in bit 7 of the first byte. Keep all
//! row padding arithmetic here so the ditherers and the command encoder can
//! never disagree about it.

/// Number of bytes needed to hold `pixel_width` pixels at one bit per pixel.
///
/// This is `ceil(pixel_width / 8)`.
#[inline]
pub fn width_in_bytes(pixel_width: u32) -> usize {
    (pixel_width as usize).div_ceil(8)
}

/// Byte index and bit index of a pixel in a packed buffer.
///
/// `pixel_index` counts pixels row-major over an image `pixels_per_row`
/// wide. The returned bit index is `7 - column % 8`, so the leftmost pixel of
/// each byte group lands in the most significant bit.
#[inline]
pub fn bit_position(pixel_index: usize, pixels_per_row: u32) -> (usize, u8) {
    let pixels_per_row = pixels_per_row as usize;
    let row = pixel_index / pixels_per_row;
    let column = pixel_index % pixels_per_row;
    let stride = width_in_bytes(pixels_per_row as u32);

    (row * stride + column / 8, 7 - (column % 8) as u8)
}

/// Set the bit of `pixel_index` in a packed buffer.
///
/// # Panics
///
/// Panics if the pixel lies outside `buffer`. Callers bound the index by the
/// image geometry, an out of range index is a bug.
#[inline]
pub fn set_bit(buffer: &mut [u8], pixel_index: usize, pixels_per_row: u32) {
    assert!(pixels_per_row > 0, "row width must be positive");
    let (byte_index, bit_index) = bit_position(pixel_index, pixels_per_row);
    assert!(
        byte_index < buffer.len(),
        "pixel {} is outside a {} byte bitmap",
        pixel_index,
        buffer.len()
    );
    buffer[byte_index] |= 1 << bit_index;
}
