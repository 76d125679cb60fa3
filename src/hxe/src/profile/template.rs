//! Known-good `blam.sav` image.
//!
//! The template is a verified fixture replayed verbatim onto a zeroed
//! buffer. Many of the bytes below have no documented meaning; they are kept
//! exactly as the game writes them for a fresh profile.

use flate2::Crc;

use crate::layout::{write_field, LayoutError};

/// Length of a profile record
pub const LENGTH: usize = 0x2000;

/// Offset of the checksum trailer
pub const CHECKSUM_OFFSET: usize = 0x1FFC;

/// Binding slot value for an unbound input
pub const UNBOUND: u16 = 0x7F;

/// First and last binding slot offsets (inclusive)
pub const BINDINGS_START: usize = 0x13C;
pub const BINDINGS_END: usize = 0x93A;

/// Number of binding slots
pub const BINDING_SLOTS: usize = (BINDINGS_END - BINDINGS_START) / 2 + 1;

enum Op {
    Bytes(usize, &'static [u8]),
    Fill16(usize, usize, u16),
}

const OPS: &[Op] = &[
    Op::Bytes(0x0000, &[0x09, 0xFE]),
    Op::Bytes(0x0002, b"N\0e\0w\0"),
    Op::Bytes(0x0108, &[0x01, 0x00, 0x00, 0x00]),
    Op::Bytes(0x0110, &[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00]),
    Op::Bytes(0x011A, &[0xFF]),
    Op::Bytes(0x0120, &[0x00, 0x01, 0x01, 0x00]),
    Op::Bytes(0x012C, &[0x01, 0x00, 0x00, 0x00]),
    Op::Fill16(BINDINGS_START, BINDING_SLOTS, UNBOUND),
    // keyboard
    Op::Bytes(0x0150, &[0x13, 0x00]),
    Op::Bytes(0x0166, &[0x00, 0x00]),
    Op::Bytes(0x016A, &[0x0D, 0x00]),
    Op::Bytes(0x016C, &[0x10, 0x00]),
    Op::Bytes(0x0170, &[0x11, 0x00]),
    Op::Bytes(0x0174, &[0x02, 0x00]),
    Op::Bytes(0x0178, &[0x05, 0x00]),
    Op::Bytes(0x017C, &[0x0C, 0x00]),
    Op::Bytes(0x0180, &[0x15, 0x00]),
    Op::Bytes(0x0182, &[0x14, 0x00]),
    Op::Bytes(0x0184, &[0x16, 0x00]),
    Op::Bytes(0x018A, &[0x01, 0x00]),
    Op::Bytes(0x018E, &[0x04, 0x00]),
    Op::Bytes(0x01A0, &[0x0E, 0x00]),
    Op::Bytes(0x01B8, &[0x0A, 0x00]),
    Op::Bytes(0x01BC, &[0x03, 0x00]),
    Op::Bytes(0x01D0, &[0x12, 0x00]),
    // mouse
    Op::Bytes(0x078C, &[0x07, 0x00]),
    Op::Bytes(0x078E, &[0x06, 0x00]),
    Op::Bytes(0x0790, &[0x0B, 0x00]),
    Op::Bytes(0x0796, &[0x03, 0x00]),
    Op::Bytes(0x0798, &[0x03, 0x00]),
    Op::Bytes(0x079C, &[0x19, 0x00]),
    Op::Bytes(0x079E, &[0x1A, 0x00]),
    Op::Bytes(0x07A0, &[0x17, 0x00]),
    Op::Bytes(0x07A2, &[0x18, 0x00]),
    Op::Bytes(0x0954, &[0x03, 0x03]),
    Op::Bytes(0x0A68, &[0x20, 0x03, 0x58, 0x02, 0x3C]),
    Op::Bytes(0x0A6F, &[0x00, 0x01, 0x01, 0x01, 0x02, 0x02]),
    Op::Bytes(0x0A76, &[0x00]),
    Op::Bytes(0x0B78, &[0x0A, 0x0A, 0x0A, 0x00, 0x00, 0x01, 0x00, 0x01]),
    Op::Bytes(0x0FC0, &[0x02]),
    Op::Bytes(0x0FC4, &[0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF]),
    Op::Bytes(0x1002, &[0xFE, 0x08, 0xFF, 0x08]),
];

/// Replay the template onto a fresh buffer. The checksum is left zero.
pub fn render() -> Result<Vec<u8>, LayoutError> {
    let mut data = vec![0u8; LENGTH];
    for op in OPS {
        match *op {
            Op::Bytes(offset, bytes) => write_field(&mut data, offset, bytes)?,
            Op::Fill16(offset, count, value) => {
                for slot in 0..count {
                    write_field(&mut data, offset + slot * 2, &value.to_le_bytes())?;
                }
            }
        }
    }
    Ok(data)
}

/// Checksum the game expects at [`CHECKSUM_OFFSET`]
pub fn checksum(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(&data[..CHECKSUM_OFFSET.min(data.len())]);
    !crc.sum()
}

/// Recompute and store the checksum trailer.
pub fn seal(data: &mut [u8]) -> Result<(), LayoutError> {
    let sum = checksum(data);
    write_field(data, CHECKSUM_OFFSET, &sum.to_le_bytes())
}
