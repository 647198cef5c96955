//! # Register Data Encoding and Decoding
//!
//! Pure transforms between raw 16-bit holding registers and typed values:
//! scaled 32-bit quantities, the packed-BCD serial number, the firmware
//! version, the charging-state nibble and the current-limit command words.
//!
//! Text decoders come in two flavours. `try_decode_*` reports a
//! [`DecodeError`]; `decode_*` never fails and returns a diagnostic
//! placeholder instead, so one bad field cannot abort a poll.

use crate::constants::{FIRMWARE_VERSION_WORDS, SERIAL_NUMBER_PREFIX, SERIAL_NUMBER_WORDS};
use crate::error::DecodeError;
use crate::util::hex::format_registers_list;

/// Combines a high and a low register into an unsigned 32-bit value.
pub fn decode_u32(hi: u16, lo: u16) -> u32 {
    (u32::from(hi) << 16) | u32::from(lo)
}

/// Decodes a scaled 32-bit quantity: `(hi << 16 | lo) * resolution`.
///
/// The combined value is unsigned; the station's counters never go negative.
pub fn decode_scaled32(hi: u16, lo: u16, resolution: f64) -> f64 {
    f64::from(decode_u32(hi, lo)) * resolution
}

/// Decodes one packed-BCD byte without validating the nibbles.
pub fn bcd_byte(byte: u8) -> u8 {
    ((byte >> 4) & 0xF) * 10 + (byte & 0xF)
}

fn checked_bcd(field: &'static str, byte: u8) -> Result<u8, DecodeError> {
    if (byte >> 4) > 9 || (byte & 0xF) > 9 {
        return Err(DecodeError::InvalidBcd { field, byte });
    }
    Ok(bcd_byte(byte))
}

fn high_byte(register: u16) -> u8 {
    (register >> 8) as u8
}

fn low_byte(register: u16) -> u8 {
    (register & 0xFF) as u8
}

/// Maps the connector-type byte of the serial number to its letter.
pub fn connector_type(byte: u8) -> String {
    match byte {
        0x47 => "G".to_string(),
        0x50 => "P".to_string(),
        0x53 => "S".to_string(),
        0x54 => "T".to_string(),
        other => format!("Unknown(0x{other:02X})"),
    }
}

/// Decodes the four serial-number registers.
///
/// Byte selection: byte7 = r0 high (connector type), byte5 = r1 high (plant
/// id), byte3/byte2 = r2 high/low (BCD week/year), byte1/byte0 = r3 high/low
/// (BCD serial). The result is
/// `TACW22{plant}{week:02}{year:02}{connector}{serial:04}`.
pub fn try_decode_serial_number(registers: &[u16]) -> Result<String, DecodeError> {
    const FIELD: &str = "serial_number";

    if registers.len() != SERIAL_NUMBER_WORDS as usize {
        return Err(DecodeError::WrongLength {
            field: FIELD,
            expected: SERIAL_NUMBER_WORDS as usize,
            got: registers.len(),
        });
    }
    if registers.iter().all(|r| *r == 0) {
        return Err(DecodeError::Blank { field: FIELD });
    }

    let byte7 = high_byte(registers[0]);
    let byte5 = high_byte(registers[1]);
    let byte3 = high_byte(registers[2]);
    let byte2 = low_byte(registers[2]);
    let byte1 = high_byte(registers[3]);
    let byte0 = low_byte(registers[3]);

    let connector = connector_type(byte7);
    let plant_id = byte5;
    let week = checked_bcd(FIELD, byte3)?;
    let year = checked_bcd(FIELD, byte2)?;
    let serial = u16::from(checked_bcd(FIELD, byte1)?) * 100 + u16::from(checked_bcd(FIELD, byte0)?);

    Ok(format!(
        "{SERIAL_NUMBER_PREFIX}{plant_id}{week:02}{year:02}{connector}{serial:04}"
    ))
}

/// Decodes the serial number, falling back to a placeholder on malformed input.
pub fn decode_serial_number(registers: &[u16]) -> String {
    try_decode_serial_number(registers).unwrap_or_else(|e| placeholder(registers, &e))
}

/// Decodes the two firmware-version registers as `v{major}.{minor}.{patch}`.
///
/// Major and minor are the plain high and low bytes of r0, patch is the
/// BCD-encoded high byte of r1.
pub fn try_decode_firmware_version(registers: &[u16]) -> Result<String, DecodeError> {
    const FIELD: &str = "firmware_version";

    if registers.len() != FIRMWARE_VERSION_WORDS {
        return Err(DecodeError::WrongLength {
            field: FIELD,
            expected: FIRMWARE_VERSION_WORDS,
            got: registers.len(),
        });
    }

    let major = high_byte(registers[0]);
    let minor = low_byte(registers[0]);
    let patch = checked_bcd(FIELD, high_byte(registers[1]))?;

    Ok(format!("v{major}.{minor}.{patch}"))
}

/// Decodes the firmware version, falling back to a placeholder on malformed input.
pub fn decode_firmware_version(registers: &[u16]) -> String {
    try_decode_firmware_version(registers).unwrap_or_else(|e| placeholder(registers, &e))
}

fn placeholder(registers: &[u16], err: &DecodeError) -> String {
    log::debug!("{err}");
    format!("Undecodable: {}", format_registers_list(registers))
}

/// Whether a decoded text field is a placeholder rather than a real value.
pub fn is_placeholder(value: &str) -> bool {
    value.starts_with("Undecodable: ")
}

/// Extracts the charging-state code: the low nibble of the high byte.
///
/// Only bits 8..=11 of the register contribute to the result.
pub fn decode_charging_state(register: u16) -> u8 {
    high_byte(register) & 0x0F
}

/// Encodes a current in amps into the (high, low) command words.
///
/// The value is rounded to whole milliamps. Callers validate the range; the
/// station accepts 0..=32 A.
pub fn encode_current_command(amps: f64) -> (u16, u16) {
    let milliamps = (amps * 1000.0).round() as u32;
    ((milliamps >> 16) as u16, (milliamps & 0xFFFF) as u16)
}
