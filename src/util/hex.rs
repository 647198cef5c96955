//! # Register Hex Utilities
//!
//! Hex rendering of 16-bit register words for log output, diagnostic
//! placeholders and captured test dumps.
//!
//! ## Usage
//!
//! ```rust
//! use terra_ac::util::hex::{encode_registers, decode_registers, format_registers_compact};
//!
//! let regs = [0x4700, 0x0500, 0x2321];
//! assert_eq!(encode_registers(&regs), "470005002321");
//! assert_eq!(decode_registers("4700 0500 2321").unwrap(), regs);
//! assert_eq!(format_registers_compact(&regs), "4700 0500 2321");
//! ```

use thiserror::Error;

/// Errors that can occur when parsing a register dump
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HexError {
    #[error("Register dump length {0} is not a multiple of 4 hex digits")]
    PartialWord(usize),

    #[error("Empty hex string")]
    EmptyString,

    #[error("Hex decoding error: {0}")]
    DecodeError(String),
}

/// Flatten registers into their big-endian byte stream.
pub fn registers_to_bytes(registers: &[u16]) -> Vec<u8> {
    registers.iter().flat_map(|r| r.to_be_bytes()).collect()
}

/// Encode registers as one lowercase hex string, big-endian words.
pub fn encode_registers(registers: &[u16]) -> String {
    hex::encode(registers_to_bytes(registers))
}

/// Decode a hex register dump. Whitespace is ignored.
pub fn decode_registers(hex_str: &str) -> Result<Vec<u16>, HexError> {
    let cleaned: String = hex_str.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(HexError::EmptyString);
    }
    if cleaned.len() % 4 != 0 {
        return Err(HexError::PartialWord(cleaned.len()));
    }

    let bytes = hex::decode(&cleaned).map_err(|e| HexError::DecodeError(e.to_string()))?;
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

/// Format registers for compact display, "4700 0500 2321".
pub fn format_registers_compact(registers: &[u16]) -> String {
    registers
        .iter()
        .map(|r| format!("{r:04x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format registers as a list, "[0x4700, 0x0500]". Used in decode placeholders.
pub fn format_registers_list(registers: &[u16]) -> String {
    let words = registers
        .iter()
        .map(|r| format!("0x{r:04X}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{words}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_big_endian() {
        assert_eq!(encode_registers(&[0x1234, 0xABCD]), "1234abcd");
        assert_eq!(registers_to_bytes(&[0x0102]), vec![0x01, 0x02]);
    }

    #[test]
    fn test_decode_with_whitespace() {
        let dump = "4000 0001\n 0111";
        assert_eq!(decode_registers(dump).unwrap(), vec![0x4000, 0x0001, 0x0111]);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(decode_registers(""), Err(HexError::EmptyString));
        assert_eq!(decode_registers("123"), Err(HexError::PartialWord(3)));
        assert!(matches!(
            decode_registers("GGGG"),
            Err(HexError::DecodeError(_))
        ));
    }

    #[test]
    fn test_format_compact() {
        assert_eq!(format_registers_compact(&[0x0400, 0x0011]), "0400 0011");
        assert_eq!(format_registers_compact(&[]), "");
    }

    #[test]
    fn test_format_list() {
        assert_eq!(format_registers_list(&[0, 0x47]), "[0x0000, 0x0047]");
        assert_eq!(format_registers_list(&[]), "[]");
    }
}
