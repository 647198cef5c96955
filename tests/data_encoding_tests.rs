use proptest::prelude::*;
use terra_ac::constants::CURRENT_RESOLUTION;
use terra_ac::payload::data_encoding::*;

#[test]
fn test_decode_scaled32_examples() {
    assert_eq!(decode_scaled32(0x0000, 0x3E80, 1.0), 16_000.0);
    assert!((decode_scaled32(0x0000, 0x3E80, CURRENT_RESOLUTION) - 16.0).abs() < 1e-9);
    // Unsigned: the top bit is not a sign
    assert_eq!(decode_scaled32(0xFFFF, 0xFFFF, 1.0), 4_294_967_295.0);
}

#[test]
fn test_charging_state_from_example_register() {
    // 0000 0100 0000 0000b
    assert_eq!(decode_charging_state(0x0400), 4);
    assert_eq!(decode_charging_state(0x0000), 0);
    assert_eq!(decode_charging_state(0x0F00), 15);
}

#[test]
fn test_encode_current_round_trip() {
    let (hi, lo) = encode_current_command(16.0);
    assert_eq!((hi, lo), (0, 16_000));
    assert!((decode_scaled32(hi, lo, CURRENT_RESOLUTION) - 16.0).abs() < 1e-9);
}

#[test]
fn test_serial_number_connectors() {
    assert_eq!(
        decode_serial_number(&[0x5000, 0x0100, 0x0123, 0x0001]),
        "TACW2210123P0001"
    );
    assert_eq!(connector_type(0x53), "S");
    assert_eq!(connector_type(0x10), "Unknown(0x10)");
}

#[test]
fn test_malformed_serial_numbers() {
    for regs in [
        vec![0u16, 0, 0, 0],
        vec![0x4700, 0x0500, 0x2A21, 0x1234],
        vec![0x4700, 0x0500],
    ] {
        let serial = decode_serial_number(&regs);
        assert!(is_placeholder(&serial), "{serial}");
    }
}

#[test]
fn test_firmware_version() {
    assert_eq!(decode_firmware_version(&[0x0107, 0x1200]), "v1.7.12");
    assert!(is_placeholder(&decode_firmware_version(&[0x0107, 0xAB00])));
}

proptest! {
    #[test]
    fn prop_state_depends_only_on_bits_8_to_11(register in any::<u16>(), noise in any::<u16>()) {
        let mixed = (register & 0x0F00) | (noise & !0x0F00);
        prop_assert_eq!(decode_charging_state(register), decode_charging_state(mixed));
    }

    #[test]
    fn prop_serial_never_panics(regs in prop::collection::vec(any::<u16>(), 0..6)) {
        let first = decode_serial_number(&regs);
        prop_assert_eq!(first, decode_serial_number(&regs));
    }

    #[test]
    fn prop_encode_inverts_decode(milliamps in 0u32..=32_000) {
        let amps = f64::from(milliamps) / 1000.0;
        let (hi, lo) = encode_current_command(amps);
        prop_assert_eq!((u32::from(hi) << 16) | u32::from(lo), milliamps);
    }
}
