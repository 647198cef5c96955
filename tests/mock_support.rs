// Shared fixtures for the integration tests
#![allow(dead_code)]

use terra_ac::constants::BULK_READ_BASE;
use terra_ac::util::hex::decode_registers;
use terra_ac::{ChargerCoordinator, CommandDispatcher, MockTransport, SettleDurations};
use std::sync::Arc;

/// Status block captured while charging at 16 A on three phases
pub const CHARGING_BLOCK_HEX: &str = "\
    47000500232112340107120000007d00 00000000000001110000040000003e80 \
    00003dfe00003e2600003e0800000901 00000907000008fa00002b0c000186a0 \
    003c000000003e800010";

/// Status block of an idle station with two error bits set and the
/// firmware fallback-limit defect (40 A)
pub const IDLE_FAULT_BLOCK_HEX: &str = "\
    54000300182204570108030000003e80 00120000000000010000150000001770 \
    000000000000000000000000000008f2 000008fd000009060000000000003039 \
    001e0000000017700028";

pub fn block(hex: &str) -> Vec<u16> {
    decode_registers(hex).expect("fixture hex is valid")
}

pub fn charging_block() -> Vec<u16> {
    block(CHARGING_BLOCK_HEX)
}

pub fn idle_fault_block() -> Vec<u16> {
    block(IDLE_FAULT_BLOCK_HEX)
}

/// Charging block with a different fallback limit
pub fn charging_block_with_fallback(amps: u16) -> Vec<u16> {
    let mut regs = charging_block();
    regs[36] = amps;
    regs
}

/// Mock station that answers every read with the charging block
pub fn charging_station() -> MockTransport {
    MockTransport::with_block(BULK_READ_BASE, charging_block())
}

pub fn dispatcher_for(
    mock: &MockTransport,
    settle: SettleDurations,
) -> (Arc<ChargerCoordinator>, CommandDispatcher) {
    let coordinator = ChargerCoordinator::new(mock.clone());
    let dispatcher = CommandDispatcher::new(coordinator.clone(), settle);
    (coordinator, dispatcher)
}
