//! # Device State Tables
//!
//! Interpretation of the raw status codes reported by the station: charging
//! state (IEC 61851-1), socket lock state and the error bitmask, plus the
//! policy table that derives the "session active" and "cable locked" views.
//!
//! Every lookup has an explicit fallback for codes missing from the table.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Charging state as reported in the high-byte low nibble of register 400Dh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChargingState {
    /// State A - no vehicle connected.
    Idle = 0,
    /// State B1 - vehicle plugged in, pending authorization.
    PendingAuthorization = 1,
    /// State B2 - authorized, EVSE ready. The station also reports this when
    /// charging has completed.
    Authorized = 2,
    /// State C1 - vehicle ready for charge.
    EvReady = 3,
    /// State C2 - charging.
    Charging = 4,
    /// State D/F - paused or fault. Setting a limit below 6 A pauses the session.
    PausedOrFault = 5,
}

impl ChargingState {
    pub const ALL: [ChargingState; 6] = [
        ChargingState::Idle,
        ChargingState::PendingAuthorization,
        ChargingState::Authorized,
        ChargingState::EvReady,
        ChargingState::Charging,
        ChargingState::PausedOrFault,
    ];

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u8 == code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            ChargingState::Idle => "State A - Idle",
            ChargingState::PendingAuthorization => {
                "State B1 - EV Plug in, pending authorization"
            }
            ChargingState::Authorized => "State B2 - EV Plug in, charging complete",
            ChargingState::EvReady => "State C1 - EV Ready for charge",
            ChargingState::Charging => "State C2 - Charging",
            ChargingState::PausedOrFault => "State D/F - Paused / Fault",
        }
    }
}

/// Human-readable charging state, "Unknown (N)" for codes outside 0..=5.
pub fn describe_charging_state(code: u8) -> String {
    match ChargingState::from_code(code) {
        Some(state) => state.description().to_string(),
        None => format!("Unknown ({code})"),
    }
}

/// Socket lock state from registers 400Ah-400Bh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SocketLockState {
    NoCable = 0x0000,
    CableUnlocked = 0x0001,
    CableLocked = 0x0011,
    CableAndEvUnlocked = 0x0101,
    CableAndEvLocked = 0x0111,
}

impl SocketLockState {
    pub const ALL: [SocketLockState; 5] = [
        SocketLockState::NoCable,
        SocketLockState::CableUnlocked,
        SocketLockState::CableLocked,
        SocketLockState::CableAndEvUnlocked,
        SocketLockState::CableAndEvLocked,
    ];

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| *s as u32 == code)
    }

    pub fn description(self) -> &'static str {
        match self {
            SocketLockState::NoCable => "No cable connected",
            SocketLockState::CableUnlocked => "Cable connected, unlocked",
            SocketLockState::CableLocked => "Cable connected, locked",
            SocketLockState::CableAndEvUnlocked => "Cable & EV connected, unlocked",
            SocketLockState::CableAndEvLocked => "Cable & EV connected, locked",
        }
    }
}

pub fn describe_socket_lock_state(code: u32) -> String {
    match SocketLockState::from_code(code) {
        Some(state) => state.description().to_string(),
        None => format!("Unknown ({code})"),
    }
}

bitflags! {
    /// Error register 4008h. Zero means no error; set bits are reported by
    /// number.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorFlags: u16 {
        const _ = !0;
    }
}

impl ErrorFlags {
    /// Numbers of the set bits, lowest first
    pub fn bit_numbers(self) -> impl Iterator<Item = u8> {
        (0..16u8).filter(move |bit| self.bits() & (1 << bit) != 0)
    }
}

/// One "Error bit N" entry per set bit, in bit order.
pub fn describe_error_bits(code: u16) -> Vec<String> {
    ErrorFlags::from_bits_retain(code)
        .bit_numbers()
        .map(|bit| format!("Error bit {bit}"))
        .collect()
}

/// Single-line error text: "No error" for zero, otherwise the bit descriptions.
pub fn describe_error_code(code: u16) -> String {
    if code == 0 {
        return "No error".to_string();
    }
    describe_error_bits(code).join(", ")
}

/// Which raw codes the derived boolean views treat as "on".
///
/// The station's behavior here has varied between firmware revisions, so the
/// sets are configuration rather than constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPolicy {
    /// Charging states that count as an active session.
    pub charging_active_states: Vec<u8>,
    /// Socket lock codes that count as a locked cable.
    pub cable_locked_states: Vec<u32>,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        SessionPolicy {
            charging_active_states: vec![2, 3, 4],
            cable_locked_states: vec![SocketLockState::CableAndEvLocked as u32],
        }
    }
}

impl SessionPolicy {
    /// Keeps the session "active" while paused (state 5), e.g. during solar
    /// charging when the limit drops below 6 A.
    pub fn include_paused() -> Self {
        SessionPolicy {
            charging_active_states: vec![2, 3, 4, 5],
            ..Self::default()
        }
    }

    /// Only state C2 counts as active.
    pub fn charging_only() -> Self {
        SessionPolicy {
            charging_active_states: vec![ChargingState::Charging.code()],
            ..Self::default()
        }
    }

    /// Also treats a locked cable without a vehicle (17) as locked.
    pub fn with_cable_only_lock(mut self) -> Self {
        let code = SocketLockState::CableLocked as u32;
        if !self.cable_locked_states.contains(&code) {
            self.cable_locked_states.push(code);
        }
        self
    }

    pub fn is_session_active(&self, charging_state: u8) -> bool {
        self.charging_active_states.contains(&charging_state)
    }

    pub fn is_cable_locked(&self, socket_lock_state: u32) -> bool {
        self.cable_locked_states.contains(&socket_lock_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charging_state_table() {
        for (code, state) in ChargingState::ALL.iter().enumerate() {
            assert_eq!(ChargingState::from_code(code as u8), Some(*state));
        }
        assert_eq!(describe_charging_state(4), "State C2 - Charging");
        assert_eq!(describe_charging_state(9), "Unknown (9)");
    }

    #[test]
    fn test_socket_lock_codes() {
        assert_eq!(SocketLockState::from_code(273), Some(SocketLockState::CableAndEvLocked));
        assert_eq!(SocketLockState::from_code(257), Some(SocketLockState::CableAndEvUnlocked));
        assert_eq!(SocketLockState::from_code(17), Some(SocketLockState::CableLocked));
        assert_eq!(SocketLockState::from_code(1), Some(SocketLockState::CableUnlocked));
        assert_eq!(SocketLockState::from_code(0), Some(SocketLockState::NoCable));
        assert_eq!(describe_socket_lock_state(2), "Unknown (2)");
    }

    #[test]
    fn test_error_code_descriptions() {
        assert_eq!(describe_error_code(0), "No error");
        assert_eq!(describe_error_code(0x0004), "Error bit 2");
        assert_eq!(describe_error_code(0x0003), "Error bit 0, Error bit 1");
        assert_eq!(describe_error_code(0x8000), "Error bit 15");
        assert_eq!(describe_error_bits(0x4001), vec!["Error bit 0", "Error bit 14"]);
        assert!(describe_error_bits(0).is_empty());
    }

    #[test]
    fn test_error_flags_keep_every_bit() {
        let flags = ErrorFlags::from_bits_retain(0xFFFF);
        assert_eq!(flags.bits(), 0xFFFF);
        assert_eq!(flags.bit_numbers().count(), 16);
        assert_eq!(
            ErrorFlags::from_bits_retain(0x0012).bit_numbers().collect::<Vec<_>>(),
            vec![1, 4]
        );
    }

    #[test]
    fn test_default_policy() {
        let policy = SessionPolicy::default();
        assert!(!policy.is_session_active(1));
        assert!(policy.is_session_active(2));
        assert!(policy.is_session_active(4));
        assert!(!policy.is_session_active(5));
        assert!(policy.is_cable_locked(273));
        assert!(!policy.is_cable_locked(17));
    }

    #[test]
    fn test_policy_presets() {
        assert!(SessionPolicy::include_paused().is_session_active(5));
        assert!(!SessionPolicy::charging_only().is_session_active(3));
        let legacy = SessionPolicy::default().with_cable_only_lock();
        assert!(legacy.is_cable_locked(17));
        assert!(legacy.is_cable_locked(273));
        assert_eq!(legacy.clone().with_cable_only_lock(), legacy);
    }

    #[test]
    fn test_policy_deserializes_partial() {
        let policy: SessionPolicy =
            serde_json::from_str(r#"{"charging_active_states": [4]}"#).unwrap();
        assert_eq!(policy.charging_active_states, vec![4]);
        assert_eq!(policy.cable_locked_states, vec![273]);
    }
}
