//! Integration tests for the `terra-ac` crate.
//!
//! These tests exercise the top-level API re-exported from the crate root:
//! a coordinator over a mocked station, the presentation adapters and the
//! configuration defaults.

mod mock_support;

use mock_support::{charging_station, dispatcher_for};
use std::time::Duration;
use terra_ac::constants::{REG_CURRENT_LIMIT, REG_LOCK_CONTROL, REG_SESSION_CONTROL};
use terra_ac::modbus::MockWrite;
use terra_ac::{
    ChargerConfig, ChargerCoordinator, ConnectionState, DeviceInfo, NumberKind, PollError,
    SensorKind, SensorValue, SessionPolicy, SettleDurations, SwitchKind,
};

#[tokio::test]
async fn test_poll_and_describe() -> Result<(), PollError> {
    let coordinator = ChargerCoordinator::new(charging_station());
    assert!(coordinator.snapshot().is_none());
    assert_eq!(coordinator.state(), ConnectionState::Disconnected);

    let snapshot = coordinator.poll().await?;
    assert_eq!(coordinator.state(), ConnectionState::Connected);

    let info = DeviceInfo::from_snapshot(&snapshot);
    assert_eq!(info.name, "ABB Terra AC Charger");
    assert_eq!(info.serial_number, "TACW2252321G1234");
    assert_eq!(info.sw_version, "v1.7.12");

    assert_eq!(
        SensorKind::ErrorCode.value(&snapshot),
        SensorValue::Text("No error".to_string())
    );
    assert_eq!(SensorKind::CurrentL1.value(&snapshot), SensorValue::Integer(16));
    assert_eq!(NumberKind::ChargingCurrentLimit.value(&snapshot), 16.0);
    assert_eq!(NumberKind::FallbackLimit.value(&snapshot), 16.0);

    let policy = SessionPolicy::default();
    assert!(SwitchKind::ChargingSession.is_on(&snapshot, &policy));
    assert!(SwitchKind::CableLock.is_on(&snapshot, &policy));

    coordinator.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_adapters_send_commands() {
    let mock = charging_station();
    let (_coordinator, dispatcher) = dispatcher_for(&mock, SettleDurations::immediate());

    NumberKind::ChargingCurrentLimit.set(&dispatcher, 10.0).await.unwrap();
    SwitchKind::ChargingSession.turn_off(&dispatcher).await.unwrap();
    SwitchKind::CableLock.turn_on(&dispatcher).await.unwrap();

    assert_eq!(
        mock.writes(),
        vec![
            MockWrite::Multiple {
                address: REG_CURRENT_LIMIT,
                values: vec![0, 10_000],
            },
            MockWrite::Single {
                address: REG_SESSION_CONTROL,
                value: 1,
            },
            MockWrite::Single {
                address: REG_LOCK_CONTROL,
                value: 1,
            },
        ]
    );
}

#[tokio::test]
async fn test_fallback_number_rejects_out_of_range() {
    let mock = charging_station();
    let (_coordinator, dispatcher) = dispatcher_for(&mock, SettleDurations::immediate());

    assert!(NumberKind::FallbackLimit.set(&dispatcher, 40.0).await.is_err());
    assert!(NumberKind::FallbackLimit.set(&dispatcher, 5.0).await.is_err());
    assert!(mock.writes().is_empty());
}

#[test]
fn test_config_defaults() {
    let config = ChargerConfig::default();
    assert_eq!(config.port, 502);
    assert_eq!(config.scan_interval(), Duration::from_secs(15));
    assert_eq!(config.read_timeout(), Duration::from_secs(10));
    assert_eq!(config.settle.session_control(), Duration::from_secs(7));
    assert_eq!(config.policy.charging_active_states, vec![2, 3, 4]);
    assert_eq!(config.policy.cable_locked_states, vec![273]);
}

#[test]
fn test_sensor_catalogue() {
    assert_eq!(SensorKind::ALL.len(), 13);
    let hidden: Vec<_> = SensorKind::ALL
        .iter()
        .filter(|kind| !kind.enabled_by_default())
        .map(|kind| kind.key())
        .collect();
    assert_eq!(hidden.len(), 2);
}
