//! Register transport abstraction
//!
//! The coordinator and dispatcher only ever need "read N holding registers at
//! A" and "write register(s) at A". This trait is that seam, so the TCP client
//! can be swapped for the in-memory [`MockTransport`](super::mock::MockTransport).

use crate::constants::{BULK_READ_BASE, SERIAL_NUMBER_WORDS};
use crate::error::TransportError;
use crate::payload::data_encoding::decode_serial_number;

/// Trait for Modbus holding-register operations against one station
#[async_trait::async_trait]
pub trait RegisterTransport: Send {
    /// Open the connection. Calling this while connected is a no-op.
    async fn connect(&mut self) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError>;

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError>;

    async fn write_registers(&mut self, address: u16, values: &[u16])
        -> Result<(), TransportError>;

    /// Close the connection. Never fails; errors are logged.
    async fn disconnect(&mut self);

    /// Human-readable target for log messages, e.g. "192.168.1.40:502"
    fn target(&self) -> String;
}

/// Reads the serial-number registers and decodes them.
///
/// Used to confirm a station answers before it is handed to a coordinator.
pub async fn read_serial_number<T>(transport: &mut T) -> Result<String, TransportError>
where
    T: RegisterTransport + ?Sized,
{
    transport.connect().await?;
    let regs = transport
        .read_holding_registers(BULK_READ_BASE, SERIAL_NUMBER_WORDS)
        .await?;
    if regs.len() < SERIAL_NUMBER_WORDS as usize {
        return Err(TransportError::Protocol(format!(
            "serial read returned {} of {} registers",
            regs.len(),
            SERIAL_NUMBER_WORDS
        )));
    }
    Ok(decode_serial_number(&regs[..SERIAL_NUMBER_WORDS as usize]))
}
