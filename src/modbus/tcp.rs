//! # Modbus/TCP Transport
//!
//! [`RegisterTransport`] over `tokio-modbus`. Every operation runs under a
//! timeout. A timeout or any socket error drops the client context so the
//! next operation starts from a fresh connection.

use crate::config::ChargerConfig;
use crate::constants::{DEFAULT_PORT, DEFAULT_UNIT_ID};
use crate::error::TransportError;
use crate::modbus::transport::{read_serial_number, RegisterTransport};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::error::Elapsed;
use tokio::time::timeout;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;

/// Modbus/TCP connection to one station
pub struct TcpTransport {
    host: String,
    port: u16,
    unit_id: u8,
    connect_timeout: Duration,
    io_timeout: Duration,
    ctx: Option<Context>,
}

impl TcpTransport {
    pub fn new(host: &str, port: u16, unit_id: u8) -> Self {
        TcpTransport {
            host: host.to_string(),
            port,
            unit_id,
            connect_timeout: Duration::from_secs(5),
            io_timeout: Duration::from_secs(10),
            ctx: None,
        }
    }

    /// Transport with the default port and unit id
    pub fn with_host(host: &str) -> Self {
        Self::new(host, DEFAULT_PORT, DEFAULT_UNIT_ID)
    }

    pub fn from_config(config: &ChargerConfig) -> Self {
        Self::new(&config.host, config.port, config.unit_id)
            .with_timeouts(config.connect_timeout(), config.read_timeout())
    }

    pub fn with_timeouts(mut self, connect: Duration, io: Duration) -> Self {
        self.connect_timeout = connect;
        self.io_timeout = io;
        self
    }

    /// Changes the bound for reads and writes, e.g. for a quick validation read
    pub fn set_io_timeout(&mut self, io: Duration) {
        self.io_timeout = io;
    }

    fn drop_on_failure(&mut self, err: TransportError) -> TransportError {
        if err.closes_connection() {
            log::debug!("Dropping Modbus context for {} after: {err}", self.target());
            self.ctx = None;
        }
        err
    }
}

/// Resolves `host` to its first socket address.
///
/// Takes owned values so the connect future never borrows the transport
/// across the lookup.
async fn resolve(host: String, port: u16, bound: Duration) -> Result<SocketAddr, TransportError> {
    let target = format!("{host}:{port}");
    let mut addrs = timeout(bound, tokio::net::lookup_host((host.as_str(), port)))
        .await
        .map_err(|_| TransportError::Timeout {
            operation: "resolve",
            after: bound,
        })?
        .map_err(|e| TransportError::Connect {
            target: target.clone(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| TransportError::Connect {
        target,
        reason: "host did not resolve to any address".into(),
    })
}

/// Flattens a timed tokio-modbus response into a [`TransportError`].
fn map_response<T>(
    outcome: Result<tokio_modbus::Result<T>, Elapsed>,
    operation: &'static str,
    after: Duration,
) -> Result<T, TransportError> {
    match outcome {
        Err(_) => Err(TransportError::Timeout { operation, after }),
        Ok(Err(tokio_modbus::Error::Transport(io))) => Err(TransportError::Io {
            kind: io.kind(),
            message: io.to_string(),
        }),
        Ok(Err(other)) => Err(TransportError::Protocol(other.to_string())),
        Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{exception:?}"))),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

#[async_trait::async_trait]
impl RegisterTransport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.ctx.is_some() {
            return Ok(());
        }

        let target = self.target();
        let bound = self.connect_timeout;
        let unit_id = self.unit_id;

        let addr = resolve(self.host.clone(), self.port, bound).await?;
        log::debug!("Connecting to {addr} (unit {unit_id})");

        let ctx = timeout(bound, tcp::connect_slave(addr, Slave(unit_id)))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "connect",
                after: bound,
            })?
            .map_err(|e| TransportError::Connect {
                target: target.clone(),
                reason: e.to_string(),
            })?;

        self.ctx = Some(ctx);
        log::info!("Connected to Terra AC at {target}");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        let after = self.io_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let outcome = timeout(after, ctx.read_holding_registers(address, count)).await;
        map_response(outcome, "read", after).map_err(|e| self.drop_on_failure(e))
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        let after = self.io_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let outcome = timeout(after, ctx.write_single_register(address, value)).await;
        map_response(outcome, "write", after).map_err(|e| self.drop_on_failure(e))
    }

    async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        let after = self.io_timeout;
        let ctx = self.ctx.as_mut().ok_or(TransportError::NotConnected)?;
        let outcome = timeout(after, ctx.write_multiple_registers(address, values)).await;
        map_response(outcome, "write", after).map_err(|e| self.drop_on_failure(e))
    }

    async fn disconnect(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(e) = ctx.disconnect().await {
                log::debug!("Error closing connection to {}: {e}", self.target());
            }
            log::info!("Disconnected from {}", self.target());
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Confirms a station answers at the configured address.
///
/// Connects under the connect timeout and reads the serial number under the
/// shorter validation timeout. Returns the decoded serial.
pub async fn validate_connection(config: &ChargerConfig) -> Result<String, TransportError> {
    let mut transport = TcpTransport::from_config(config);
    transport.set_io_timeout(config.validation_timeout());
    let result = read_serial_number(&mut transport).await;
    transport.disconnect().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = ChargerConfig {
            host: "wallbox.local".into(),
            port: 1502,
            ..ChargerConfig::default()
        };
        let transport = TcpTransport::from_config(&config);
        assert_eq!(transport.target(), "wallbox.local:1502");
        assert_eq!(transport.connect_timeout, Duration::from_secs(5));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_request_without_connection() {
        let mut transport = TcpTransport::with_host("127.0.0.1");
        let err = transport.read_holding_registers(16384, 37).await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop a listener to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = TcpTransport::new("127.0.0.1", port, 1)
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));
        let err = transport.connect().await.unwrap_err();
        assert!(err.is_connection_failure());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_runs_on_spawned_task() {
        fn assert_send<T: Send>(_: &T) {}
        assert_send(&resolve("localhost".into(), 502, Duration::from_secs(1)));

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport: Box<dyn RegisterTransport> = Box::new(
            TcpTransport::new("127.0.0.1", port, 1)
                .with_timeouts(Duration::from_secs(2), Duration::from_secs(2)),
        );
        let err = tokio::spawn(async move { transport.connect().await })
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.is_connection_failure());
    }

    #[tokio::test]
    async fn test_resolve_unknown_host() {
        let err = resolve("host.invalid".into(), 502, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.is_connection_failure());
    }
}
