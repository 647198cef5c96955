//! Mock Modbus station for testing
//!
//! [`MockTransport`] stands in for a charger on the network. Reads are served
//! from a queue of scripted responses, falling back to a repeating default
//! block; writes are recorded and optionally applied to the default block so a
//! follow-up poll sees them. Clones share state, so a test can keep one handle
//! while another is boxed into a coordinator.

use crate::error::TransportError;
use crate::modbus::transport::RegisterTransport;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A failure the mock can be scripted to produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Modbus exception reply, e.g. "IllegalDataAddress"
    Exception(String),
    /// Socket-level error of the given kind
    Io(ErrorKind),
    /// No answer within the I/O timeout
    Timeout,
}

impl MockFailure {
    fn to_error(&self, operation: &'static str) -> TransportError {
        match self {
            MockFailure::Exception(code) => TransportError::Exception(code.clone()),
            MockFailure::Io(kind) => TransportError::Io {
                kind: *kind,
                message: format!("mock {operation} failure"),
            },
            MockFailure::Timeout => TransportError::Timeout {
                operation,
                after: Duration::from_secs(10),
            },
        }
    }
}

/// A recorded write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockWrite {
    Single { address: u16, value: u16 },
    Multiple { address: u16, values: Vec<u16> },
}

impl MockWrite {
    pub fn address(&self) -> u16 {
        match self {
            MockWrite::Single { address, .. } | MockWrite::Multiple { address, .. } => *address,
        }
    }
}

#[derive(Debug)]
enum ScriptedRead {
    Registers(Vec<u16>),
    Fail(MockFailure),
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    connect_failures: usize,
    connect_attempts: usize,
    disconnects: usize,
    reads: VecDeque<ScriptedRead>,
    default_block: Option<(u16, Vec<u16>)>,
    read_requests: Vec<(u16, u16)>,
    write_failures: VecDeque<MockFailure>,
    writes: Vec<MockWrite>,
    op_delay: Duration,
    in_flight: usize,
    max_in_flight: usize,
}

/// Scripted in-memory Modbus station
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that answers every unscripted read with `block`, mapped at `base`.
    pub fn with_block(base: u16, block: Vec<u16>) -> Self {
        let mock = Self::new();
        mock.set_default_block(base, block);
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_default_block(&self, base: u16, block: Vec<u16>) {
        self.state().default_block = Some((base, block));
    }

    /// Overwrite one word of the default block, e.g. to change the state
    /// the station reports on the next poll.
    pub fn set_register(&self, address: u16, value: u16) {
        let mut state = self.state();
        if let Some((base, block)) = state.default_block.as_mut() {
            if let Some(slot) = address
                .checked_sub(*base)
                .and_then(|offset| block.get_mut(offset as usize))
            {
                *slot = value;
            }
        }
    }

    /// Queue registers returned verbatim by the next read
    pub fn push_registers(&self, registers: Vec<u16>) {
        self.state().reads.push_back(ScriptedRead::Registers(registers));
    }

    /// Queue a failure for the next read
    pub fn push_failure(&self, failure: MockFailure) {
        self.state().reads.push_back(ScriptedRead::Fail(failure));
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state().connect_failures = count;
    }

    pub fn fail_next_write(&self, failure: MockFailure) {
        self.state().write_failures.push_back(failure);
    }

    /// Delay applied inside every read and write, to make overlap observable
    pub fn set_op_delay(&self, delay: Duration) {
        self.state().op_delay = delay;
    }

    pub fn writes(&self) -> Vec<MockWrite> {
        self.state().writes.clone()
    }

    /// Writes addressed to one register
    pub fn writes_to(&self, address: u16) -> Vec<MockWrite> {
        self.state()
            .writes
            .iter()
            .filter(|w| w.address() == address)
            .cloned()
            .collect()
    }

    pub fn read_requests(&self) -> Vec<(u16, u16)> {
        self.state().read_requests.clone()
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    pub fn disconnects(&self) -> usize {
        self.state().disconnects
    }

    /// Highest number of operations that were ever running at once
    pub fn max_concurrent_ops(&self) -> usize {
        self.state().max_in_flight
    }

    /// Drop the connection as if the station went away
    pub fn drop_connection(&self) {
        self.state().connected = false;
    }

    async fn begin_op(&self) {
        let delay = {
            let mut state = self.state();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.op_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn end_op(state: &mut MockState, failure: Option<&TransportError>) {
        state.in_flight = state.in_flight.saturating_sub(1);
        if failure.is_some_and(TransportError::closes_connection) {
            state.connected = false;
        }
    }

    fn apply_write(state: &mut MockState, address: u16, values: &[u16]) {
        if let Some((base, block)) = state.default_block.as_mut() {
            for (i, value) in values.iter().enumerate() {
                let Some(offset) = (address as usize + i).checked_sub(*base as usize) else {
                    continue;
                };
                if let Some(slot) = block.get_mut(offset) {
                    *slot = *value;
                }
            }
        }
    }

    async fn write(&self, request: MockWrite) -> Result<(), TransportError> {
        if !self.state().connected {
            return Err(TransportError::NotConnected);
        }
        self.begin_op().await;

        let mut state = self.state();
        let result = match state.write_failures.pop_front() {
            Some(failure) => Err(failure.to_error("write")),
            None => {
                let (address, values) = match &request {
                    MockWrite::Single { address, value } => (*address, vec![*value]),
                    MockWrite::Multiple { address, values } => (*address, values.clone()),
                };
                Self::apply_write(&mut state, address, &values);
                Ok(())
            }
        };
        state.writes.push(request);
        Self::end_op(&mut state, result.as_ref().err());
        result
    }
}

#[async_trait::async_trait]
impl RegisterTransport for MockTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.connected {
            return Ok(());
        }
        state.connect_attempts += 1;
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(TransportError::Connect {
                target: "mock".into(),
                reason: "connection refused".into(),
            });
        }
        state.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn read_holding_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        if !self.state().connected {
            return Err(TransportError::NotConnected);
        }
        self.begin_op().await;

        let mut state = self.state();
        state.read_requests.push((address, count));
        let result = match state.reads.pop_front() {
            Some(ScriptedRead::Registers(regs)) => Ok(regs),
            Some(ScriptedRead::Fail(failure)) => Err(failure.to_error("read")),
            None => match &state.default_block {
                Some((base, block)) => {
                    let start = address.saturating_sub(*base) as usize;
                    let end = (start + count as usize).min(block.len());
                    Ok(block.get(start..end).map(<[u16]>::to_vec).unwrap_or_default())
                }
                None => Err(TransportError::Exception("IllegalDataAddress".into())),
            },
        };
        Self::end_op(&mut state, result.as_ref().err());
        result
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), TransportError> {
        self.write(MockWrite::Single { address, value }).await
    }

    async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        self.write(MockWrite::Multiple {
            address,
            values: values.to_vec(),
        })
        .await
    }

    async fn disconnect(&mut self) {
        let mut state = self.state();
        if state.connected {
            state.connected = false;
            state.disconnects += 1;
        }
    }

    fn target(&self) -> String {
        "mock".to_string()
    }
}
