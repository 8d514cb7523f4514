use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::bluetooth::transport::Transport;
use crate::error::TransportError;

/// A transport operation as observed by the mock
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Connect(String, String),
    Read(u16),
    Write(u16, Vec<u8>, bool),
    Disconnect,
}

#[derive(Clone, Debug, Default)]
pub struct MockSession;

/// Scripted transport: per-handle queues of failures are served first,
/// then the configured value for the handle is returned.
#[derive(Debug, Default)]
pub struct MockTransport {
    values: HashMap<u16, Vec<u8>>,
    failures: RefCell<HashMap<u16, VecDeque<TransportError>>>,
    connect_failures: RefCell<VecDeque<TransportError>>,
    ops: RefCell<Vec<Op>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sensor on firmware 3.1.8 reporting 21.4 °C, 2000 lx, 30 %, 520 µS/cm
    pub fn with_sample_data() -> Self {
        Self::new()
            .with_value(0x03, b"Flower care".to_vec())
            .with_value(0x38, vec![0x5a, 0x2b, b'3', b'.', b'1', b'.', b'8'])
            .with_value(
                0x35,
                vec![
                    0xd6, 0x00, 0x00, 0xd0, 0x07, 0x00, 0x00, 0x1e, 0x08, 0x02, 0x02, 0x3c, 0x00,
                    0xfb, 0x34, 0x9b,
                ],
            )
    }

    pub fn with_value(mut self, handle: u16, value: Vec<u8>) -> Self {
        self.values.insert(handle, value);
        self
    }

    /// Fail the next `count` operations on `handle` with `error`
    pub fn fail_next(&self, handle: u16, count: usize, error: TransportError) {
        let mut failures = self.failures.borrow_mut();
        let queue = failures.entry(handle).or_default();
        for _ in 0..count {
            queue.push_back(error.clone());
        }
    }

    pub fn fail_next_connect(&self, count: usize, error: TransportError) {
        let mut failures = self.connect_failures.borrow_mut();
        for _ in 0..count {
            failures.push_back(error.clone());
        }
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.borrow().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    fn next_failure(&self, handle: u16) -> Option<TransportError> {
        self.failures
            .borrow_mut()
            .get_mut(&handle)
            .and_then(|queue| queue.pop_front())
    }
}

impl Transport for MockTransport {
    type Session = MockSession;

    async fn connect(&self, address: &str, adapter: &str) -> Result<MockSession, TransportError> {
        self.ops
            .borrow_mut()
            .push(Op::Connect(address.to_string(), adapter.to_string()));
        if let Some(err) = self.connect_failures.borrow_mut().pop_front() {
            return Err(err);
        }
        Ok(MockSession)
    }

    async fn read_characteristic(
        &self,
        _session: &MockSession,
        handle: u16,
    ) -> Result<Vec<u8>, TransportError> {
        self.ops.borrow_mut().push(Op::Read(handle));
        if let Some(err) = self.next_failure(handle) {
            return Err(err);
        }
        self.values.get(&handle).cloned().ok_or_else(|| {
            TransportError::Rejected(format!("no characteristic with handle {:#06x}", handle))
        })
    }

    async fn write_characteristic(
        &self,
        _session: &MockSession,
        handle: u16,
        value: &[u8],
        wait_for_response: bool,
    ) -> Result<(), TransportError> {
        self.ops
            .borrow_mut()
            .push(Op::Write(handle, value.to_vec(), wait_for_response));
        match self.next_failure(handle) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn disconnect(&self, _session: MockSession) {
        self.ops.borrow_mut().push(Op::Disconnect);
    }
}
