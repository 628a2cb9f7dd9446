//! Scripted in-memory transports for unit tests.

use crate::runtime::{Listener, Transport};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::rc::Rc;

/// One scripted outcome of a `read` call.
#[derive(Debug)]
pub(crate) enum ReadStep {
    Data(Vec<u8>),
    WouldBlock,
    Fail(io::ErrorKind),
}

/// One scripted outcome of a `write` call.
#[derive(Debug)]
pub(crate) enum WriteStep {
    /// Accept at most this many bytes.
    Accept(usize),
    WouldBlock,
    Fail(io::ErrorKind),
}

/// Observes a `MockStream` after it has been handed off and dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tap {
    written: Rc<RefCell<Vec<u8>>>,
    closed: Rc<Cell<bool>>,
    read_calls: Rc<Cell<usize>>,
}

impl Tap {
    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.borrow().clone()
    }

    pub(crate) fn written_str(&self) -> String {
        String::from_utf8_lossy(&self.written.borrow()).into_owned()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }

    pub(crate) fn read_calls(&self) -> usize {
        self.read_calls.get()
    }
}

/// A transport that replays scripted reads and records writes.
///
/// Once the read script is exhausted every read returns `Ok(0)`; once the
/// write script is exhausted every write is accepted in full.
#[derive(Debug, Default)]
pub(crate) struct MockStream {
    reads: VecDeque<ReadStep>,
    writes: VecDeque<WriteStep>,
    tap: Tap,
}

impl MockStream {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self::new().read_step(ReadStep::Data(input.as_ref().to_vec()))
    }

    pub(crate) fn read_step(mut self, step: ReadStep) -> Self {
        self.reads.push_back(step);
        self
    }

    pub(crate) fn data(self, input: impl AsRef<[u8]>) -> Self {
        self.read_step(ReadStep::Data(input.as_ref().to_vec()))
    }

    pub(crate) fn would_block(self) -> Self {
        self.read_step(ReadStep::WouldBlock)
    }

    pub(crate) fn write_step(mut self, step: WriteStep) -> Self {
        self.writes.push_back(step);
        self
    }

    pub(crate) fn tap(&self) -> Tap {
        self.tap.clone()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.tap.read_calls.set(self.tap.read_calls.get() + 1);
        loop {
            match self.reads.front_mut() {
                None => return Ok(0),
                Some(ReadStep::Data(data)) if data.is_empty() => {
                    self.reads.pop_front();
                }
                Some(ReadStep::Data(data)) => {
                    let n = buf.len().min(data.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    data.drain(..n);
                    if data.is_empty() {
                        self.reads.pop_front();
                    }
                    return Ok(n);
                }
                Some(ReadStep::WouldBlock) => {
                    self.reads.pop_front();
                    return Err(io::ErrorKind::WouldBlock.into());
                }
                Some(ReadStep::Fail(kind)) => {
                    let kind = *kind;
                    self.reads.pop_front();
                    return Err(kind.into());
                }
            }
        }
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.writes.pop_front() {
            None => buf.len(),
            Some(WriteStep::Accept(limit)) => buf.len().min(limit),
            Some(WriteStep::WouldBlock) => return Err(io::ErrorKind::WouldBlock.into()),
            Some(WriteStep::Fail(kind)) => return Err(kind.into()),
        };
        self.tap.written.borrow_mut().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockStream {
    fn close(&mut self) -> io::Result<()> {
        self.tap.closed.set(true);
        Ok(())
    }
}

/// A listener that hands out queued streams, then reports `WouldBlock`.
#[derive(Debug, Default)]
pub(crate) struct MockListener {
    pending: VecDeque<io::Result<MockStream>>,
    accept_calls: Rc<Cell<usize>>,
}

impl MockListener {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, stream: MockStream) -> Tap {
        let tap = stream.tap();
        self.pending.push_back(Ok(stream));
        tap
    }

    pub(crate) fn push_error(&mut self, kind: io::ErrorKind) {
        self.pending.push_back(Err(kind.into()));
    }

    pub(crate) fn accept_calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.accept_calls)
    }
}

impl Listener for MockListener {
    type Stream = MockStream;

    fn accept(&mut self) -> io::Result<(MockStream, SocketAddr)> {
        self.accept_calls.set(self.accept_calls.get() + 1);
        match self.pending.pop_front() {
            Some(Ok(stream)) => Ok((stream, "192.168.4.2:49152".parse().unwrap())),
            Some(Err(e)) => Err(e),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok("192.168.4.1:80".parse().unwrap())
    }
}
