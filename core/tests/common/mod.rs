#![allow(dead_code)]

use std::collections::VecDeque;

use emv::{Transport, TransportError};

/// Reply of the mock card once its script has run out.
pub const NOT_FOUND: [u8; 2] = [0x6A, 0x82];

/// A frame received by [`MockTransport`], with the field flags it came with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub frame: Vec<u8>,
    pub activate_field: bool,
    pub leave_field_on: bool,
}

/// A transport that plays back scripted replies and records what it is given.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: VecDeque<Result<Vec<u8>, TransportError>>,
    pub sent: Vec<Sent>,
    pub field_drops: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a raw reply, status word included.
    pub fn reply(mut self, rx: &[u8]) -> Self {
        self.replies.push_back(Ok(rx.to_vec()));
        self
    }

    /// Queues a reply made of the payload followed by `9000`.
    pub fn ok(self, payload: &[u8]) -> Self {
        let mut rx = payload.to_vec();
        rx.extend([0x90, 0x00]);
        self.reply(&rx)
    }

    /// Queues a transport failure.
    pub fn fail(mut self, e: TransportError) -> Self {
        self.replies.push_back(Err(e));
        self
    }

    pub fn frames(&self) -> Vec<&[u8]> {
        self.sent.iter().map(|sent| sent.frame.as_slice()).collect()
    }
}

impl Transport for MockTransport {
    fn transmit(
        &mut self,
        frame: &[u8],
        activate_field: bool,
        leave_field_on: bool,
    ) -> Result<Vec<u8>, TransportError> {
        self.sent.push(Sent {
            frame: frame.to_vec(),
            activate_field,
            leave_field_on,
        });

        self.replies
            .pop_front()
            .unwrap_or_else(|| Ok(NOT_FOUND.to_vec()))
    }

    fn drop_field(&mut self) {
        self.field_drops += 1;
    }
}

/// `SELECT` by name of the AID, as framed on the wire.
pub fn select_frame(aid: &[u8]) -> Vec<u8> {
    let mut frame = vec![0x00, 0xA4, 0x04, 0x00, aid.len() as u8];
    frame.extend_from_slice(aid);
    frame.push(0x00);
    frame
}
