//! Session event routing and inbound message reassembly.
//!
//! The ESP-IDF MQTT task delivers events on its own thread; the transport
//! copies each one into an owned [`SessionEvent`] and hands it over a
//! channel.  [`Inbox`] runs on the poll loop side: it absorbs received
//! data, stitching chunked payloads back together, and passes every other
//! event back to the transport.
//!
//! A payload larger than the client buffer arrives as one `First` chunk
//! (carrying the topic) followed by `Next` chunks at increasing offsets.
//! Oversized or out-of-order payloads are dropped; the session stays up.

use std::collections::VecDeque;

use log::{debug, warn};

use crate::app::ports::InboundMessage;

/// Inbound messages held between polls before the oldest are dropped.
pub const MAX_PENDING: usize = 16;

/// How a received event's data relates to the whole payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Complete,
    First { total: usize },
    Next { offset: usize, total: usize },
}

/// Owned copy of one client event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    Subscribed(u32),
    Received {
        topic: Option<String>,
        data: Vec<u8>,
        fragment: Fragment,
    },
    Error,
}

struct Partial {
    topic: String,
    data: Vec<u8>,
    total: usize,
}

pub struct Inbox {
    pending: VecDeque<InboundMessage>,
    partial: Option<Partial>,
    max_payload: usize,
}

impl Inbox {
    pub fn new(max_payload: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            partial: None,
            max_payload,
        }
    }

    /// Absorb received data; hand any other event back.
    pub fn route(&mut self, event: SessionEvent) -> Option<SessionEvent> {
        match event {
            SessionEvent::Received {
                topic,
                data,
                fragment,
            } => {
                self.receive(topic, data, fragment);
                None
            }
            other => Some(other),
        }
    }

    pub fn pop(&mut self) -> Option<InboundMessage> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget queued and half-assembled messages (session teardown).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.partial = None;
    }

    fn receive(&mut self, topic: Option<String>, data: Vec<u8>, fragment: Fragment) {
        match fragment {
            Fragment::Complete => {
                self.partial = None;
                let Some(topic) = topic else {
                    warn!("mqtt: message without topic dropped");
                    return;
                };
                if data.len() > self.max_payload {
                    warn!(
                        "mqtt: dropping {} byte payload on {} (limit {})",
                        data.len(),
                        topic,
                        self.max_payload
                    );
                    return;
                }
                self.queue(topic, data);
            }
            Fragment::First { total } => {
                self.partial = None;
                let Some(topic) = topic else {
                    warn!("mqtt: chunked message without topic dropped");
                    return;
                };
                if total > self.max_payload {
                    warn!(
                        "mqtt: dropping {} byte payload on {} (limit {})",
                        total, topic, self.max_payload
                    );
                    return;
                }
                let mut buf = Vec::with_capacity(total);
                buf.extend_from_slice(&data);
                self.partial = Some(Partial {
                    topic,
                    data: buf,
                    total,
                });
                self.finish_partial();
            }
            Fragment::Next { offset, total } => {
                let Some(partial) = self.partial.as_mut() else {
                    // Tail of a payload already dropped.
                    return;
                };
                if partial.total != total || partial.data.len() != offset {
                    warn!(
                        "mqtt: chunk at {} does not continue {}/{} bytes, dropping",
                        offset,
                        partial.data.len(),
                        partial.total
                    );
                    self.partial = None;
                    return;
                }
                partial.data.extend_from_slice(&data);
                self.finish_partial();
            }
        }
    }

    fn finish_partial(&mut self) {
        let done = self
            .partial
            .as_ref()
            .is_some_and(|p| p.data.len() >= p.total);
        if !done {
            return;
        }
        if let Some(p) = self.partial.take() {
            if p.data.len() > p.total {
                warn!("mqtt: chunks overran {} bytes, dropping", p.total);
                return;
            }
            debug!("mqtt: reassembled {} bytes on {}", p.total, p.topic);
            self.queue(p.topic, p.data);
        }
    }

    fn queue(&mut self, topic: String, payload: Vec<u8>) {
        if self.pending.len() >= MAX_PENDING {
            warn!("mqtt: inbound queue full, dropping oldest message");
            self.pending.pop_front();
        }
        self.pending.push_back(InboundMessage { topic, payload });
    }
}
