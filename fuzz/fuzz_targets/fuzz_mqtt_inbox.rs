//! Fuzz target: MQTT `Inbox`
//!
//! Drives the inbox with an arbitrary sequence of complete, first and
//! follow-on chunks (offsets and totals chosen by the fuzzer) and checks
//! that it never panics, never queues more than its bound, and never hands
//! out a payload above the size limit.
//!
//! cargo fuzz run fuzz_mqtt_inbox

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightsync::adapters::mqtt::inbox::{Fragment, Inbox, MAX_PENDING, SessionEvent};

const LIMIT: usize = 4096;

fuzz_target!(|data: &[u8]| {
    let mut inbox = Inbox::new(LIMIT);
    let mut rest = data;

    while let [kind, a, b, len, tail @ ..] = rest {
        let take = usize::from(*len).min(tail.len());
        let (body, next) = tail.split_at(take);
        rest = next;

        let total = usize::from(*a) * 64 + usize::from(*b);
        let fragment = match kind % 3 {
            0 => Fragment::Complete,
            1 => Fragment::First { total },
            _ => Fragment::Next {
                offset: usize::from(*b) * 16,
                total,
            },
        };
        let topic = (kind & 0x80 == 0).then(|| "t".to_owned());
        let routed = inbox.route(SessionEvent::Received {
            topic,
            data: body.to_vec(),
            fragment,
        });
        assert!(routed.is_none());
        assert!(inbox.len() <= MAX_PENDING);
    }

    while let Some(m) = inbox.pop() {
        assert!(m.payload.len() <= LIMIT);
    }
});
