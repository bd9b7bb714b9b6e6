//! Inbound frame decoding and listener dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use super::listeners::{Listener, ListenerRegistry};
use crate::protocol::Envelope;
use crate::server_event::ServerEvent;

/// Invoke every listener for `kind` with `arg`.
///
/// The set is snapshotted first: listeners added during this dispatch do
/// not see it, listeners removed during it still do. A panicking listener
/// is logged and skipped; its siblings still run. Returns how many
/// listeners completed.
pub(crate) fn dispatch<A>(registry: &ListenerRegistry<A>, kind: &str, arg: &A) -> usize {
    let listeners: Vec<Listener<A>> = registry.snapshot(kind);
    let mut delivered = 0;
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener(arg))) {
            Ok(()) => delivered += 1,
            Err(_) => error!(event = %kind, "Listener panicked during dispatch"),
        }
    }
    delivered
}

/// Deliver one envelope to raw and typed listeners.
pub(crate) fn dispatch_envelope(
    raw: &ListenerRegistry<Value>,
    typed: &ListenerRegistry<ServerEvent>,
    envelope: &Envelope,
) -> usize {
    let kind = envelope.kind.as_str();
    let mut delivered = dispatch(raw, kind, &envelope.data);

    // Only pay for typed parsing when someone asked for it.
    if typed.count(kind) > 0 {
        match ServerEvent::from_envelope(envelope) {
            Ok(event) => delivered += dispatch(typed, kind, &event),
            Err(e) => warn!(error = %e, "Dropping event for typed listeners"),
        }
    }

    if delivered == 0 {
        trace!(event = %kind, "No listeners for event");
    }
    delivered
}

/// Decode a text frame and dispatch it. Malformed frames are logged and
/// dropped. Returns `false` for a dropped frame.
pub(crate) fn handle_text(
    raw: &ListenerRegistry<Value>,
    typed: &ListenerRegistry<ServerEvent>,
    text: &str,
) -> bool {
    match Envelope::parse(text) {
        Ok(envelope) => {
            dispatch_envelope(raw, typed, &envelope);
            true
        }
        Err(e) => {
            debug!(error = %e, len = text.len(), "Dropping malformed frame");
            false
        }
    }
}
