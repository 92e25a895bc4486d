//! Session rehydration.
//!
//! Every time a connection is (re)established the manager re-issues the
//! identity-bound setup operations so server-side room membership and
//! presence registration are never stale, even when the original join was
//! never queued. The setup runs before any queued operation is replayed.

use crate::identity::Identity;
use crate::wire::Operation;

/// Operations presented before anything else on a fresh connection.
///
/// Currently just the bearer token, when one is stored.
pub(crate) fn connect_preamble(identity: &Identity) -> Vec<Operation> {
    match identity.token.as_deref() {
        Some(token) if !token.is_empty() => vec![Operation::authenticate(token)],
        _ => Vec::new(),
    }
}

/// The identity-bound setup triplet, degraded to a subset when parts of
/// the identity are missing. Empty for anonymous sessions.
pub(crate) fn session_setup(identity: &Identity) -> Vec<Operation> {
    if !identity.has_subject() {
        return Vec::new();
    }
    let subject = identity.subject_id.as_str();
    let mut ops = vec![Operation::join_room(subject)];
    if let Some(contact) = identity.contact.as_deref() {
        if !contact.is_empty() {
            ops.push(Operation::register_presence(subject, contact));
        }
    }
    ops.push(Operation::register_for_notifications(subject));
    ops
}
