//! Identity context consumed at connect time.
//!
//! The connection manager does not own authentication. It reads whatever
//! identity the surrounding application has stored at the moment a
//! connection is (re)established, and replays the identity-bound setup
//! operations from it. An absent identity means an anonymous session and
//! rehydration becomes a no-op.

use std::cell::RefCell;
use std::rc::Rc;

/// Identity-bound session context: subject id plus optional contact
/// address and bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject identifier used for room membership and presence.
    pub subject_id: String,
    /// Contact address registered alongside presence, if known.
    pub contact: Option<String>,
    /// Bearer token presented when a connection opens, if known.
    pub token: Option<String>,
}

impl Identity {
    /// Create an identity for the given subject.
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            contact: None,
            token: None,
        }
    }

    /// Attach a contact address.
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// Attach a bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Whether this identity carries a usable subject id.
    pub fn has_subject(&self) -> bool {
        !self.subject_id.trim().is_empty()
    }
}

/// Shared handle to the externally-owned identity context.
///
/// The surrounding application updates this on login/logout; the manager
/// reads a snapshot on every connect and rehydration so server-side room
/// membership always matches the last known identity.
#[derive(Clone, Default)]
pub struct IdentityStore {
    inner: Rc<RefCell<Option<Identity>>>,
}

impl IdentityStore {
    /// Create an empty (anonymous) identity store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding an identity.
    pub fn with_identity(identity: Identity) -> Self {
        let store = Self::new();
        store.set(identity);
        store
    }

    /// Replace the stored identity.
    pub fn set(&self, identity: Identity) {
        *self.inner.borrow_mut() = Some(identity);
    }

    /// Clear the stored identity (logout).
    pub fn clear(&self) {
        *self.inner.borrow_mut() = None;
    }

    /// Snapshot the current identity, if any.
    pub fn get(&self) -> Option<Identity> {
        self.inner.borrow().clone()
    }
}
