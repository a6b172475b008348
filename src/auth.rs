use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verified actor identity plus the active store context, supplied by the
/// external authentication/authorization layer. Every service call requires
/// one; the transfer state machine only decides whether the store matches the
/// role required for the requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreContext {
    pub actor_id: Uuid,
    pub store_id: Uuid,
}

impl StoreContext {
    pub fn new(actor_id: Uuid, store_id: Uuid) -> Self {
        Self { actor_id, store_id }
    }
}
