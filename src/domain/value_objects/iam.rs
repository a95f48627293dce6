use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the authenticated caller, carried through every
/// pipeline stage so that log lines and audit rows can be attributed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RequestContext {
    pub user_id: Uuid,
}

impl RequestContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}
