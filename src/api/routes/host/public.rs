//! Public types for the host session API
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HostStatus {
    pub user_id: u64,
}
