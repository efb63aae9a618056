use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use chirpy_types::models::{Chirp, User};

/// Stored user, including the password hash. Convert with `to_public` before
/// handing it to anything outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default, rename = "is_chirpy_red")]
    pub upgraded: bool,
}

impl UserRecord {
    pub fn to_public(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            upgraded: self.upgraded,
        }
    }
}

/// The whole persisted state. Ordered maps keep ids ascending on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: BTreeMap<u64, UserRecord>,
    #[serde(default)]
    pub chirps: BTreeMap<u64, Chirp>,
    /// Revoked token string -> revocation time in unix milliseconds.
    #[serde(default)]
    pub revoked: HashMap<String, i64>,
    /// Highest chirp id ever handed out. Files written before this field
    /// existed load with 0 and fall back to the largest live key.
    #[serde(default)]
    pub last_chirp_id: u64,
}

/// Next id for a table: one past the largest key, starting at 1.
pub(crate) fn next_id<V>(table: &BTreeMap<u64, V>) -> u64 {
    table.keys().next_back().map_or(1, |last| last + 1)
}

/// Next id for a table whose deleted ids must never come back.
pub(crate) fn next_id_after<V>(table: &BTreeMap<u64, V>, high_water: &mut u64) -> u64 {
    let id = next_id(table).max(*high_water + 1);
    *high_water = id;
    id
}
