use near_sdk::{env, near, AccountId};

use crate::offer::OfferBook;

/// Layout version of the current contract state.
pub const STATE_VERSION: u32 = 2;

// Kept outside the state struct so it can be read before the layout is known.
const VERSION_KEY: &[u8] = b"__state_version";

/// State written by version 1: ownership and the two offer books only.
#[near(serializers = [borsh])]
pub struct ContractV1 {
    pub owner_id: AccountId,
    pub forward: OfferBook,
    pub reverse: OfferBook,
}

/// Version 1 never wrote the key, so a missing key means version 1.
pub fn stored_version() -> u32 {
    env::storage_read(VERSION_KEY)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_le_bytes)
        .unwrap_or(1)
}

pub fn record_version(version: u32) {
    env::storage_write(VERSION_KEY, &version.to_le_bytes());
}
