use near_sdk::store::IterableSet;
use near_sdk::{near, IntoStorageKey};

use crate::error::SwapError;
use crate::escrow::Asset;

/// Primary-ledger assets accepted for escrow. Anything absent is rejected.
#[near(serializers = [borsh])]
pub struct AllowList {
    pub tokens: IterableSet<Asset>,
}

impl AllowList {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            tokens: IterableSet::new(prefix),
        }
    }

    pub fn contains(&self, token: &Asset) -> bool {
        self.tokens.contains(token)
    }

    pub fn assert_allowed(&self, token: &Asset) -> Result<(), SwapError> {
        if !self.contains(token) {
            return Err(SwapError::TokenNotAllowed);
        }
        Ok(())
    }

    /// Sets membership for every entry; re-adding or re-removing is a no-op
    /// on state.
    pub fn set(&mut self, tokens: &[Asset], is_allowed: bool) {
        for token in tokens {
            if is_allowed {
                self.tokens.insert(token.clone());
            } else {
                self.tokens.remove(token);
            }
        }
    }

    pub fn list(&self) -> Vec<Asset> {
        self.tokens.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_sdk::test_utils::accounts;

    #[test]
    fn membership_follows_the_last_update() {
        let mut allow_list = AllowList::new(b"a");
        let token = Asset::Ft(accounts(3));
        assert_eq!(allow_list.assert_allowed(&token), Err(SwapError::TokenNotAllowed));

        allow_list.set(&[token.clone(), Asset::Native], true);
        allow_list.set(&[token.clone()], true);
        assert!(allow_list.assert_allowed(&token).is_ok());
        assert_eq!(allow_list.list().len(), 2);

        allow_list.set(&[token.clone()], false);
        assert!(!allow_list.contains(&token));
        assert!(allow_list.contains(&Asset::Native));
    }
}
