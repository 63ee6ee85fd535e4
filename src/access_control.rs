use near_sdk::{env, near, AccountId};

use crate::error::SwapError;

/// Holds the administrator identity checked by every owner-only entry point.
#[near(serializers = [borsh])]
pub struct AccessControl {
    pub owner_id: AccountId,
}

impl AccessControl {
    pub fn new(owner_id: AccountId) -> Self {
        Self { owner_id }
    }

    pub fn assert_owner(&self) -> Result<(), SwapError> {
        if env::predecessor_account_id() != self.owner_id {
            return Err(SwapError::NotOwner);
        }
        Ok(())
    }

    pub fn transfer(&mut self, new_owner: AccountId) -> Result<AccountId, SwapError> {
        self.assert_owner()?;
        Ok(std::mem::replace(&mut self.owner_id, new_owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use near_sdk::test_utils::{accounts, VMContextBuilder};
    use near_sdk::testing_env;

    #[test]
    fn only_the_owner_passes() {
        let mut access = AccessControl::new(accounts(0));

        testing_env!(VMContextBuilder::new()
            .predecessor_account_id(accounts(1))
            .build());
        assert_eq!(access.assert_owner(), Err(SwapError::NotOwner));
        assert_eq!(access.transfer(accounts(1)), Err(SwapError::NotOwner));

        testing_env!(VMContextBuilder::new()
            .predecessor_account_id(accounts(0))
            .build());
        assert_eq!(access.transfer(accounts(2)), Ok(accounts(0)));
        assert_eq!(access.assert_owner(), Err(SwapError::NotOwner));
    }
}
