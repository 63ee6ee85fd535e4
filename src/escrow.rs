use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128, U64};
use near_sdk::store::IterableMap;
use near_sdk::{ext_contract, near, AccountId, IntoStorageKey, NearToken, Promise};

use crate::config::GAS_FOR_FT_TRANSFER;
use crate::error::SwapError;

// NEP-141 Fungible Token or Native NEAR
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Asset {
    Native,
    Ft(AccountId),
}

#[ext_contract(ext_fungible_token)]
pub trait FungibleToken {
    fn ft_transfer(&mut self, receiver_id: AccountId, amount: U128, memo: Option<String>);
}

// Message carried by `ft_transfer_call` into `ft_on_transfer`
#[near(serializers = [json])]
#[serde(rename_all = "snake_case")]
pub enum FtTransferMsg {
    /// Taker pays a forward offer in fungible tokens.
    Activate {
        offer_id: U64,
        witness: Option<Base64VecU8>,
    },
    /// Taker opens a reverse offer by depositing fungible tokens.
    ReverseRegister {
        taker_identity: Base58CryptoHash,
        taker_amount: U128,
        maker: AccountId,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
    },
}

/// Custody ledger of everything the contract holds for open offers.
#[near(serializers = [borsh])]
pub struct EscrowEngine {
    pub custody: IterableMap<Asset, U128>,
}

impl EscrowEngine {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            custody: IterableMap::new(prefix),
        }
    }

    pub fn balance(&self, asset: &Asset) -> U128 {
        self.custody.get(asset).copied().unwrap_or(U128(0))
    }

    pub fn lock(&mut self, asset: &Asset, amount: u128) {
        let current = self.balance(asset).0;
        self.custody.insert(asset.clone(), U128(current + amount));
    }

    pub fn unlock(&mut self, asset: &Asset, amount: u128) -> Result<(), SwapError> {
        let current = self.balance(asset).0;
        let remaining = current
            .checked_sub(amount)
            .ok_or(SwapError::CustodyUnderflow(amount))?;
        self.custody.insert(asset.clone(), U128(remaining));
        Ok(())
    }

    pub fn list(&self) -> Vec<(Asset, U128)> {
        self.custody
            .iter()
            .map(|(asset, amount)| (asset.clone(), *amount))
            .collect()
    }
}

/// Attached or transferred value must match the offer to the unit.
pub fn require_exact_amount(expected: U128, actual: u128) -> Result<(), SwapError> {
    if expected.0 != actual {
        return Err(SwapError::PaymentMismatch {
            expected: expected.0,
            actual,
        });
    }
    Ok(())
}

pub fn payout(asset: &Asset, receiver_id: AccountId, amount: u128, memo: &str) -> Promise {
    match asset {
        Asset::Native => Promise::new(receiver_id).transfer(NearToken::from_yoctonear(amount)),
        Asset::Ft(token_id) => ext_fungible_token::ext(token_id.clone())
            .with_attached_deposit(NearToken::from_yoctonear(1))
            .with_static_gas(GAS_FOR_FT_TRANSFER)
            .ft_transfer(receiver_id, U128(amount), Some(memo.to_string())),
    }
}
