use near_sdk::json_types::{Base58CryptoHash, U128, U64};
use near_sdk::{near, AccountId};

use crate::escrow::Asset;
use crate::verifier::HeaderSource;

// Indexers decode these by field name and order; append new fields only.

#[near(event_json(standard = "offer_manager"))]
pub enum OfferEvent {
    #[event_version("1.0.0")]
    OfferRegistered {
        offer_id: U64,
        maker: AccountId,
        maker_identity: Base58CryptoHash,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
        taker: AccountId,
        taker_token: Asset,
        taker_amount: U128,
    },
    #[event_version("1.0.0")]
    OfferTakerUpdated {
        offer_id: U64,
        taker_identity: Base58CryptoHash,
    },
    #[event_version("1.0.0")]
    OfferActivated {
        offer_id: U64,
        taker_identity: Base58CryptoHash,
    },
}

#[near(event_json(standard = "offer_manager_reverse"))]
pub enum ReverseOfferEvent {
    #[event_version("1.0.0")]
    OfferRegistered {
        offer_id: U64,
        taker: AccountId,
        taker_identity: Base58CryptoHash,
        taker_token: Asset,
        taker_amount: U128,
        maker: AccountId,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
    },
    #[event_version("1.0.0")]
    OfferActivated {
        offer_id: U64,
        taker_identity: Base58CryptoHash,
    },
}

#[near(event_json(standard = "offer_manager_admin"))]
pub enum AdminEvent {
    #[event_version("1.0.0")]
    TokenAllowListUpdated { token: Asset, is_allowed: bool },
    #[event_version("1.0.0")]
    VerifierChanged { header_source: HeaderSource },
    #[event_version("1.0.0")]
    HeaderRegistered {
        block_number: u64,
        block_hash: Base58CryptoHash,
    },
    #[event_version("1.0.0")]
    OwnershipTransferred {
        previous_owner: AccountId,
        new_owner: AccountId,
    },
    #[event_version("1.0.0")]
    StateMigrated { from_version: u32, to_version: u32 },
}
