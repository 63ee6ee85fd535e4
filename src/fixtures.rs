//! Witness and contract builders shared by the unit tests.

use ed25519_dalek::{Signer, SigningKey};
use near_sdk::json_types::{Base58CryptoHash, U128, U64};
use near_sdk::mock::MockAction;
use near_sdk::serde_json::{self, Value};
use near_sdk::test_utils::{accounts, get_created_receipts, VMContextBuilder};
use near_sdk::{
    bs58, test_vm_config, testing_env, AccountId, NearToken, PromiseResult, PublicKey,
    RuntimeFeesConfig,
};

use crate::config::WitnessStage;
use crate::error::SwapError;
use crate::escrow::Asset;
use crate::merkle::{compute_root, MerkleProof};
use crate::verifier::{HeaderSource, VerifierConfig};
use crate::witness::{leaf_hash, BlockHeader, RegisteredWitness, SettlementAsset, SignedWitness};
use crate::Contract;

pub const MAKER_IDENTITY: [u8; 32] = [0xc3; 32];
pub const TAKER_IDENTITY: [u8; 32] = [0xb2; 32];
pub const MAKER_ASSET: [u8; 32] = [0xa1; 32];
pub const MAKER_AMOUNT: u128 = 10;
pub const TAKER_AMOUNT: u128 = 1_000_000_000_000_000;

pub fn aggregator() -> SigningKey {
    SigningKey::from_bytes(&[7; 32])
}

pub fn impostor() -> SigningKey {
    SigningKey::from_bytes(&[8; 32])
}

pub fn near_public_key(key: &SigningKey) -> PublicKey {
    format!(
        "ed25519:{}",
        bs58::encode(key.verifying_key().to_bytes()).into_string()
    )
    .parse()
    .unwrap()
}

pub fn verifier_config(header_source: HeaderSource) -> VerifierConfig {
    VerifierConfig {
        aggregator: near_public_key(&aggregator()),
        header_source,
    }
}

pub fn digest(bytes: [u8; 32]) -> Base58CryptoHash {
    bytes.into()
}

pub fn settlement_asset(amount: u128) -> SettlementAsset {
    SettlementAsset {
        token_address: digest(MAKER_ASSET),
        token_id: U128(0),
        amount: U128(amount),
    }
}

/// A transfer of `assets` to `recipient`, included at index 1 of a
/// four-leaf tree whose root is the header's transactions digest.
pub struct Transfer {
    pub assets: Vec<SettlementAsset>,
    pub recipient: Base58CryptoHash,
    pub block_number: u64,
    pub prev_block_hash: [u8; 32],
}

impl Transfer {
    pub fn new(assets: Vec<SettlementAsset>, recipient: [u8; 32]) -> Self {
        Self {
            assets,
            recipient: digest(recipient),
            block_number: 1,
            prev_block_hash: [0; 32],
        }
    }

    pub fn proof(&self) -> MerkleProof {
        MerkleProof {
            index: 1,
            value: leaf_hash(&self.assets, &self.recipient),
            siblings: vec![[0x11; 32], [0x22; 32]],
        }
    }

    pub fn header(&self) -> BlockHeader {
        let proof = self.proof();
        BlockHeader {
            block_number: self.block_number,
            prev_block_hash: self.prev_block_hash,
            block_headers_digest: [0x31; 32],
            transactions_digest: compute_root(&proof.value, proof.index, &proof.siblings)
                .unwrap(),
            deposit_digest: [0x32; 32],
            proposed_world_state_digest: [0x33; 32],
            approved_world_state_digest: [0x33; 32],
            latest_account_digest: [0x34; 32],
        }
    }

    pub fn signed_by(&self, key: &SigningKey) -> SignedWitness {
        let block_header = self.header();
        SignedWitness {
            assets: self.assets.clone(),
            recipient: self.recipient,
            merkle_proof: self.proof(),
            signature: sign(key, &block_header),
            block_header,
        }
    }

    pub fn signed(&self) -> SignedWitness {
        self.signed_by(&aggregator())
    }

    pub fn registered(&self) -> RegisteredWitness {
        RegisteredWitness {
            assets: self.assets.clone(),
            recipient: self.recipient,
            merkle_proof: self.proof(),
            block_hash: self.header().hash(),
        }
    }
}

pub fn sign(key: &SigningKey, header: &BlockHeader) -> Vec<u8> {
    key.sign(&header.hash()).to_bytes().to_vec()
}

/// Witness of the maker's transfer to the taker's settlement identity.
pub fn taker_witness() -> Vec<u8> {
    Transfer::new(vec![settlement_asset(MAKER_AMOUNT)], TAKER_IDENTITY)
        .signed()
        .to_bytes()
}

pub fn owner() -> AccountId {
    accounts(0)
}

pub fn maker() -> AccountId {
    accounts(1)
}

pub fn taker() -> AccountId {
    accounts(2)
}

pub fn ft_token() -> AccountId {
    accounts(3)
}

pub fn set_caller(predecessor: AccountId, deposit: u128) {
    testing_env!(VMContextBuilder::new()
        .current_account_id(current_account())
        .predecessor_account_id(predecessor)
        .attached_deposit(NearToken::from_yoctonear(deposit))
        .block_index(100)
        .build());
}

pub fn current_account() -> AccountId {
    "offers.near".parse().unwrap()
}

/// Runs the next call as the contract's own callback, with `result` as the
/// outcome of the receipt it was chained on.
pub fn resolve_with(result: PromiseResult) {
    testing_env!(
        VMContextBuilder::new()
            .current_account_id(current_account())
            .predecessor_account_id(current_account())
            .block_index(101)
            .build(),
        test_vm_config(),
        RuntimeFeesConfig::test(),
        Default::default(),
        vec![result]
    );
}

/// Value leaving the contract in the receipts created by the last call.
#[derive(Debug, PartialEq)]
pub enum Payout {
    Native {
        receiver_id: AccountId,
        amount: u128,
    },
    FtTransfer {
        token: AccountId,
        args: Value,
        deposit: u128,
    },
}

pub fn payouts() -> Vec<Payout> {
    get_created_receipts()
        .into_iter()
        .flat_map(|receipt| {
            let receiver_id = receipt.receiver_id;
            receipt
                .actions
                .into_iter()
                .filter_map(move |action| match action {
                    MockAction::Transfer { deposit, .. } => Some(Payout::Native {
                        receiver_id: receiver_id.clone(),
                        amount: deposit.as_yoctonear(),
                    }),
                    MockAction::FunctionCallWeight {
                        method_name,
                        args,
                        attached_deposit,
                        ..
                    } if method_name == b"ft_transfer" => Some(Payout::FtTransfer {
                        token: receiver_id.clone(),
                        args: serde_json::from_slice(&args).unwrap(),
                        deposit: attached_deposit.as_yoctonear(),
                    }),
                    _ => None,
                })
        })
        .collect()
}

/// Contract with native coin and `ft_token()` allow-listed.
pub fn setup(stage: WitnessStage) -> Contract {
    set_caller(owner(), 0);
    let mut contract = Contract::new(
        owner(),
        verifier_config(HeaderSource::Signed),
        Some(stage),
    );
    contract
        .add_token_address_to_allow_list(vec![Asset::Native, Asset::Ft(ft_token())])
        .unwrap();
    contract
}

/// Maker opens a forward offer on the standard terms.
pub fn register_offer(
    contract: &mut Contract,
    taker_token: Asset,
    witness: Option<Vec<u8>>,
) -> Result<U64, SwapError> {
    set_caller(maker(), 0);
    contract.register(
        digest(MAKER_IDENTITY),
        digest(MAKER_ASSET),
        U128(MAKER_AMOUNT),
        taker(),
        digest(TAKER_IDENTITY),
        taker_token,
        U128(TAKER_AMOUNT),
        witness.map(Into::into),
    )
}

pub fn expect_err<T>(result: Result<T, SwapError>) -> SwapError {
    match result {
        Ok(_) => panic!("call was expected to fail"),
        Err(err) => err,
    }
}

pub fn emitted(event: &str) -> bool {
    let needle = format!("\"event\":\"{}\"", event);
    near_sdk::test_utils::get_logs()
        .iter()
        .any(|log| log.starts_with("EVENT_JSON:") && log.contains(&needle))
}
