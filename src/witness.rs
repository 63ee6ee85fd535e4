use near_sdk::borsh::{self, BorshSerialize};
use near_sdk::json_types::{Base58CryptoHash, U128};
use near_sdk::{env, near, CryptoHash};

use crate::error::SwapError;
use crate::merkle::MerkleProof;
use crate::verifier::HeaderSource;

/// Value asserted on the settlement ledger.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementAsset {
    pub token_address: Base58CryptoHash,
    pub token_id: U128,
    pub amount: U128,
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_number: u64,
    pub prev_block_hash: CryptoHash,
    pub block_headers_digest: CryptoHash,
    pub transactions_digest: CryptoHash,
    pub deposit_digest: CryptoHash,
    pub proposed_world_state_digest: CryptoHash,
    pub approved_world_state_digest: CryptoHash,
    pub latest_account_digest: CryptoHash,
}

impl BlockHeader {
    /// Digest the aggregator signs.
    pub fn hash(&self) -> CryptoHash {
        env::sha256_array(&canonical_bytes(self))
    }
}

/// Witness carrying its own header and aggregator signature.
#[near(serializers = [borsh])]
#[derive(Clone, Debug)]
pub struct SignedWitness {
    pub assets: Vec<SettlementAsset>,
    pub recipient: Base58CryptoHash,
    pub merkle_proof: MerkleProof,
    pub block_header: BlockHeader,
    pub signature: Vec<u8>,
}

/// Shorter witness pointing at a header registered ahead of time.
#[near(serializers = [borsh])]
#[derive(Clone, Debug)]
pub struct RegisteredWitness {
    pub assets: Vec<SettlementAsset>,
    pub recipient: Base58CryptoHash,
    pub merkle_proof: MerkleProof,
    pub block_hash: CryptoHash,
}

impl SignedWitness {
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

impl RegisteredWitness {
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_bytes(self)
    }
}

#[derive(Clone, Debug)]
pub enum HeaderAttestation {
    Signed {
        header: BlockHeader,
        signature: Vec<u8>,
    },
    Registered {
        block_hash: CryptoHash,
    },
}

/// A decoded witness together with the fingerprint the replay guard tracks.
#[derive(Clone, Debug)]
pub struct Witness {
    pub assets: Vec<SettlementAsset>,
    pub recipient: Base58CryptoHash,
    pub merkle_proof: MerkleProof,
    pub attestation: HeaderAttestation,
    pub fingerprint: CryptoHash,
}

impl Witness {
    /// Decodes the canonical encoding expected by `source`. Every byte must be
    /// consumed; anything else is a malformed witness.
    pub fn decode(bytes: &[u8], source: &HeaderSource) -> Result<Self, SwapError> {
        if bytes.is_empty() {
            return Err(SwapError::MalformedWitness("empty witness".to_string()));
        }

        let witness = match source {
            HeaderSource::Signed => {
                let wire: SignedWitness = borsh::from_slice(bytes)
                    .map_err(|err| SwapError::MalformedWitness(err.to_string()))?;
                let block_hash = wire.block_header.hash();
                Witness::new(
                    wire.assets,
                    wire.recipient,
                    wire.merkle_proof,
                    &block_hash,
                    HeaderAttestation::Signed {
                        header: wire.block_header,
                        signature: wire.signature,
                    },
                )
            }
            HeaderSource::Registered => {
                let wire: RegisteredWitness = borsh::from_slice(bytes)
                    .map_err(|err| SwapError::MalformedWitness(err.to_string()))?;
                let block_hash = wire.block_hash;
                Witness::new(
                    wire.assets,
                    wire.recipient,
                    wire.merkle_proof,
                    &block_hash,
                    HeaderAttestation::Registered { block_hash },
                )
            }
        };

        if witness.assets.is_empty() {
            return Err(SwapError::MalformedWitness("no asset asserted".to_string()));
        }
        Ok(witness)
    }

    /// Fingerprint of `bytes` under whichever layout they decode as, so a
    /// lookup works across a header source change.
    pub fn fingerprint_of(bytes: &[u8]) -> Option<CryptoHash> {
        Witness::decode(bytes, &HeaderSource::Signed)
            .or_else(|_| Witness::decode(bytes, &HeaderSource::Registered))
            .ok()
            .map(|witness| witness.fingerprint)
    }

    fn new(
        assets: Vec<SettlementAsset>,
        recipient: Base58CryptoHash,
        merkle_proof: MerkleProof,
        block_hash: &CryptoHash,
        attestation: HeaderAttestation,
    ) -> Self {
        let fingerprint = transfer_fingerprint(
            block_hash,
            merkle_proof.index,
            &leaf_hash(&assets, &recipient),
        );
        Witness {
            assets,
            recipient,
            merkle_proof,
            attestation,
            fingerprint,
        }
    }
}

/// Merkle leaf committing to a transfer of `assets` to `recipient`.
pub fn leaf_hash(assets: &[SettlementAsset], recipient: &Base58CryptoHash) -> CryptoHash {
    env::sha256_array(&canonical_bytes(&(assets, recipient)))
}

/// Identifies one settlement-ledger transfer by block and leaf position. The
/// signed and the registered encodings of the same transfer share it.
pub fn transfer_fingerprint(block_hash: &CryptoHash, index: u64, leaf: &CryptoHash) -> CryptoHash {
    let mut buffer = Vec::with_capacity(72);
    buffer.extend_from_slice(block_hash);
    buffer.extend_from_slice(&index.to_le_bytes());
    buffer.extend_from_slice(leaf);
    env::sha256_array(&buffer)
}

fn canonical_bytes<T: BorshSerialize + ?Sized>(value: &T) -> Vec<u8> {
    let mut buffer = Vec::new();
    value.serialize(&mut buffer).expect("Serialization failed");
    buffer
}
