use near_sdk::json_types::Base58CryptoHash;
use near_sdk::store::LookupMap;
use near_sdk::{bs58, env, near, CryptoHash, CurveType, IntoStorageKey, PublicKey};

use crate::error::{AssetField, SwapError};
use crate::replay::ReplayGuard;
use crate::witness::{leaf_hash, BlockHeader, HeaderAttestation, SettlementAsset, Witness};

/// Where the verifier gets an authenticated transactions digest from.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderSource {
    /// Every witness carries its header and the aggregator's signature.
    Signed,
    /// Headers are registered (and chained) ahead of time; witnesses only
    /// reference them by hash.
    Registered,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct VerifierConfig {
    pub aggregator: PublicKey,
    pub header_source: HeaderSource,
}

/// How many assets a caller may claim against one witness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetMode {
    Single,
    List,
}

#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderTip {
    pub block_number: u64,
    pub block_hash: Base58CryptoHash,
}

#[near(serializers = [borsh])]
pub struct WitnessVerifier {
    pub config: VerifierConfig,
    // block hash -> transactions digest
    pub registered_headers: LookupMap<CryptoHash, CryptoHash>,
    pub tip: Option<HeaderTip>,
}

impl WitnessVerifier {
    pub fn new<S: IntoStorageKey>(config: VerifierConfig, prefix: S) -> Result<Self, SwapError> {
        aggregator_key(&config.aggregator)?;
        Ok(Self {
            config,
            registered_headers: LookupMap::new(prefix),
            tip: None,
        })
    }

    pub fn change_config(&mut self, config: VerifierConfig) -> Result<(), SwapError> {
        aggregator_key(&config.aggregator)?;
        self.config = config;
        Ok(())
    }

    /// Registers an aggregator-signed header on top of the current tip.
    pub fn register_header(
        &mut self,
        header: &BlockHeader,
        signature: &[u8],
    ) -> Result<CryptoHash, SwapError> {
        let block_hash = header.hash();
        self.verify_signature(&block_hash, signature)?;

        if let Some(tip) = &self.tip {
            let tip_hash: CryptoHash = tip.block_hash.into();
            require_chained(
                header.prev_block_hash == tip_hash && header.block_number > tip.block_number,
            )?;
        }

        self.registered_headers
            .insert(block_hash, header.transactions_digest);
        self.tip = Some(HeaderTip {
            block_number: header.block_number,
            block_hash: block_hash.into(),
        });
        Ok(block_hash)
    }

    pub fn is_header_registered(&self, block_hash: &CryptoHash) -> bool {
        self.registered_headers.contains_key(block_hash)
    }

    /// Validates `witness_bytes` against the caller's claim and consumes it.
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// decoding, aggregator signature, merkle inclusion, recipient, assets,
    /// asset count, replay.
    pub fn verify(
        &self,
        claim: &[SettlementAsset],
        recipient: &Base58CryptoHash,
        witness_bytes: &[u8],
        mode: AssetMode,
        used_witnesses: &mut ReplayGuard,
    ) -> Result<CryptoHash, SwapError> {
        let witness = self.check(claim, recipient, witness_bytes, mode)?;
        used_witnesses.consume(witness.fingerprint)?;
        Ok(witness.fingerprint)
    }

    /// Same as `verify` without recording the witness.
    pub fn check(
        &self,
        claim: &[SettlementAsset],
        recipient: &Base58CryptoHash,
        witness_bytes: &[u8],
        mode: AssetMode,
    ) -> Result<Witness, SwapError> {
        let witness = Witness::decode(witness_bytes, &self.config.header_source)?;

        let transactions_digest = match &witness.attestation {
            HeaderAttestation::Signed { header, signature } => {
                self.verify_signature(&header.hash(), signature)?;
                header.transactions_digest
            }
            HeaderAttestation::Registered { block_hash } => *self
                .registered_headers
                .get(block_hash)
                .ok_or_else(|| {
                    SwapError::HeaderNotRegistered(bs58::encode(block_hash).into_string())
                })?,
        };

        let leaf = leaf_hash(&witness.assets, &witness.recipient);
        if witness.merkle_proof.value != leaf || !witness.merkle_proof.verify(&transactions_digest)
        {
            return Err(SwapError::InvalidInclusionProof);
        }

        if *recipient != witness.recipient {
            return Err(SwapError::RecipientMismatch);
        }

        compare_assets(claim, &witness.assets)?;
        check_asset_mode(claim, mode)?;

        Ok(witness)
    }

    fn verify_signature(&self, block_hash: &CryptoHash, signature: &[u8]) -> Result<(), SwapError> {
        let public_key = aggregator_key(&self.config.aggregator)?;
        let signature: [u8; 64] = signature
            .try_into()
            .map_err(|_| SwapError::InvalidSignature)?;

        if env::ed25519_verify(&signature, block_hash, &public_key) {
            Ok(())
        } else {
            Err(SwapError::InvalidSignature)
        }
    }
}

fn aggregator_key(public_key: &PublicKey) -> Result<[u8; 32], SwapError> {
    if !matches!(public_key.curve_type(), CurveType::ED25519) {
        return Err(SwapError::UnsupportedAggregatorKey);
    }
    // First byte is the curve tag.
    let pk_bytes: &[u8] = public_key.as_bytes();
    pk_bytes[1..]
        .try_into()
        .map_err(|_| SwapError::UnsupportedAggregatorKey)
}

fn require_chained(chained: bool) -> Result<(), SwapError> {
    if chained {
        Ok(())
    } else {
        Err(SwapError::HeaderNotChained)
    }
}

fn compare_assets(claim: &[SettlementAsset], committed: &[SettlementAsset]) -> Result<(), SwapError> {
    if claim.len() != committed.len() {
        return Err(SwapError::AssetMismatch(AssetField::Length));
    }
    for (claimed, committed) in claim.iter().zip(committed) {
        if claimed.token_address != committed.token_address {
            return Err(SwapError::AssetMismatch(AssetField::TokenAddress));
        }
        if claimed.token_id != committed.token_id {
            return Err(SwapError::AssetMismatch(AssetField::TokenId));
        }
        if claimed.amount != committed.amount {
            return Err(SwapError::AssetMismatch(AssetField::Amount));
        }
    }
    Ok(())
}

// One type of claim per witness: a single asset, or a list of entries that
// all name the same token.
fn check_asset_mode(claim: &[SettlementAsset], mode: AssetMode) -> Result<(), SwapError> {
    match mode {
        AssetMode::Single if claim.len() != 1 => Err(SwapError::MultipleAssetsUnsupported),
        AssetMode::Single => Ok(()),
        AssetMode::List => {
            let first = &claim[0];
            let same_type = claim.iter().all(|asset| {
                asset.token_address == first.token_address && asset.token_id == first.token_id
            });
            if same_type {
                Ok(())
            } else {
                Err(SwapError::MultipleAssetsUnsupported)
            }
        }
    }
}
