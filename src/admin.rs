use near_sdk::borsh;
use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128};
use near_sdk::{near, AccountId, CryptoHash};

use crate::config::WitnessStage;
use crate::error::SwapError;
use crate::escrow::Asset;
use crate::events::AdminEvent;
use crate::migration;
use crate::verifier::{AssetMode, HeaderTip, VerifierConfig};
use crate::witness::{BlockHeader, SettlementAsset, Witness};
use crate::{Contract, ContractExt};

#[near]
impl Contract {
    #[handle_result]
    pub fn add_token_address_to_allow_list(&mut self, tokens: Vec<Asset>) -> Result<(), SwapError> {
        self.update_allow_list(tokens, true)
    }

    #[handle_result]
    pub fn remove_token_address_from_allow_list(
        &mut self,
        tokens: Vec<Asset>,
    ) -> Result<(), SwapError> {
        self.update_allow_list(tokens, false)
    }

    /// Swaps the aggregator key and the header source. Registered headers are
    /// kept; they stay valid for witnesses that reference them.
    #[handle_result]
    pub fn change_verifier(&mut self, config: VerifierConfig) -> Result<(), SwapError> {
        self.access.assert_owner()?;
        let header_source = config.header_source.clone();
        self.verifier.change_config(config)?;
        AdminEvent::VerifierChanged { header_source }.emit();
        Ok(())
    }

    #[handle_result]
    pub fn transfer_ownership(&mut self, new_owner: AccountId) -> Result<(), SwapError> {
        let previous_owner = self.access.transfer(new_owner.clone())?;
        AdminEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        }
        .emit();
        Ok(())
    }

    /// Open to anyone: the aggregator signature and chaining are what make a
    /// header acceptable.
    #[handle_result]
    pub fn register_header(
        &mut self,
        header: Base64VecU8,
        signature: Base64VecU8,
    ) -> Result<Base58CryptoHash, SwapError> {
        let header: BlockHeader = borsh::from_slice(&header.0)
            .map_err(|err| SwapError::MalformedHeader(err.to_string()))?;
        let block_hash = self.verifier.register_header(&header, &signature.0)?;

        AdminEvent::HeaderRegistered {
            block_number: header.block_number,
            block_hash: block_hash.into(),
        }
        .emit();
        Ok(block_hash.into())
    }

    // --- VIEWS ---

    pub fn owner(&self) -> AccountId {
        self.access.owner_id.clone()
    }

    pub fn is_token_allowed(&self, token: Asset) -> bool {
        self.allow_list.contains(&token)
    }

    pub fn get_token_allow_list(&self) -> Vec<Asset> {
        self.allow_list.list()
    }

    pub fn get_verifier_config(&self) -> VerifierConfig {
        self.verifier.config.clone()
    }

    pub fn get_header_tip(&self) -> Option<HeaderTip> {
        self.verifier.tip.clone()
    }

    pub fn is_header_registered(&self, block_hash: Base58CryptoHash) -> bool {
        let block_hash: CryptoHash = block_hash.into();
        self.verifier.is_header_registered(&block_hash)
    }

    /// Bytes that decode under neither layout were never consumed.
    pub fn is_witness_used(&self, witness: Base64VecU8) -> bool {
        Witness::fingerprint_of(&witness.0)
            .map_or(false, |fingerprint| self.used_witnesses.is_used(&fingerprint))
    }

    pub fn escrowed_balance(&self, token: Asset) -> U128 {
        self.escrow.balance(&token)
    }

    pub fn get_escrowed_balances(&self) -> Vec<(Asset, U128)> {
        self.escrow.list()
    }

    pub fn state_version(&self) -> u32 {
        migration::stored_version()
    }

    pub fn witness_stage(&self) -> WitnessStage {
        self.witness_stage
    }

    /// Dry run of witness verification for a list of assets of one type.
    /// A witness that was already consumed fails like it would on activation.
    #[handle_result]
    pub fn verify_assets(
        &self,
        assets: Vec<SettlementAsset>,
        recipient: Base58CryptoHash,
        witness: Base64VecU8,
    ) -> Result<bool, SwapError> {
        let witness = self
            .verifier
            .check(&assets, &recipient, &witness.0, AssetMode::List)?;
        if self.used_witnesses.is_used(&witness.fingerprint) {
            return Err(SwapError::WitnessAlreadyUsed);
        }
        Ok(true)
    }
}

impl Contract {
    fn update_allow_list(&mut self, tokens: Vec<Asset>, is_allowed: bool) -> Result<(), SwapError> {
        self.access.assert_owner()?;
        self.allow_list.set(&tokens, is_allowed);
        for token in tokens {
            AdminEvent::TokenAllowListUpdated { token, is_allowed }.emit();
        }
        Ok(())
    }
}
