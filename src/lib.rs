use near_sdk::json_types::{U128, U64};
use near_sdk::{
    env, ext_contract, log, near, require, serde_json, AccountId, CryptoHash, FunctionError,
    PanicOnDefault, PromiseOrValue, PromiseResult,
};

mod access_control;
mod admin;
pub mod allow_list;
pub mod config;
pub mod error;
pub mod escrow;
pub mod events;
pub mod merkle;
pub mod migration;
pub mod offer;
mod offer_manager;
mod offer_manager_reverse;
pub mod replay;
pub mod verifier;
pub mod witness;

#[cfg(test)]
mod fixtures;

use access_control::AccessControl;
use allow_list::AllowList;
use escrow::{payout, EscrowEngine};
use migration::{ContractV1, STATE_VERSION};
use replay::ReplayGuard;
use verifier::WitnessVerifier;

pub use config::WitnessStage;
pub use error::{AssetField, SwapError};
pub use escrow::{Asset, FtTransferMsg};
pub use events::{AdminEvent, OfferEvent, ReverseOfferEvent};
pub use merkle::{compute_root, MerkleProof};
pub use offer::{Offer, OfferBook, OfferId, OfferV1, VersionedOffer};
pub use verifier::{HeaderSource, HeaderTip, VerifierConfig};
pub use witness::{leaf_hash, BlockHeader, RegisteredWitness, SettlementAsset, SignedWitness};

// Which offer book a settlement callback refers to
#[near(serializers = [json])]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Forward,
    Reverse,
}

// Value to hand back when a payout fails
#[near(serializers = [json])]
#[derive(Clone, Debug)]
pub struct Refund {
    pub receiver_id: AccountId,
    pub asset: Asset,
    pub amount: U128,
}

#[ext_contract(ext_self)]
pub trait SelfCallbacks {
    fn on_offer_settled(
        &mut self,
        side: Side,
        offer_id: U64,
        release_witness: bool,
        refund: Option<Refund>,
    );
    fn on_taker_payment_forwarded(
        &mut self,
        offer_id: U64,
        release_witness: bool,
        amount: U128,
    ) -> U128;
}

#[near(contract_state)]
#[derive(PanicOnDefault)]
pub struct Contract {
    pub access: AccessControl,
    // Forward offers: the maker is paid by the taker on activation
    pub forward: OfferBook,
    // Reverse offers: the taker deposits on registration, the maker claims
    pub reverse: OfferBook,
    pub allow_list: AllowList,
    pub verifier: WitnessVerifier,
    pub used_witnesses: ReplayGuard,
    pub escrow: EscrowEngine,
    pub witness_stage: WitnessStage,
}

#[near]
impl Contract {
    #[init]
    pub fn new(
        owner_id: AccountId,
        verifier: VerifierConfig,
        witness_stage: Option<WitnessStage>,
    ) -> Self {
        let verifier = WitnessVerifier::new(verifier, b"h").unwrap_or_else(|err| err.panic());
        migration::record_version(STATE_VERSION);

        Self {
            access: AccessControl::new(owner_id),
            forward: OfferBook::new(b"o"),
            reverse: OfferBook::new(b"r"),
            allow_list: AllowList::new(b"a"),
            verifier,
            used_witnesses: ReplayGuard::new(b"w"),
            escrow: EscrowEngine::new(b"c"),
            witness_stage: witness_stage.unwrap_or_default(),
        }
    }

    /// Lifts version 1 state to the current layout. Offer books keep their
    /// storage prefixes; their entries are upgraded lazily on write.
    #[private]
    #[init(ignore_state)]
    pub fn migrate(verifier: VerifierConfig, witness_stage: Option<WitnessStage>) -> Self {
        let from_version = migration::stored_version();
        require!(
            from_version < STATE_VERSION,
            SwapError::AlreadyMigrated.to_string()
        );

        let old: ContractV1 =
            env::state_read().unwrap_or_else(|| env::panic_str("No version 1 state to migrate"));
        let verifier = WitnessVerifier::new(verifier, b"h").unwrap_or_else(|err| err.panic());

        migration::record_version(STATE_VERSION);
        AdminEvent::StateMigrated {
            from_version,
            to_version: STATE_VERSION,
        }
        .emit();

        Self {
            access: AccessControl::new(old.owner_id),
            forward: old.forward,
            reverse: old.reverse,
            allow_list: AllowList::new(b"a"),
            verifier,
            used_witnesses: ReplayGuard::new(b"w"),
            escrow: EscrowEngine::new(b"c"),
            witness_stage: witness_stage.unwrap_or_default(),
        }
    }

    /// NEP-141 receiver.
    ///
    /// Fungible tokens never reach the contract through a plain call: the
    /// taker calls `ft_transfer_call` on the token and `msg` says what the
    /// tokens are for. Any error makes the token contract refund the sender.
    #[handle_result]
    pub fn ft_on_transfer(
        &mut self,
        sender_id: AccountId,
        amount: U128,
        msg: String,
    ) -> Result<PromiseOrValue<U128>, SwapError> {
        let token = Asset::Ft(env::predecessor_account_id());
        let msg: FtTransferMsg =
            serde_json::from_str(&msg).map_err(|err| SwapError::InvalidMessage(err.to_string()))?;

        match msg {
            FtTransferMsg::Activate { offer_id, witness } => {
                let promise =
                    self.activate_with_ft(sender_id, token, amount, offer_id.0, witness)?;
                Ok(PromiseOrValue::Promise(promise))
            }
            FtTransferMsg::ReverseRegister {
                taker_identity,
                taker_amount,
                maker,
                maker_asset_id,
                maker_amount,
            } => {
                self.open_reverse_offer(offer_manager_reverse::ReverseDeposit {
                    taker: sender_id,
                    taker_identity,
                    taker_token: token,
                    taker_amount,
                    paid: amount.0,
                    maker,
                    maker_asset_id,
                    maker_amount,
                })?;
                Ok(PromiseOrValue::Value(U128(0)))
            }
        }
    }

    // --- PRIVATE CALLBACKS ---
    #[private]
    pub fn on_offer_settled(
        &mut self,
        side: Side,
        offer_id: U64,
        release_witness: bool,
        refund: Option<Refund>,
    ) {
        let settled = matches!(env::promise_result(0), PromiseResult::Successful(_));
        self.finish_settlement(side, offer_id.0, release_witness, settled);

        if !settled {
            if let Some(refund) = refund {
                payout(
                    &refund.asset,
                    refund.receiver_id,
                    refund.amount.0,
                    "offer activation refund",
                );
            }
        }
    }

    /// Result of forwarding a taker's token payment to the maker. The value
    /// returned is what the token contract refunds to the taker.
    #[private]
    pub fn on_taker_payment_forwarded(
        &mut self,
        offer_id: U64,
        release_witness: bool,
        amount: U128,
    ) -> U128 {
        let settled = matches!(env::promise_result(0), PromiseResult::Successful(_));
        self.finish_settlement(Side::Forward, offer_id.0, release_witness, settled);

        if settled {
            U128(0)
        } else {
            amount
        }
    }
}

impl Contract {
    /// Commits or rolls back an activation once its payout receipt resolved.
    pub(crate) fn finish_settlement(
        &mut self,
        side: Side,
        offer_id: OfferId,
        release_witness: bool,
        settled: bool,
    ) {
        if settled {
            log!("OFFER_SETTLED: side={:?}, offer_id={}", side, offer_id);
            return;
        }

        let book = match side {
            Side::Forward => &mut self.forward,
            Side::Reverse => &mut self.reverse,
        };
        let Some(offer) = book.get(offer_id) else {
            return;
        };

        if release_witness {
            if let Some(fingerprint) = offer.witness_fingerprint {
                let fingerprint: CryptoHash = fingerprint.into();
                self.used_witnesses.release(&fingerprint);
            }
        }
        book.reopen(offer_id, release_witness);
        if side == Side::Reverse {
            self.escrow.lock(&offer.taker_token, offer.taker_amount.0);
        }

        log!(
            "OFFER_SETTLEMENT_FAILED: Reopened offer for side={:?}, offer_id={}",
            side,
            offer_id
        );
    }
}
