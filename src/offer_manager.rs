use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128, U64};
use near_sdk::{env, near, AccountId, Promise};

use crate::config::{WitnessStage, GAS_FOR_SETTLEMENT_CALLBACK};
use crate::error::SwapError;
use crate::escrow::{payout, require_exact_amount, Asset};
use crate::events::OfferEvent;
use crate::offer::{NewOffer, Offer, OfferId};
use crate::verifier::AssetMode;
use crate::witness::SettlementAsset;
use crate::{ext_self, Contract, ContractExt, Refund, Side};

// Forward protocol: the maker registers an offer for a settlement-ledger
// asset, the taker pays on the primary ledger and the payment is forwarded
// to the maker.
#[near]
impl Contract {
    /// Opens a forward offer and returns its id.
    ///
    /// Depending on the deployment's witness stage the maker either proves
    /// the settlement-ledger transfer to `taker_identity` right here or
    /// leaves it to the taker at activation.
    #[allow(clippy::too_many_arguments)]
    #[handle_result]
    pub fn register(
        &mut self,
        maker_identity: Base58CryptoHash,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
        taker: AccountId,
        taker_identity: Base58CryptoHash,
        taker_token: Asset,
        taker_amount: U128,
        witness: Option<Base64VecU8>,
    ) -> Result<U64, SwapError> {
        self.allow_list.assert_allowed(&taker_token)?;
        if taker_amount.0 == 0 {
            return Err(SwapError::ZeroAmount);
        }

        let witness_fingerprint: Option<Base58CryptoHash> = match (self.witness_stage, witness) {
            (WitnessStage::Register, Some(witness)) => {
                let claim = [settlement_claim(maker_asset_id, maker_amount)];
                let fingerprint = self.verifier.verify(
                    &claim,
                    &taker_identity,
                    &witness.0,
                    AssetMode::Single,
                    &mut self.used_witnesses,
                )?;
                Some(fingerprint.into())
            }
            (WitnessStage::Register, None) => return Err(SwapError::WitnessRequired),
            (WitnessStage::Activate, Some(_)) => {
                return Err(SwapError::UnexpectedWitness(WitnessStage::Activate.name()))
            }
            (WitnessStage::Activate, None) => None,
        };

        let offer = self.forward.open(NewOffer {
            maker: env::predecessor_account_id(),
            maker_identity,
            maker_asset_id,
            maker_amount,
            taker,
            taker_identity,
            taker_token,
            taker_amount,
            witness_fingerprint,
        });

        OfferEvent::OfferRegistered {
            offer_id: U64(offer.id),
            maker: offer.maker.clone(),
            maker_identity: offer.maker_identity,
            maker_asset_id: offer.maker_asset_id,
            maker_amount: offer.maker_amount,
            taker: offer.taker.clone(),
            taker_token: offer.taker_token.clone(),
            taker_amount: offer.taker_amount,
        }
        .emit();
        OfferEvent::OfferTakerUpdated {
            offer_id: U64(offer.id),
            taker_identity: offer.taker_identity,
        }
        .emit();

        Ok(U64(offer.id))
    }

    /// Kept so callers of the witness-less signature get a clear reason.
    #[allow(clippy::too_many_arguments, unused_variables)]
    #[handle_result]
    pub fn register_legacy(
        &mut self,
        maker_identity: Base58CryptoHash,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
        taker: AccountId,
        taker_identity: Base58CryptoHash,
        taker_token: Asset,
        taker_amount: U128,
    ) -> Result<U64, SwapError> {
        Err(SwapError::DeprecatedEntryPoint("register"))
    }

    #[handle_result]
    pub fn update_taker(
        &mut self,
        offer_id: U64,
        new_taker_identity: Base58CryptoHash,
    ) -> Result<(), SwapError> {
        let offer = self
            .forward
            .get(offer_id.0)
            .ok_or(SwapError::OfferNotFound(offer_id.0))?;
        if env::predecessor_account_id() != offer.maker {
            return Err(SwapError::NotMaker(offer.id));
        }
        if offer.activated {
            return Err(SwapError::AlreadyActivated(offer.id));
        }
        if self.witness_stage == WitnessStage::Register {
            return Err(SwapError::TakerBoundToWitness);
        }

        self.forward
            .update_taker_identity(offer.id, new_taker_identity)?;
        OfferEvent::OfferTakerUpdated {
            offer_id,
            taker_identity: new_taker_identity,
        }
        .emit();
        Ok(())
    }

    /// Taker pays a native-coin offer. The attached deposit must equal the
    /// offer's taker amount and is forwarded to the maker.
    #[payable]
    #[handle_result]
    pub fn activate(
        &mut self,
        offer_id: U64,
        witness: Option<Base64VecU8>,
    ) -> Result<Promise, SwapError> {
        let taker = env::predecessor_account_id();
        let paid = env::attached_deposit().as_yoctonear();
        let (offer, release_witness) =
            self.activate_forward(&taker, offer_id.0, &Asset::Native, paid, witness)?;

        Ok(payout(&Asset::Native, offer.maker.clone(), paid, "offer activation").then(
            ext_self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_SETTLEMENT_CALLBACK)
                .on_offer_settled(
                    Side::Forward,
                    offer_id,
                    release_witness,
                    Some(Refund {
                        receiver_id: taker,
                        asset: Asset::Native,
                        amount: U128(paid),
                    }),
                ),
        ))
    }

    // --- VIEWS ---

    pub fn next_offer_id(&self) -> U64 {
        U64(self.forward.next_offer_id)
    }

    pub fn get_offer(&self, offer_id: U64) -> Option<Offer> {
        self.forward.get(offer_id.0)
    }

    pub fn get_offers(&self, from_index: Option<U64>, limit: Option<u32>) -> Vec<Offer> {
        self.forward.list(from_index, limit)
    }
}

impl Contract {
    /// Fungible-token variant of `activate`, reached through `ft_on_transfer`.
    /// The tokens already sit with the contract; on success they are
    /// forwarded to the maker, otherwise the unused amount goes back.
    pub(crate) fn activate_with_ft(
        &mut self,
        taker: AccountId,
        token: Asset,
        amount: U128,
        offer_id: OfferId,
        witness: Option<Base64VecU8>,
    ) -> Result<Promise, SwapError> {
        let (offer, release_witness) =
            self.activate_forward(&taker, offer_id, &token, amount.0, witness)?;

        Ok(payout(&token, offer.maker.clone(), amount.0, "offer activation").then(
            ext_self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_SETTLEMENT_CALLBACK)
                .on_taker_payment_forwarded(U64(offer_id), release_witness, amount),
        ))
    }

    /// All checks of a forward activation followed by the terminal state
    /// change. Returns the activated offer and whether its witness was
    /// consumed by this call.
    fn activate_forward(
        &mut self,
        taker: &AccountId,
        offer_id: OfferId,
        paid_token: &Asset,
        paid: u128,
        witness: Option<Base64VecU8>,
    ) -> Result<(Offer, bool), SwapError> {
        let offer = self
            .forward
            .get(offer_id)
            .ok_or(SwapError::OfferNotFound(offer_id))?;
        if *taker != offer.taker {
            return Err(SwapError::NotTaker(offer_id));
        }
        if offer.activated {
            return Err(SwapError::AlreadyActivated(offer_id));
        }
        self.allow_list.assert_allowed(&offer.taker_token)?;
        if offer.taker_token != *paid_token {
            return Err(match paid_token {
                Asset::Native => SwapError::FtDepositRequired,
                Asset::Ft(_) => SwapError::TokenMismatch,
            });
        }
        require_exact_amount(offer.taker_amount, paid)?;

        let fingerprint: Option<Base58CryptoHash> = match (self.witness_stage, witness) {
            (WitnessStage::Activate, Some(witness)) => {
                let claim = [settlement_claim(offer.maker_asset_id, offer.maker_amount)];
                let fingerprint = self.verifier.verify(
                    &claim,
                    &offer.taker_identity,
                    &witness.0,
                    AssetMode::Single,
                    &mut self.used_witnesses,
                )?;
                Some(fingerprint.into())
            }
            (WitnessStage::Activate, None) => return Err(SwapError::WitnessRequired),
            (WitnessStage::Register, Some(_)) => {
                return Err(SwapError::UnexpectedWitness(WitnessStage::Register.name()))
            }
            (WitnessStage::Register, None) => None,
        };
        let release_witness = fingerprint.is_some();

        let offer = self
            .forward
            .mark_activated(offer_id, env::block_height(), fingerprint)?;
        OfferEvent::OfferActivated {
            offer_id: U64(offer.id),
            taker_identity: offer.taker_identity,
        }
        .emit();

        Ok((offer, release_witness))
    }
}

/// The single settlement-ledger asset an offer's maker side commits to.
pub(crate) fn settlement_claim(asset_id: Base58CryptoHash, amount: U128) -> SettlementAsset {
    SettlementAsset {
        token_address: asset_id,
        token_id: U128(0),
        amount,
    }
}
