use near_sdk::json_types::{Base58CryptoHash, Base64VecU8, U128, U64};
use near_sdk::{env, near, AccountId, Promise};

use crate::config::GAS_FOR_SETTLEMENT_CALLBACK;
use crate::error::SwapError;
use crate::escrow::{payout, require_exact_amount, Asset};
use crate::events::ReverseOfferEvent;
use crate::offer::{NewOffer, Offer};
use crate::offer_manager::settlement_claim;
use crate::verifier::AssetMode;
use crate::{ext_self, Contract, ContractExt, Side};

/// A taker deposit that opens a reverse offer, from either funding path.
pub(crate) struct ReverseDeposit {
    pub taker: AccountId,
    pub taker_identity: Base58CryptoHash,
    pub taker_token: Asset,
    pub taker_amount: U128,
    pub paid: u128,
    pub maker: AccountId,
    pub maker_asset_id: Base58CryptoHash,
    pub maker_amount: U128,
}

// Reverse protocol: the taker escrows first, the maker claims the escrow by
// proving the settlement-ledger transfer.
#[near]
impl Contract {
    /// Opens a reverse offer funded with the attached native deposit.
    /// Fungible tokens use `ft_transfer_call` with a `reverse_register` message.
    #[payable]
    #[handle_result]
    pub fn reverse_register(
        &mut self,
        taker_identity: Base58CryptoHash,
        taker_token: Asset,
        taker_amount: U128,
        maker: AccountId,
        maker_asset_id: Base58CryptoHash,
        maker_amount: U128,
    ) -> Result<U64, SwapError> {
        self.allow_list.assert_allowed(&taker_token)?;
        if taker_token != Asset::Native {
            return Err(SwapError::FtDepositRequired);
        }

        let offer = self.open_reverse_offer(ReverseDeposit {
            taker: env::predecessor_account_id(),
            taker_identity,
            taker_token,
            taker_amount,
            paid: env::attached_deposit().as_yoctonear(),
            maker,
            maker_asset_id,
            maker_amount,
        })?;
        Ok(U64(offer.id))
    }

    /// Maker claims the escrowed deposit with a witness of the transfer of
    /// `maker_amount` of `maker_asset_id` to the taker's settlement identity.
    #[handle_result]
    pub fn reverse_activate(
        &mut self,
        offer_id: U64,
        witness: Base64VecU8,
    ) -> Result<Promise, SwapError> {
        let offer = self
            .reverse
            .get(offer_id.0)
            .ok_or(SwapError::OfferNotFound(offer_id.0))?;
        if env::predecessor_account_id() != offer.maker {
            return Err(SwapError::NotMaker(offer.id));
        }
        if offer.activated {
            return Err(SwapError::AlreadyActivated(offer.id));
        }
        self.allow_list.assert_allowed(&offer.taker_token)?;

        let claim = [settlement_claim(offer.maker_asset_id, offer.maker_amount)];
        let fingerprint = self.verifier.verify(
            &claim,
            &offer.taker_identity,
            &witness.0,
            AssetMode::Single,
            &mut self.used_witnesses,
        )?;

        let offer =
            self.reverse
                .mark_activated(offer.id, env::block_height(), Some(fingerprint.into()))?;
        self.escrow
            .unlock(&offer.taker_token, offer.taker_amount.0)?;
        ReverseOfferEvent::OfferActivated {
            offer_id,
            taker_identity: offer.taker_identity,
        }
        .emit();

        Ok(payout(
            &offer.taker_token,
            offer.maker.clone(),
            offer.taker_amount.0,
            "reverse offer activation",
        )
        .then(
            ext_self::ext(env::current_account_id())
                .with_static_gas(GAS_FOR_SETTLEMENT_CALLBACK)
                .on_offer_settled(Side::Reverse, offer_id, true, None),
        ))
    }

    /// Kept so callers of the witness-less signature get a clear reason.
    #[allow(unused_variables)]
    #[handle_result]
    pub fn reverse_activate_legacy(&mut self, offer_id: U64) -> Result<(), SwapError> {
        Err(SwapError::DeprecatedEntryPoint("reverse_activate"))
    }

    // --- VIEWS ---

    pub fn reverse_next_offer_id(&self) -> U64 {
        U64(self.reverse.next_offer_id)
    }

    pub fn get_reverse_offer(&self, offer_id: U64) -> Option<Offer> {
        self.reverse.get(offer_id.0)
    }

    pub fn get_reverse_offers(&self, from_index: Option<U64>, limit: Option<u32>) -> Vec<Offer> {
        self.reverse.list(from_index, limit)
    }
}

impl Contract {
    pub(crate) fn open_reverse_offer(&mut self, deposit: ReverseDeposit) -> Result<Offer, SwapError> {
        self.allow_list.assert_allowed(&deposit.taker_token)?;
        if deposit.taker_amount.0 == 0 {
            return Err(SwapError::ZeroAmount);
        }
        require_exact_amount(deposit.taker_amount, deposit.paid)?;

        self.escrow.lock(&deposit.taker_token, deposit.paid);
        let offer = self.reverse.open(NewOffer {
            maker: deposit.maker,
            // The maker's own settlement identity plays no part in this direction.
            maker_identity: [0u8; 32].into(),
            maker_asset_id: deposit.maker_asset_id,
            maker_amount: deposit.maker_amount,
            taker: deposit.taker,
            taker_identity: deposit.taker_identity,
            taker_token: deposit.taker_token,
            taker_amount: deposit.taker_amount,
            witness_fingerprint: None,
        });

        ReverseOfferEvent::OfferRegistered {
            offer_id: U64(offer.id),
            taker: offer.taker.clone(),
            taker_identity: offer.taker_identity,
            taker_token: offer.taker_token.clone(),
            taker_amount: offer.taker_amount,
            maker: offer.maker.clone(),
            maker_asset_id: offer.maker_asset_id,
            maker_amount: offer.maker_amount,
        }
        .emit();

        Ok(offer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WitnessStage;
    use crate::fixtures::*;
    use crate::verifier::HeaderSource;
    use near_sdk::borsh;
    use near_sdk::serde_json::json;
    use near_sdk::test_utils::get_logs;
    use near_sdk::PromiseOrValue;

    fn register_native(contract: &mut Contract, deposit: u128) -> Result<U64, SwapError> {
        set_caller(taker(), deposit);
        contract.reverse_register(
            digest(TAKER_IDENTITY),
            Asset::Native,
            U128(TAKER_AMOUNT),
            maker(),
            digest(MAKER_ASSET),
            U128(MAKER_AMOUNT),
        )
    }

    fn deposit_msg(amount: u128) -> String {
        json!({
            "reverse_register": {
                "taker_identity": digest(TAKER_IDENTITY),
                "taker_amount": U128(amount),
                "maker": maker(),
                "maker_asset_id": digest(MAKER_ASSET),
                "maker_amount": U128(MAKER_AMOUNT),
            }
        })
        .to_string()
    }

    fn claim(contract: &mut Contract, caller: AccountId, offer_id: u64) -> Result<Promise, SwapError> {
        set_caller(caller, 0);
        contract.reverse_activate(U64(offer_id), taker_witness().into())
    }

    #[test]
    fn native_deposit_is_escrowed_and_released_to_the_maker() {
        let mut contract = setup(WitnessStage::Activate);
        assert_eq!(
            register_native(&mut contract, TAKER_AMOUNT + 1),
            Err(SwapError::PaymentMismatch {
                expected: TAKER_AMOUNT,
                actual: TAKER_AMOUNT + 1
            })
        );

        let offer_id = register_native(&mut contract, TAKER_AMOUNT).unwrap();
        assert!(emitted("offer_registered"));
        assert_eq!(contract.reverse_next_offer_id(), U64(1));
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(TAKER_AMOUNT));
        // The forward book keeps its own sequence.
        assert_eq!(contract.next_offer_id(), U64(0));

        assert_eq!(
            expect_err(claim(&mut contract, taker(), 0)),
            SwapError::NotMaker(0)
        );
        claim(&mut contract, maker(), 0).unwrap();
        assert_eq!(
            payouts(),
            vec![Payout::Native {
                receiver_id: maker(),
                amount: TAKER_AMOUNT
            }]
        );
        assert!(emitted("offer_activated"));
        let identity = format!("\"taker_identity\":\"{}\"", digest(TAKER_IDENTITY));
        assert!(get_logs()
            .iter()
            .any(|log| log.contains("offer_activated") && log.contains(&identity)));

        let offer = contract.get_reverse_offer(offer_id).unwrap();
        assert!(offer.activated);
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(0));
        assert_eq!(
            expect_err(claim(&mut contract, maker(), 0)),
            SwapError::AlreadyActivated(0)
        );
    }

    #[test]
    fn tokens_are_deposited_through_transfer_call() {
        let mut contract = setup(WitnessStage::Activate);
        let token = Asset::Ft(ft_token());

        set_caller(taker(), 0);
        assert_eq!(
            contract.reverse_register(
                digest(TAKER_IDENTITY),
                token.clone(),
                U128(TAKER_AMOUNT),
                maker(),
                digest(MAKER_ASSET),
                U128(MAKER_AMOUNT),
            ),
            Err(SwapError::FtDepositRequired)
        );

        set_caller(owner(), 0);
        contract
            .remove_token_address_from_allow_list(vec![token.clone()])
            .unwrap();
        set_caller(ft_token(), 0);
        assert!(matches!(
            contract.ft_on_transfer(taker(), U128(TAKER_AMOUNT), deposit_msg(TAKER_AMOUNT)),
            Err(SwapError::TokenNotAllowed)
        ));

        set_caller(owner(), 0);
        contract
            .add_token_address_to_allow_list(vec![token.clone()])
            .unwrap();
        set_caller(ft_token(), 0);
        assert!(matches!(
            contract.ft_on_transfer(taker(), U128(TAKER_AMOUNT), deposit_msg(TAKER_AMOUNT - 1)),
            Err(SwapError::PaymentMismatch { .. })
        ));
        let unused = contract
            .ft_on_transfer(taker(), U128(TAKER_AMOUNT), deposit_msg(TAKER_AMOUNT))
            .unwrap();
        assert!(matches!(unused, PromiseOrValue::Value(U128(0))));
        assert_eq!(contract.escrowed_balance(token.clone()), U128(TAKER_AMOUNT));

        let offer = contract.get_reverse_offer(U64(0)).unwrap();
        assert_eq!(offer.taker, taker());
        assert_eq!(offer.taker_token, token);

        claim(&mut contract, maker(), 0).unwrap();
        assert_eq!(
            payouts(),
            vec![Payout::FtTransfer {
                token: ft_token(),
                args: json!({
                    "receiver_id": maker(),
                    "amount": U128(TAKER_AMOUNT),
                    "memo": "reverse offer activation",
                }),
                deposit: 1,
            }]
        );
        assert_eq!(contract.escrowed_balance(token), U128(0));
    }

    #[test]
    fn witnesses_are_shared_with_the_forward_book() {
        let mut contract = setup(WitnessStage::Activate);
        register_offer(&mut contract, Asset::Native, None).unwrap();
        set_caller(taker(), TAKER_AMOUNT);
        contract
            .activate(U64(0), Some(taker_witness().into()))
            .unwrap();

        register_native(&mut contract, TAKER_AMOUNT).unwrap();
        assert_eq!(
            expect_err(claim(&mut contract, maker(), 0)),
            SwapError::WitnessAlreadyUsed
        );
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(TAKER_AMOUNT));
        assert!(!contract.get_reverse_offer(U64(0)).unwrap().activated);
    }

    #[test]
    fn a_transfer_claims_once_across_header_sources() {
        let mut contract = setup(WitnessStage::Activate);
        register_native(&mut contract, TAKER_AMOUNT).unwrap();
        register_native(&mut contract, TAKER_AMOUNT).unwrap();
        claim(&mut contract, maker(), 0).unwrap();
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(TAKER_AMOUNT));

        // The same transfer, now presented against a registered header.
        let transfer = Transfer::new(vec![settlement_asset(MAKER_AMOUNT)], TAKER_IDENTITY);
        let header = transfer.header();
        set_caller(owner(), 0);
        contract
            .change_verifier(verifier_config(HeaderSource::Registered))
            .unwrap();
        contract
            .register_header(
                borsh::to_vec(&header).unwrap().into(),
                sign(&aggregator(), &header).into(),
            )
            .unwrap();

        let registered = transfer.registered().to_bytes();
        assert!(contract.is_witness_used(registered.clone().into()));
        set_caller(maker(), 0);
        assert_eq!(
            expect_err(contract.reverse_activate(U64(1), registered.into())),
            SwapError::WitnessAlreadyUsed
        );
        assert!(payouts().is_empty());
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(TAKER_AMOUNT));
        assert!(!contract.get_reverse_offer(U64(1)).unwrap().activated);
    }

    #[test]
    fn delisted_token_is_not_released() {
        let mut contract = setup(WitnessStage::Activate);
        register_native(&mut contract, TAKER_AMOUNT).unwrap();

        set_caller(owner(), 0);
        contract
            .remove_token_address_from_allow_list(vec![Asset::Native])
            .unwrap();
        assert_eq!(
            expect_err(claim(&mut contract, maker(), 0)),
            SwapError::TokenNotAllowed
        );
        assert!(payouts().is_empty());
        assert!(!contract.is_witness_used(taker_witness().into()));
        assert_eq!(contract.escrowed_balance(Asset::Native), U128(TAKER_AMOUNT));

        set_caller(owner(), 0);
        contract
            .add_token_address_to_allow_list(vec![Asset::Native])
            .unwrap();
        claim(&mut contract, maker(), 0).unwrap();
        assert!(contract.get_reverse_offer(U64(0)).unwrap().activated);
    }

    #[test]
    fn legacy_activation_always_fails() {
        let mut contract = setup(WitnessStage::Activate);
        register_native(&mut contract, TAKER_AMOUNT).unwrap();
        set_caller(maker(), 0);
        assert_eq!(
            contract.reverse_activate_legacy(U64(0)),
            Err(SwapError::DeprecatedEntryPoint("reverse_activate"))
        );
        assert_eq!(contract.get_reverse_offers(None, None).len(), 1);
    }
}
