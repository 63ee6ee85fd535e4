use near_sdk::json_types::{Base58CryptoHash, U128, U64};
use near_sdk::store::IterableMap;
use near_sdk::{near, AccountId, BlockHeight, IntoStorageKey};

use crate::error::SwapError;
use crate::escrow::Asset;

// Sequential offer identifier, never reused.
pub type OfferId = u64;

/// Offer layout written by state version 1.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct OfferV1 {
    pub id: OfferId,
    pub maker: AccountId,
    pub maker_identity: Base58CryptoHash, // settlement-ledger recipient of the maker
    pub maker_asset_id: Base58CryptoHash, // settlement-ledger token being claimed
    pub maker_amount: U128,
    pub taker: AccountId,
    pub taker_identity: Base58CryptoHash, // settlement-ledger counterpart of the taker
    pub taker_token: Asset,
    pub taker_amount: U128,
    pub activated: bool,
}

/// One maker/taker pairing plus the custody it refers to.
///
/// Fields up to `activated` keep the version 1 order; later versions only
/// append.
#[near(serializers = [json, borsh])]
#[derive(Clone, Debug, PartialEq)]
pub struct Offer {
    pub id: OfferId,
    pub maker: AccountId,
    pub maker_identity: Base58CryptoHash,
    pub maker_asset_id: Base58CryptoHash,
    pub maker_amount: U128,
    pub taker: AccountId,
    pub taker_identity: Base58CryptoHash,
    pub taker_token: Asset,
    pub taker_amount: U128,
    pub activated: bool,

    // Appended in version 2
    pub activated_at: Option<BlockHeight>,
    pub witness_fingerprint: Option<Base58CryptoHash>,
}

impl From<OfferV1> for Offer {
    fn from(v1: OfferV1) -> Self {
        Self {
            id: v1.id,
            maker: v1.maker,
            maker_identity: v1.maker_identity,
            maker_asset_id: v1.maker_asset_id,
            maker_amount: v1.maker_amount,
            taker: v1.taker,
            taker_identity: v1.taker_identity,
            taker_token: v1.taker_token,
            taker_amount: v1.taker_amount,
            activated: v1.activated,
            activated_at: None,
            witness_fingerprint: None,
        }
    }
}

#[near(serializers = [borsh])]
#[derive(Clone, Debug)]
pub enum VersionedOffer {
    V1(OfferV1),
    V2(Offer),
}

impl VersionedOffer {
    pub fn into_current(self) -> Offer {
        match self {
            VersionedOffer::V1(offer) => offer.into(),
            VersionedOffer::V2(offer) => offer,
        }
    }
}

impl From<Offer> for VersionedOffer {
    fn from(offer: Offer) -> Self {
        VersionedOffer::V2(offer)
    }
}

/// Everything needed to open a new offer; the book assigns the id.
pub struct NewOffer {
    pub maker: AccountId,
    pub maker_identity: Base58CryptoHash,
    pub maker_asset_id: Base58CryptoHash,
    pub maker_amount: U128,
    pub taker: AccountId,
    pub taker_identity: Base58CryptoHash,
    pub taker_token: Asset,
    pub taker_amount: U128,
    pub witness_fingerprint: Option<Base58CryptoHash>,
}

/// Offers of one protocol direction, keyed by sequential id.
#[near(serializers = [borsh])]
pub struct OfferBook {
    pub offers: IterableMap<OfferId, VersionedOffer>,
    pub next_offer_id: OfferId,
}

impl OfferBook {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            offers: IterableMap::new(prefix),
            next_offer_id: 0,
        }
    }

    pub fn open(&mut self, new: NewOffer) -> Offer {
        let id = self.next_offer_id;
        self.next_offer_id += 1;

        let offer = Offer {
            id,
            maker: new.maker,
            maker_identity: new.maker_identity,
            maker_asset_id: new.maker_asset_id,
            maker_amount: new.maker_amount,
            taker: new.taker,
            taker_identity: new.taker_identity,
            taker_token: new.taker_token,
            taker_amount: new.taker_amount,
            activated: false,
            activated_at: None,
            witness_fingerprint: new.witness_fingerprint,
        };
        self.offers.insert(id, offer.clone().into());
        offer
    }

    pub fn get(&self, id: OfferId) -> Option<Offer> {
        self.offers.get(&id).cloned().map(VersionedOffer::into_current)
    }

    pub fn get_open(&self, id: OfferId) -> Result<Offer, SwapError> {
        let offer = self.get(id).ok_or(SwapError::OfferNotFound(id))?;
        if offer.activated {
            return Err(SwapError::AlreadyActivated(id));
        }
        Ok(offer)
    }

    pub fn update_taker_identity(
        &mut self,
        id: OfferId,
        taker_identity: Base58CryptoHash,
    ) -> Result<(), SwapError> {
        let mut offer = self.get_open(id)?;
        offer.taker_identity = taker_identity;
        self.offers.insert(id, offer.into());
        Ok(())
    }

    /// Terminal transition. Fails if the flag is already set, so two
    /// activations of the same offer can never both pass.
    pub fn mark_activated(
        &mut self,
        id: OfferId,
        at: BlockHeight,
        witness_fingerprint: Option<Base58CryptoHash>,
    ) -> Result<Offer, SwapError> {
        let mut offer = self.get_open(id)?;
        offer.activated = true;
        offer.activated_at = Some(at);
        if witness_fingerprint.is_some() {
            offer.witness_fingerprint = witness_fingerprint;
        }
        self.offers.insert(id, offer.clone().into());
        Ok(offer)
    }

    /// Undoes `mark_activated` after the payout receipt failed.
    pub fn reopen(&mut self, id: OfferId, clear_fingerprint: bool) -> Option<Offer> {
        let mut offer = self.get(id)?;
        offer.activated = false;
        offer.activated_at = None;
        if clear_fingerprint {
            offer.witness_fingerprint = None;
        }
        self.offers.insert(id, offer.clone().into());
        Some(offer)
    }

    pub fn list(&self, from_index: Option<U64>, limit: Option<u32>) -> Vec<Offer> {
        let from = from_index.map(u64::from).unwrap_or(0);
        (from..self.next_offer_id)
            .take(limit.unwrap_or(50) as usize)
            .filter_map(|id| self.get(id))
            .collect()
    }
}
