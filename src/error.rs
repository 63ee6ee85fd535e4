use near_sdk::FunctionError;
use thiserror::Error;

/// Field of a settlement asset that differed between the caller's claim and
/// the witness.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AssetField {
    #[error("length")]
    Length,
    #[error("tokenAddress")]
    TokenAddress,
    #[error("tokenId")]
    TokenId,
    #[error("amount")]
    Amount,
}

/// Every reason an operation can abort. The rendered message is what callers
/// see in the failed receipt, so the wording is part of the interface.
#[derive(Debug, Error, FunctionError, PartialEq, Eq)]
pub enum SwapError {
    // --- Access control ---
    #[error("caller is not the owner")]
    NotOwner,
    #[error("caller is not the maker of offer {0}")]
    NotMaker(u64),
    #[error("caller is not the taker of offer {0}")]
    NotTaker(u64),

    // --- State ---
    #[error("offer {0} does not exist")]
    OfferNotFound(u64),
    #[error("offer {0} is already activated")]
    AlreadyActivated(u64),
    #[error("given witness already used")]
    WitnessAlreadyUsed,
    #[error("state is already migrated")]
    AlreadyMigrated,

    // --- Allow list ---
    #[error("the taker's token is not in the token allow list")]
    TokenNotAllowed,

    // --- Payment ---
    #[error("amount {actual} does not equal the required amount {expected}")]
    PaymentMismatch { expected: u128, actual: u128 },
    #[error("taker amount must be positive")]
    ZeroAmount,
    #[error("fungible tokens are deposited through ft_transfer_call")]
    FtDepositRequired,
    #[error("transferred token does not match the offer's token")]
    TokenMismatch,
    #[error("custody ledger holds less than {0}")]
    CustodyUnderflow(u128),

    // --- Witness structure / content ---
    #[error("malformed witness: {0}")]
    MalformedWitness(String),
    #[error("fail to verify aggregator's signature")]
    InvalidSignature,
    #[error("fail to verify merkle inclusion proof")]
    InvalidInclusionProof,
    #[error("not same recipient")]
    RecipientMismatch,
    #[error("not same asset: {0}")]
    AssetMismatch(AssetField),
    #[error("only one asset can be claimed with this witness")]
    MultipleAssetsUnsupported,
    #[error("malformed block header: {0}")]
    MalformedHeader(String),
    #[error("block header {0} is not registered")]
    HeaderNotRegistered(String),
    #[error("block header does not extend the registered chain")]
    HeaderNotChained,
    #[error("aggregator key must be an ed25519 key")]
    UnsupportedAggregatorKey,

    // --- Protocol variant ---
    #[error("witness is required by this entry point")]
    WitnessRequired,
    #[error("witness is supplied at {0}")]
    UnexpectedWitness(&'static str),
    #[error("taker identity is bound to the witness consumed at registration")]
    TakerBoundToWitness,
    #[error("invalid ft_on_transfer message: {0}")]
    InvalidMessage(String),

    // --- Deprecated entry points ---
    #[error("deprecated entry point, use `{0}` with a witness")]
    DeprecatedEntryPoint(&'static str),
}
