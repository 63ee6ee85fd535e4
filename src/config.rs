use near_sdk::{near, Gas};

pub const GAS_FOR_FT_TRANSFER: Gas = Gas::from_tgas(10);
pub const GAS_FOR_SETTLEMENT_CALLBACK: Gas = Gas::from_tgas(15);

/// Which call of the forward protocol carries the witness. Fixed for the
/// lifetime of a deployment.
#[near(serializers = [json, borsh])]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WitnessStage {
    /// The maker proves the settlement-ledger transfer when registering.
    Register,
    /// The taker proves it when activating.
    #[default]
    Activate,
}

impl WitnessStage {
    pub fn name(&self) -> &'static str {
        match self {
            WitnessStage::Register => "registration",
            WitnessStage::Activate => "activation",
        }
    }
}
