use near_sdk::store::LookupSet;
use near_sdk::{near, CryptoHash, IntoStorageKey};

use crate::error::SwapError;

/// Fingerprints of every witness already consumed by either offer book.
#[near(serializers = [borsh])]
pub struct ReplayGuard {
    pub used: LookupSet<CryptoHash>,
}

impl ReplayGuard {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            used: LookupSet::new(prefix),
        }
    }

    pub fn is_used(&self, fingerprint: &CryptoHash) -> bool {
        self.used.contains(fingerprint)
    }

    pub fn consume(&mut self, fingerprint: CryptoHash) -> Result<(), SwapError> {
        if !self.used.insert(fingerprint) {
            return Err(SwapError::WitnessAlreadyUsed);
        }
        Ok(())
    }

    /// Only called when the payout that consumed `fingerprint` failed and the
    /// activation is being rolled back.
    pub fn release(&mut self, fingerprint: &CryptoHash) {
        self.used.remove(fingerprint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fingerprint_is_consumed_once() {
        let mut guard = ReplayGuard::new(b"w");
        assert!(!guard.is_used(&[1; 32]));

        guard.consume([1; 32]).unwrap();
        assert!(guard.is_used(&[1; 32]));
        assert_eq!(guard.consume([1; 32]), Err(SwapError::WitnessAlreadyUsed));

        guard.consume([2; 32]).unwrap();
    }

    #[test]
    fn release_reopens_a_rolled_back_fingerprint() {
        let mut guard = ReplayGuard::new(b"w");
        guard.consume([3; 32]).unwrap();
        guard.release(&[3; 32]);
        assert!(guard.consume([3; 32]).is_ok());
    }
}
