use near_sdk::{env, near, CryptoHash};

/// Inclusion proof of one leaf in a binary merkle tree.
#[near(serializers = [borsh])]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleProof {
    pub index: u64,
    pub value: CryptoHash,
    pub siblings: Vec<CryptoHash>,
}

pub fn hash_pair(left: &CryptoHash, right: &CryptoHash) -> CryptoHash {
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(left);
    buffer[32..].copy_from_slice(right);
    env::sha256_array(&buffer)
}

/// Folds `leaf` up the tree. The low bit of the running index says whether
/// the current node is a left (0) or right (1) child.
///
/// Returns `None` when the index does not fit in the proof depth.
pub fn compute_root(leaf: &CryptoHash, index: u64, siblings: &[CryptoHash]) -> Option<CryptoHash> {
    if siblings.len() < 64 && index >> siblings.len() != 0 {
        return None;
    }

    let mut node = *leaf;
    let mut index = index;
    for sibling in siblings {
        node = if index & 1 == 0 {
            hash_pair(&node, sibling)
        } else {
            hash_pair(sibling, &node)
        };
        index >>= 1;
    }
    Some(node)
}

impl MerkleProof {
    pub fn verify(&self, root: &CryptoHash) -> bool {
        compute_root(&self.value, self.index, &self.siblings).as_ref() == Some(root)
    }
}
