//! Transaction-root tree
//!
//! Leaves are already hashes. Adjacent nodes are combined pairwise,
//! `hash(left || right)`, level by level until one node remains.
//!
//! ## Odd node count
//!
//! Two rules exist in the wild for the trailing unpaired node of a level:
//! carry it up unchanged, or pair it with itself. The rule is a protocol
//! constant ([`TRANSACTION_ROOT_POLICY`]); both are implemented so the
//! disagreement shows up in tests rather than on the network.

use shared_types::Hash;

/// What happens to the last node of a level with an odd node count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddNodePolicy {
    /// The node moves to the next level unchanged.
    CarryUp,
    /// The node is combined with itself.
    SelfPair,
}

/// Rule used for every body hash on this network.
pub const TRANSACTION_ROOT_POLICY: OddNodePolicy = OddNodePolicy::CarryUp;

/// Root over `leaves`. Empty input hashes to `hash([])`; a single leaf is
/// its own root.
pub fn merkle_root(leaves: &[Hash], policy: OddNodePolicy) -> Hash {
    if leaves.is_empty() {
        return Hash::digest(&[]);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match (pair[0], pair.get(1)) {
                (left, Some(right)) => Hash::combine(&left, right),
                (odd, None) => match policy {
                    OddNodePolicy::CarryUp => odd,
                    OddNodePolicy::SelfPair => Hash::combine(&odd, &odd),
                },
            })
            .collect();
    }
    level[0]
}
