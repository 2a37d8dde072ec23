//! Components and resources used by the world module.
use std::collections::BTreeSet;

use bevy::prelude::*;

use crate::dialogue::roster::CharacterId;

/// Marker component for the main 2D camera.
#[derive(Component, Default)]
pub struct WorldCamera;

/// Ordered character pair, used as a symmetric proximity key.
pub fn ordered_pair(a: CharacterId, b: CharacterId) -> (CharacterId, CharacterId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Pairs of characters currently within interaction range of each other.
/// The proximity sweep diffs against this each tick so enter and exit
/// events fire exactly once per crossing.
#[derive(Resource, Debug, Default)]
pub struct ProximityLedger {
    pairs: BTreeSet<(CharacterId, CharacterId)>,
}

impl ProximityLedger {
    pub fn contains(&self, a: CharacterId, b: CharacterId) -> bool {
        self.pairs.contains(&ordered_pair(a, b))
    }

    pub fn pairs(&self) -> &BTreeSet<(CharacterId, CharacterId)> {
        &self.pairs
    }

    /// Replaces the ledger with the freshly computed pair set, returning the
    /// pairs that appeared and the pairs that vanished.
    pub fn replace(
        &mut self,
        current: BTreeSet<(CharacterId, CharacterId)>,
    ) -> (
        Vec<(CharacterId, CharacterId)>,
        Vec<(CharacterId, CharacterId)>,
    ) {
        let entered = current.difference(&self.pairs).copied().collect();
        let exited = self.pairs.difference(&current).copied().collect();
        self.pairs = current;
        (entered, exited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_set(pairs: &[(u64, u64)]) -> BTreeSet<(CharacterId, CharacterId)> {
        pairs
            .iter()
            .map(|(a, b)| ordered_pair(CharacterId::new(*a), CharacterId::new(*b)))
            .collect()
    }

    #[test]
    fn pair_ordering_is_symmetric() {
        let a = CharacterId::new(3);
        let b = CharacterId::new(7);
        assert_eq!(ordered_pair(a, b), ordered_pair(b, a));
    }

    #[test]
    fn replace_reports_only_the_diff() {
        let mut ledger = ProximityLedger::default();

        let (entered, exited) = ledger.replace(pair_set(&[(1, 2), (1, 3)]));
        assert_eq!(entered.len(), 2);
        assert!(exited.is_empty());

        // One pair stays, one leaves, one arrives.
        let (entered, exited) = ledger.replace(pair_set(&[(1, 2), (2, 3)]));
        assert_eq!(entered, pair_set(&[(2, 3)]).into_iter().collect::<Vec<_>>());
        assert_eq!(exited, pair_set(&[(1, 3)]).into_iter().collect::<Vec<_>>());
        assert!(ledger.contains(CharacterId::new(2), CharacterId::new(1)));
        assert!(!ledger.contains(CharacterId::new(1), CharacterId::new(3)));
    }
}
