use bitcoin::Txid;
use std::collections::{BTreeSet, HashMap};

/// Unconfirmed transactions contending for each name.
///
/// Memory only, rebuilt as transactions are observed.
#[derive(Debug, Default)]
pub struct PendingClaims {
    claims: HashMap<Vec<u8>, BTreeSet<Txid>>,
}

impl PendingClaims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `txid` as contending for `name`.
    pub fn observe(&mut self, name: &[u8], txid: Txid) {
        self.claims.entry(name.to_vec()).or_default().insert(txid);
    }

    /// Removes `txid` from the contenders of `name`, returns whether it was pending.
    pub fn settle(&mut self, name: &[u8], txid: &Txid) -> bool {
        let Some(contenders) = self.claims.get_mut(name) else {
            return false;
        };

        let removed = contenders.remove(txid);
        if contenders.is_empty() {
            self.claims.remove(name);
        }
        removed
    }

    pub fn contenders(&self, name: &[u8]) -> impl Iterator<Item = &Txid> {
        self.claims.get(name).into_iter().flatten()
    }

    pub fn is_contended(&self, name: &[u8]) -> bool {
        self.claims.contains_key(name)
    }

    /// Number of names with at least one pending contender.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn clear(&mut self) {
        self.claims.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::hashes::Hash;

    #[test]
    fn test_observe_and_settle() {
        let a = Txid::from_byte_array([1; 32]);
        let b = Txid::from_byte_array([2; 32]);

        let mut pending = PendingClaims::new();
        pending.observe(b"name", a);
        pending.observe(b"name", b);
        pending.observe(b"name", b);

        assert!(pending.is_contended(b"name"));
        assert_eq!(pending.contenders(b"name").count(), 2);

        assert!(pending.settle(b"name", &a));
        assert!(!pending.settle(b"name", &a));
        assert!(!pending.settle(b"other", &a));
        assert_eq!(pending.contenders(b"name").collect::<Vec<_>>(), vec![&b]);

        assert!(pending.settle(b"name", &b));
        assert!(!pending.is_contended(b"name"));
        assert!(pending.is_empty());
    }
}
