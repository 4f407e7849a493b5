use derive_more::Display;
use rand::{
    rngs::StdRng,
    Rng as _,
    SeedableRng as _,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Upper bound (exclusive) for generated local uids.
pub const LOCAL_UID_RANGE: u32 = 100;

/// Numeric identity the local participant publishes under.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalUid(pub u32);

/// Picks the local uid for every new join attempt.
pub trait IdentityStrategy: Send {
    fn next_uid(&mut self) -> LocalUid;
}

/// Draws from `[0, LOCAL_UID_RANGE)` with the thread rng.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentity;

impl IdentityStrategy for RandomIdentity {
    fn next_uid(&mut self) -> LocalUid {
        LocalUid(rand::thread_rng().gen_range(0..LOCAL_UID_RANGE))
    }
}

/// Same range as [`RandomIdentity`] but reproducible from a seed.
#[derive(Debug, Clone)]
pub struct SeededIdentity(StdRng);

impl SeededIdentity {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl IdentityStrategy for SeededIdentity {
    fn next_uid(&mut self) -> LocalUid {
        LocalUid(self.0.gen_range(0..LOCAL_UID_RANGE))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedIdentity(pub LocalUid);

impl IdentityStrategy for FixedIdentity {
    fn next_uid(&mut self) -> LocalUid {
        self.0
    }
}

/// Random unless a seed is given.
pub fn identity_from_seed(seed: Option<u64>) -> Box<dyn IdentityStrategy> {
    match seed {
        Some(seed) => Box::new(SeededIdentity::new(seed)),
        None => Box::new(RandomIdentity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_uids_stay_in_range() {
        let mut random = RandomIdentity;
        for _ in 0..500 {
            assert!(random.next_uid().0 < LOCAL_UID_RANGE);
        }
    }

    #[test]
    fn seeded_identity_is_reproducible() {
        let mut a = SeededIdentity::new(7);
        let mut b = SeededIdentity::new(7);
        let first: Vec<_> = (0..10).map(|_| a.next_uid()).collect();
        let second: Vec<_> = (0..10).map(|_| b.next_uid()).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|uid| uid.0 < LOCAL_UID_RANGE));
    }
}
