//! Seeded random streams for reproducible sessions.
//!
//! A single user-visible seed is expanded into independent, domain-separated
//! streams so that condition assignment and selector draws never perturb one
//! another.
use hmac::{Hmac, Mac};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use sha2::Sha256;

/// Deterministic pair of RNG streams used by one expansion.
#[derive(Debug, Clone)]
pub struct RngBundle {
    condition: CountingRng<SmallRng>,
    selector: CountingRng<SmallRng>,
}

impl RngBundle {
    /// Construct the bundle from a user-visible seed.
    #[must_use]
    pub fn from_user_seed(seed: u64) -> Self {
        Self {
            condition: CountingRng::new(derive_stream_seed(seed, b"condition")),
            selector: CountingRng::new(derive_stream_seed(seed, b"selector")),
        }
    }

    /// Stream used to pick the parameter set.
    pub fn condition(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.condition
    }

    /// Stream used by `#RAND`, `#PERM` and `#UNIQ` selectors.
    pub fn selector(&mut self) -> &mut CountingRng<SmallRng> {
        &mut self.selector
    }

    /// Borrow both streams at once.
    pub fn split(&mut self) -> (&mut CountingRng<SmallRng>, &mut CountingRng<SmallRng>) {
        (&mut self.condition, &mut self.selector)
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<SmallRng> {
    fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            draws: 0,
        }
    }
}

impl<R: rand::RngCore> CountingRng<R> {
    /// Wrap an arbitrary generator.
    pub const fn wrap(rng: R) -> Self {
        Self { rng, draws: 0 }
    }

    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: rand::RngCore> rand::RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    // HMAC accepts keys of any length, so this branch is unreachable in practice.
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, RngCore};

    #[test]
    fn streams_are_seed_stable() {
        let mut one = RngBundle::from_user_seed(42);
        let mut two = RngBundle::from_user_seed(42);
        let a: u64 = one.condition().gen_range(0..u64::MAX);
        let b: u64 = two.condition().gen_range(0..u64::MAX);
        assert_eq!(a, b);
    }

    #[test]
    fn streams_are_domain_separated() {
        assert_ne!(
            derive_stream_seed(7, b"condition"),
            derive_stream_seed(7, b"selector")
        );
    }

    #[test]
    fn counting_rng_tracks_draws() {
        let mut bundle = RngBundle::from_user_seed(1);
        let (condition, selector) = bundle.split();
        let _ = condition.next_u32();
        let _ = condition.next_u64();
        assert_eq!(condition.draws(), 2);
        assert_eq!(selector.draws(), 0);
    }
}
