//! Fixed pool of client addresses shared by producers
//!
//! Producers pick client IPs from a small pool so the same few clients show
//! up repeatedly, which makes generated traffic easier to query. The pool is
//! built once from an injected random source and passed to producers.

use rand::seq::SliceRandom;
use rand::Rng;
use std::net::Ipv4Addr;

pub const DEFAULT_POOL_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpPool {
    addresses: Vec<Ipv4Addr>,
}

impl IpPool {
    /// Draw `size` random addresses (at least one)
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, size: usize) -> Self {
        let addresses = (0..size.max(1))
            .map(|_| Ipv4Addr::from(rng.gen::<u32>()))
            .collect();
        Self { addresses }
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Ipv4Addr {
        // Never empty, see `generate`
        self.addresses
            .choose(rng)
            .copied()
            .unwrap_or(Ipv4Addr::LOCALHOST)
    }
}
