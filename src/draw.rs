//! Reward draw workflow: remote randomness first, local fallback on any
//! failure, at most one draw in flight per drawer.

use crate::{
    contract::RandomnessSource,
    rewards::{
        ROLL_MAX,
        ROLL_MIN,
        Rarity,
        Reward,
        RewardPool,
    },
    rpc::RpcError,
};
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};
use std::{
    sync::{
        Mutex,
        PoisonError,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
    time::Duration,
};
use thiserror::Error;
use tracing::{
    info,
    warn,
};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum DrawError {
    #[error("a draw is already in progress")]
    InFlight,
}

#[derive(Debug, Error)]
enum RemoteDrawFailure {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("remote draw timed out after {0:?}")]
    TimedOut(Duration),
    #[error("roll {0} outside the 1..=100 range")]
    RollOutOfRange(u64),
    #[error("{name:?} is not a {rarity} reward")]
    ForeignItem { name: String, rarity: Rarity },
}

pub struct RewardDrawer<S, R = StdRng> {
    source: S,
    pool: RewardPool,
    rng: Mutex<R>,
    remote_timeout: Duration,
    in_flight: AtomicBool,
}

impl<S: RandomnessSource> RewardDrawer<S, StdRng> {
    pub fn new(source: S) -> Self {
        Self::with_rng(source, StdRng::from_os_rng())
    }
}

impl<S: RandomnessSource, R: Rng> RewardDrawer<S, R> {
    pub fn with_rng(source: S, rng: R) -> Self {
        Self {
            source,
            pool: RewardPool::default(),
            rng: Mutex::new(rng),
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &RewardPool {
        &self.pool
    }

    pub fn is_drawing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Always yields a reward unless another draw on this drawer is still
    /// running.
    pub async fn draw(&self) -> Result<Reward, DrawError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(DrawError::InFlight)?;
        let remote = tokio::time::timeout(self.remote_timeout, self.remote_draw()).await;
        let outcome = match remote {
            Ok(result) => result,
            Err(_) => Err(RemoteDrawFailure::TimedOut(self.remote_timeout)),
        };
        match outcome {
            Ok(reward) => {
                info!(name = %reward.name, rarity = %reward.rarity, "on-chain reward drawn");
                Ok(reward)
            }
            Err(err) => {
                warn!(%err, "remote draw failed, falling back to local randomness");
                let reward = self.local_draw();
                info!(name = %reward.name, rarity = %reward.rarity, "local reward drawn");
                Ok(reward)
            }
        }
    }

    async fn remote_draw(&self) -> Result<Reward, RemoteDrawFailure> {
        let roll = self.source.random_number(ROLL_MIN, ROLL_MAX).await?;
        if !(ROLL_MIN..=ROLL_MAX).contains(&roll) {
            return Err(RemoteDrawFailure::RollOutOfRange(roll));
        }
        let rarity = Rarity::from_roll(roll);
        let items = self.pool.items(rarity);
        let name = self.source.select_item(items).await?;
        if !self.pool.contains(rarity, &name) {
            return Err(RemoteDrawFailure::ForeignItem { name, rarity });
        }
        Ok(Reward::new(name, rarity, true))
    }

    fn local_draw(&self) -> Reward {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        self.pool.draw_local(&mut *rng)
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn in_flight_guard__refuses_second_acquire_until_dropped() {
        // given
        let flag = AtomicBool::new(false);
        let first = InFlightGuard::acquire(&flag);

        // when
        let second = InFlightGuard::acquire(&flag);

        // then
        assert!(first.is_some());
        assert!(second.is_none());
        drop(first);
        assert!(InFlightGuard::acquire(&flag).is_some());
    }
}
