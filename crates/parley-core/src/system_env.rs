//! Production environment using system time and OS randomness.

use std::time::Duration;

use crate::env::Environment;

/// Production environment.
///
/// `std::time::Instant` for time, `tokio::time::sleep()` for sleeping and
/// getrandom for randomness. Nothing here is reproducible; simulations use
/// their own environment.
///
/// # Panics
///
/// Panics if the OS RNG fails. Session ids and client sender ids come from
/// this source and there is no sensible fallback.
#[derive(Clone, Default, Debug)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1);
    }

    #[test]
    fn random_session_ids_differ() {
        let env = SystemEnv::new();

        assert_ne!(env.random_u64(), env.random_u64());
    }

    #[test]
    fn random_uuid_is_version_4() {
        let uuid = SystemEnv::new().random_uuid();

        assert_eq!(uuid.len(), 36);
        assert_eq!(uuid.as_bytes()[14], b'4');
    }

    #[tokio::test]
    async fn sleep_waits() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;

        assert!(env.now() - start >= Duration::from_millis(50));
    }
}
