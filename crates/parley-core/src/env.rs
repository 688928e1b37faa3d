//! Environment abstraction for deterministic testing.
//!
//! The relay driver and the client state machine never read the clock or the
//! OS RNG directly. Production code plugs in a system environment, the
//! simulation harness plugs in virtual time and a seeded RNG.

use std::time::Duration;

/// Time, randomness and sleeping, supplied by the runtime.
///
/// Implementations MUST guarantee that `now()` never goes backwards and that
/// `random_bytes()` draws from a cryptographically secure source in
/// production.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Monotonic instant type.
    ///
    /// Production uses `std::time::Instant`; simulation uses tokio's virtual
    /// clock.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Sleep for `duration`. Only runtimes call this, never state machines.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`, used for relay session ids.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Random version 4 UUID in its canonical hyphenated form.
    ///
    /// Used for client sender ids.
    fn random_uuid(&self) -> String {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid().to_string()
    }
}
