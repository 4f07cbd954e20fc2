//! Replay prevention for accepted payment signatures.
//!
//! A valid signature proves one payment, so it must buy access at most once
//! within the freshness window. The guard keeps a concurrent table of
//! accepted signatures with their acceptance times; the check-then-insert is
//! atomic per signature, so two simultaneous verifications of the same
//! signature cannot both be accepted. Entries are evicted lazily once older
//! than the window, and [`ReplayGuard::purge_expired`] offers a sweep for
//! long-lived processes.
//!
//! This guard is in-memory and therefore per-process. Multi-process
//! deployments need a shared store keyed by signature with the same TTL.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use solana_signature::Signature;

use crate::timestamp::UnixTimestamp;

/// Outcome of a replay check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayCheck {
    /// First presentation of the signature within the window; recorded.
    Accepted,
    /// The signature was already accepted within the window.
    AlreadyUsed,
}

/// Tracks signatures already accepted as payment, enforcing at-most-once
/// acceptance per signature within the freshness window.
#[derive(Debug)]
pub struct ReplayGuard {
    seen: DashMap<Signature, UnixTimestamp>,
    ttl_seconds: u64,
}

impl ReplayGuard {
    /// Creates a guard whose entries expire after `ttl_seconds`.
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            seen: DashMap::new(),
            ttl_seconds,
        }
    }

    /// Atomic check-then-insert: records the signature and returns
    /// [`ReplayCheck::Accepted`] unless it is already present and not yet
    /// expired. An expired entry is refreshed rather than rejected; the
    /// independent age check is what keeps genuinely old transactions out.
    pub fn check_and_record(&self, signature: &Signature) -> ReplayCheck {
        self.check_and_record_at(signature, UnixTimestamp::now())
    }

    pub(crate) fn check_and_record_at(
        &self,
        signature: &Signature,
        now: UnixTimestamp,
    ) -> ReplayCheck {
        match self.seen.entry(*signature) {
            Entry::Occupied(mut occupied) => {
                if now.saturating_secs_since(*occupied.get()) > self.ttl_seconds {
                    occupied.insert(now);
                    ReplayCheck::Accepted
                } else {
                    ReplayCheck::AlreadyUsed
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now);
                ReplayCheck::Accepted
            }
        }
    }

    /// Drops all entries older than the window.
    pub fn purge_expired(&self) {
        let now = UnixTimestamp::now();
        self.seen
            .retain(|_, accepted_at| now.saturating_secs_since(*accepted_at) <= self.ttl_seconds);
    }

    /// Number of signatures currently tracked, including not-yet-evicted
    /// expired ones.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(seed: u8) -> Signature {
        Signature::from([seed; 64])
    }

    #[test]
    fn first_presentation_accepted_second_rejected() {
        let guard = ReplayGuard::new(300);
        let signature = sig(1);
        assert_eq!(guard.check_and_record(&signature), ReplayCheck::Accepted);
        assert_eq!(guard.check_and_record(&signature), ReplayCheck::AlreadyUsed);
    }

    #[test]
    fn distinct_signatures_do_not_interfere() {
        let guard = ReplayGuard::new(300);
        assert_eq!(guard.check_and_record(&sig(1)), ReplayCheck::Accepted);
        assert_eq!(guard.check_and_record(&sig(2)), ReplayCheck::Accepted);
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn expired_entry_is_refreshed_not_rejected() {
        let guard = ReplayGuard::new(300);
        let signature = sig(1);
        let t0 = UnixTimestamp::from_secs(1_000);
        assert_eq!(
            guard.check_and_record_at(&signature, t0),
            ReplayCheck::Accepted
        );
        // Within the window: replay.
        assert_eq!(
            guard.check_and_record_at(&signature, t0 + 300),
            ReplayCheck::AlreadyUsed
        );
        // Beyond the window: the entry no longer blocks.
        assert_eq!(
            guard.check_and_record_at(&signature, t0 + 301),
            ReplayCheck::Accepted
        );
        // The refresh restarts the window.
        assert_eq!(
            guard.check_and_record_at(&signature, t0 + 302),
            ReplayCheck::AlreadyUsed
        );
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let guard = ReplayGuard::new(0);
        guard.check_and_record_at(&sig(1), UnixTimestamp::from_secs(0));
        guard.check_and_record_at(&sig(2), UnixTimestamp::now() + 3600);
        guard.purge_expired();
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn concurrent_same_signature_single_winner() {
        use std::sync::Arc;
        let guard = Arc::new(ReplayGuard::new(300));
        let signature = sig(7);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || guard.check_and_record(&signature))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|outcome| *outcome == ReplayCheck::Accepted)
            .count();
        assert_eq!(accepted, 1);
    }
}
