//! Dictionary probing of sector keys
//!
//! [`KeyMapBuilder`] walks a sector range one sector per [`step`], trying
//! every candidate key as key A and as key B until both roles are found or the
//! candidates run out. The probe is resumable: when the tag is lost, the
//! sectors already probed stay in the key map and the next call continues at
//! the sector that failed.
//!
//! [`step`]: KeyMapBuilder::step

use tagkit_core::{Key, KeyMap, KeyPair, KeyRole};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::candidates::CandidateKeys;
use crate::config::ProbeConfig;
use crate::link::TagLink;
use crate::tag::Tag;
use crate::{Error, Result};

/// Resumable probe session
#[derive(Debug, Clone, Default)]
pub struct KeyMapBuilder {
    config: ProbeConfig,
    candidates: CandidateKeys,
    /// First and last sector of the range
    range: Option<(usize, usize)>,
    /// Next sector to probe; `last + 1` starts a new cycle
    cursor: usize,
    key_map: KeyMap,
    cancel: CancelToken,
}

impl KeyMapBuilder {
    /// Create a builder without keys or range
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Use a shared cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The cancellation token checked by [`run`](Self::run)
    pub const fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Set the keys to try
    pub fn set_candidate_keys(&mut self, keys: impl IntoIterator<Item = Key>) {
        self.candidates = CandidateKeys::new(keys);
        debug!(
            keys = self.candidates.len(),
            pinned = self.candidates.is_pinned(),
            "Candidate keys set"
        );
    }

    /// Candidate keys in current trial order
    pub const fn candidates(&self) -> &CandidateKeys {
        &self.candidates
    }

    /// Set the sectors to probe, `first..=last` on a tag with `sector_count` sectors
    ///
    /// The next step starts a new cycle at `first`.
    pub fn set_range(&mut self, first: usize, last: usize, sector_count: usize) -> Result<()> {
        if first > last || last >= sector_count {
            return Err(Error::InvalidRange {
                first,
                last,
                count: sector_count,
            });
        }
        self.range = Some((first, last));
        self.cursor = last + 1;
        Ok(())
    }

    /// Sector range being probed
    pub const fn range(&self) -> Option<(usize, usize)> {
        self.range
    }

    /// Keys found so far
    pub const fn key_map(&self) -> &KeyMap {
        &self.key_map
    }

    /// Consume the builder, returning the keys found
    pub fn into_key_map(self) -> KeyMap {
        self.key_map
    }

    /// Whether the current cycle has probed every sector in range
    pub fn is_complete(&self) -> bool {
        self.range.is_some_and(|(_, last)| self.cursor > last)
    }

    /// Sectors probed in the current cycle, and sectors in range
    pub fn progress(&self) -> (usize, usize) {
        match self.range {
            Some((first, last)) if self.cursor > last => (last - first + 1, last - first + 1),
            Some((first, last)) => (self.cursor - first, last - first + 1),
            None => (0, 0),
        }
    }

    /// Probe the next sector and return its index
    ///
    /// Stepping past the last sector starts a new cycle with an empty key map.
    /// If the tag is lost and reconnecting is disabled, fails with
    /// [`Error::TagLost`] without moving on; the sector is probed again on the
    /// next call.
    pub fn step<L: TagLink + 'static>(&mut self, tag: &mut Tag<L>) -> Result<usize> {
        let (first, last) = self.range.ok_or(Error::NotInitialized)?;
        if self.candidates.is_empty() {
            return Err(Error::NotInitialized);
        }

        if self.cursor > last {
            debug!(first, last, "Starting a new probe cycle");
            self.key_map.clear();
            self.cursor = first;
        }

        let sector = self.cursor;
        let found = self.probe_sector(tag, sector)?;

        if !found.is_empty() {
            debug!(sector, a = ?found.a, b = ?found.b, "Found keys");
            self.key_map.insert(sector, found);
        }
        for key in [found.a, found.b].into_iter().flatten() {
            self.candidates.promote(&key);
        }

        self.cursor += 1;
        Ok(sector)
    }

    /// Probe every remaining sector of the current cycle
    ///
    /// Checks the cancellation token before each sector. A completed cycle is
    /// restarted from scratch.
    pub fn run<L: TagLink + 'static>(&mut self, tag: &mut Tag<L>) -> Result<&KeyMap> {
        self.run_with_progress(tag, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `progress` with each probed sector
    /// and the cycle's [`progress`](Self::progress)
    pub fn run_with_progress<L: TagLink + 'static>(
        &mut self,
        tag: &mut Tag<L>,
        mut progress: impl FnMut(usize, (usize, usize)),
    ) -> Result<&KeyMap> {
        let (_, last) = self.range.ok_or(Error::NotInitialized)?;
        loop {
            self.cancel.check()?;
            let sector = self.step(tag)?;
            progress(sector, self.progress());
            if sector == last {
                break;
            }
        }
        info!(sectors = self.key_map.len(), "Key mapping done");
        Ok(&self.key_map)
    }

    fn probe_sector<L: TagLink + 'static>(
        &self,
        tag: &mut Tag<L>,
        sector: usize,
    ) -> Result<KeyPair> {
        let mut found = KeyPair::default();
        for key in self.candidates.as_slice() {
            for role in KeyRole::ALL {
                if found.get(role).is_none() && self.try_key(tag, sector, key, role)? {
                    found.set(role, *key);
                }
            }
            if found.is_complete() {
                break;
            }
        }
        Ok(found)
    }

    /// Try one key in one role, reconnecting if configured to
    fn try_key<L: TagLink + 'static>(
        &self,
        tag: &mut Tag<L>,
        sector: usize,
        key: &Key,
        role: KeyRole,
    ) -> Result<bool> {
        loop {
            match self.authenticate(tag, sector, key, role) {
                Ok(accepted) => return Ok(accepted),
                Err(Error::TagLost | Error::Io(_)) if self.config.auto_reconnect => {
                    warn!(sector, "Tag lost while probing, waiting for it to return");
                    self.reconnect(tag)?;
                }
                Err(Error::TagLost | Error::Io(_)) => {
                    warn!(sector, "Tag lost while probing, aborting");
                    return Err(Error::TagLost);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn authenticate<L: TagLink>(
        &self,
        tag: &Tag<L>,
        sector: usize,
        key: &Key,
        role: KeyRole,
    ) -> Result<bool> {
        for _ in 0..self.config.auth_attempts() {
            if tag.authenticate(sector, key, role)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Poll for the tag until it is back, or until cancelled
    fn reconnect<L: TagLink + 'static>(&self, tag: &mut Tag<L>) -> Result<()> {
        loop {
            self.cancel.check()?;
            tag.clock().sleep(self.config.reconnect_interval);
            match tag.connect() {
                Ok(()) => {
                    info!("Tag reconnected");
                    return Ok(());
                }
                Err(e) => debug!(error = %e, "Reconnect attempt failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hex_literal::hex;

    use super::*;
    use crate::clock::ManualClock;
    use crate::link::LinkError;
    use crate::mock::MockTag;

    const K1: Key = Key::new(hex!("A0A1A2A3A4A5"));
    const K2: Key = Key::new(hex!("B0B1B2B3B4B5"));
    const K3: Key = Key::new(hex!("D3F7D3F7D3F7"));

    fn tag(mock: MockTag) -> (Tag<MockTag>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (Tag::with_clock(mock, clock.clone()), clock)
    }

    fn builder(config: ProbeConfig, keys: &[Key], sectors: usize) -> KeyMapBuilder {
        let mut builder = KeyMapBuilder::new(config);
        builder.set_candidate_keys(keys.iter().copied());
        builder.set_range(0, sectors - 1, sectors).unwrap();
        builder
    }

    #[test]
    fn test_not_initialized() {
        let (mut tag, _) = tag(MockTag::with_sectors(4));
        let mut builder = KeyMapBuilder::new(ProbeConfig::default());
        assert!(matches!(builder.step(&mut tag), Err(Error::NotInitialized)));

        builder.set_range(0, 3, 4).unwrap();
        assert!(matches!(builder.step(&mut tag), Err(Error::NotInitialized)));
    }

    #[test]
    fn test_invalid_range() {
        let mut builder = KeyMapBuilder::new(ProbeConfig::default());
        assert!(matches!(
            builder.set_range(2, 1, 16),
            Err(Error::InvalidRange { .. })
        ));
        assert!(builder.set_range(0, 16, 16).is_err());
        assert!(builder.set_range(15, 15, 16).is_ok());
    }

    #[test]
    fn test_probe_finds_keys() {
        let mut mock = MockTag::with_sectors(4);
        mock.set_keys(1, K1, K2);
        mock.set_keys(2, K3, K3);
        mock.set_keys(3, K1, K3);
        let (mut tag, _) = tag(mock);

        let mut builder = builder(ProbeConfig::default(), &[K1, K2, Key::DEFAULT], 4);
        let map = builder.run(&mut tag).unwrap().clone();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(0), Some(&KeyPair::new(Some(Key::DEFAULT), Some(Key::DEFAULT))));
        assert_eq!(map.get(1), Some(&KeyPair::new(Some(K1), Some(K2))));
        assert!(!map.contains(2));
        assert_eq!(map.get(3), Some(&KeyPair::new(Some(K1), None)));
        assert!(builder.is_complete());
        assert_eq!(builder.progress(), (4, 4));
    }

    #[test]
    fn test_step_stops_once_both_roles_found() {
        let (mut tag, _) = tag(MockTag::with_sectors(1));
        let mut builder = builder(ProbeConfig::default(), &[Key::DEFAULT, K1, K2], 1);

        assert_eq!(builder.step(&mut tag).unwrap(), 0);
        let attempts = tag.with_link(|link| link.auth_log.len()).unwrap();
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_found_keys_are_promoted() {
        let mut mock = MockTag::with_sectors(3);
        mock.set_keys(0, K3, K2);
        mock.set_keys(1, K3, K2);
        mock.set_keys(2, K3, K2);
        let (mut tag, _) = tag(mock);

        let mut builder = builder(ProbeConfig::default(), &[K1, Key::DEFAULT, K2, K3], 3);
        builder.step(&mut tag).unwrap();
        assert_eq!(builder.candidates().as_slice(), &[K2, K3, K1, Key::DEFAULT]);

        // Next sector needs only one attempt per role
        tag.with_link(|link| link.auth_log.clear()).unwrap();
        builder.step(&mut tag).unwrap();
        let log = tag.with_link(|link| link.auth_log.clone()).unwrap();
        assert_eq!(
            log,
            vec![(1, K2, KeyRole::A), (1, K2, KeyRole::B), (1, K3, KeyRole::A)]
        );
    }

    #[test]
    fn test_promotion_keeps_pinned_key_first() {
        let mut mock = MockTag::with_sectors(2);
        mock.set_keys(0, K1, K1);
        let (mut tag, _) = tag(mock);

        let mut builder = builder(ProbeConfig::default(), &[Key::ZERO, K1, Key::DEFAULT], 2);
        assert_eq!(builder.candidates().as_slice(), &[Key::DEFAULT, Key::ZERO, K1]);

        builder.step(&mut tag).unwrap();
        assert_eq!(builder.candidates().as_slice(), &[Key::DEFAULT, K1, Key::ZERO]);
    }

    #[test]
    fn test_new_cycle_clears_key_map() {
        let (mut tag, _) = tag(MockTag::with_sectors(2));
        let mut builder = builder(ProbeConfig::default(), &[Key::DEFAULT], 2);
        builder.run(&mut tag).unwrap();
        assert_eq!(builder.key_map().len(), 2);

        assert_eq!(builder.step(&mut tag).unwrap(), 0);
        assert_eq!(builder.key_map().len(), 1);
        assert_eq!(builder.progress(), (1, 2));
    }

    #[test]
    fn test_retry_authentication() {
        let mut mock = MockTag::with_sectors(1);
        mock.flaky_auths = 2;
        let (mut tag, _) = tag(mock);

        let config = ProbeConfig::default().with_retry_authentication(2);
        let mut builder = builder(config, &[Key::DEFAULT], 1);
        builder.step(&mut tag).unwrap();
        assert_eq!(
            builder.key_map().get(0),
            Some(&KeyPair::new(Some(Key::DEFAULT), Some(Key::DEFAULT)))
        );
    }

    #[test]
    fn test_tag_lost_aborts_and_resumes() {
        let mut mock = MockTag::with_sectors(3);
        mock.set_keys(1, K1, K1);
        let (mut tag, _) = tag(mock);

        let mut builder = builder(ProbeConfig::default(), &[Key::DEFAULT, K1], 3);
        assert_eq!(builder.step(&mut tag).unwrap(), 0);

        // Lose the tag on the first attempt for sector 1
        tag.with_link(|link| link.auth_errors.push_back(LinkError::TagLost))
            .unwrap();
        assert!(matches!(builder.run(&mut tag), Err(Error::TagLost)));
        assert_eq!(builder.key_map().len(), 1);
        assert_eq!(builder.progress(), (1, 3));

        tag.connect().unwrap();
        let map = builder.run(&mut tag).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(1), Some(&KeyPair::new(Some(K1), Some(K1))));
    }

    #[test]
    fn test_auto_reconnect_retries_same_key() {
        let mut mock = MockTag::with_sectors(1);
        mock.auth_errors.push_back(LinkError::TagLost);
        mock.auth_errors.push_back(LinkError::io("collision"));
        let (mut tag, clock) = tag(mock);

        let config = ProbeConfig::default().with_auto_reconnect(true);
        let mut builder = builder(config, &[Key::DEFAULT], 1);
        builder.step(&mut tag).unwrap();

        assert_eq!(
            builder.key_map().get(0),
            Some(&KeyPair::new(Some(Key::DEFAULT), Some(Key::DEFAULT)))
        );
        let log = tag.with_link(|link| link.auth_log.clone()).unwrap();
        assert_eq!(log.len(), 4);
        assert!(log[..3].iter().all(|&(_, _, role)| role == KeyRole::A));
        assert!(clock.elapsed() >= config.reconnect_interval * 2);
    }

    #[test]
    fn test_cancel_while_reconnecting() {
        let mut mock = MockTag::with_sectors(1);
        mock.auth_errors.push_back(LinkError::TagLost);
        mock.connect_error = Some(LinkError::io("no tag in field"));
        let (mut tag, _) = tag(mock);

        let cancel = CancelToken::new();
        let config = ProbeConfig::default().with_auto_reconnect(true);
        let mut builder = builder(config, &[Key::DEFAULT], 1).with_cancel_token(cancel.clone());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            cancel.cancel();
        });
        assert!(matches!(builder.step(&mut tag), Err(Error::Cancelled)));
        handle.join().unwrap();
    }

    #[test]
    fn test_run_checks_cancellation() {
        let (mut tag, _) = tag(MockTag::with_sectors(2));
        let mut builder = builder(ProbeConfig::default(), &[Key::DEFAULT], 2);
        builder.cancel_token().cancel();
        assert!(matches!(builder.run(&mut tag), Err(Error::Cancelled)));
        assert!(builder.key_map().is_empty());
    }

    #[test]
    fn test_run_reports_progress_and_stops_when_cancelled() {
        let (mut tag, _) = tag(MockTag::with_sectors(4));
        let mut builder = builder(ProbeConfig::default(), &[Key::DEFAULT], 4);
        let cancel = builder.cancel_token().clone();

        let mut seen = Vec::new();
        let result = builder.run_with_progress(&mut tag, |sector, progress| {
            seen.push((sector, progress));
            if sector == 1 {
                cancel.cancel();
            }
        });
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(seen, [(0, (1, 4)), (1, (2, 4))]);
        assert_eq!(builder.key_map().len(), 2);

        builder.cancel_token().reset();
        let mut seen = Vec::new();
        builder
            .run_with_progress(&mut tag, |sector, _| seen.push(sector))
            .unwrap();
        assert_eq!(seen, [2, 3]);
        assert_eq!(builder.key_map().len(), 4);
    }
}
