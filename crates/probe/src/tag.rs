//! Exclusive handle to a tag link
//!
//! [`Tag`] owns the link behind a mutex so that only one operation is in flight
//! at a time, and bounds connection attempts: the link's `connect` runs on a
//! helper thread while the caller polls a small state machine against a
//! [`Clock`] deadline. An attempt that overruns the deadline is abandoned but
//! not restarted; the next `connect` call waits for it instead of spawning
//! another one.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use parking_lot::{Mutex, MutexGuard};
use tagkit_core::block::BLOCK_LEN;
use tagkit_core::{Key, KeyRole};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_CONNECT_TIMEOUT;
use crate::link::{LinkResult, TagLink};
use crate::{Error, Result};

/// Interval between checks on a pending connect attempt
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Connection state of a [`Tag`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    /// No connect attempt has been made
    Idle,
    /// An attempt is running and may finish until `deadline`
    Connecting {
        /// Instant after which the attempt counts as failed
        deadline: Instant,
    },
    /// The last attempt succeeded
    Connected,
    /// The last attempt failed or timed out
    Failed,
}

/// Serialized, time-bounded access to a [`TagLink`]
#[derive(Debug)]
pub struct Tag<L: TagLink> {
    link: Arc<Mutex<L>>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    state: ConnectState,
    pending: Option<Receiver<LinkResult<()>>>,
}

impl<L: TagLink + 'static> Tag<L> {
    /// Wrap a link, using the system clock and the default connect timeout
    pub fn new(link: L) -> Self {
        Self::with_clock(link, Arc::new(SystemClock))
    }

    /// Wrap a link with a custom clock
    pub fn with_clock(link: L, clock: Arc<dyn Clock>) -> Self {
        Self {
            link: Arc::new(Mutex::new(link)),
            clock,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            state: ConnectState::Idle,
            pending: None,
        }
    }

    /// Set the bound on connect attempts
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect, waiting at most the connect timeout
    pub fn connect(&mut self) -> Result<()> {
        self.begin_connect()?;
        loop {
            if let Some(result) = self.poll_connect() {
                return result;
            }
            self.clock.sleep(POLL_INTERVAL);
        }
    }

    /// Start a connect attempt without waiting for it
    ///
    /// Reuses an attempt that is still running from an earlier call.
    pub fn begin_connect(&mut self) -> Result<()> {
        if self.pending.is_none() {
            let (tx, rx) = bounded(1);
            let link = Arc::clone(&self.link);
            thread::Builder::new()
                .name("tag-connect".to_string())
                .spawn(move || {
                    let result = link.lock().connect();
                    // The caller may have given up on this attempt
                    let _ = tx.send(result);
                })
                .map_err(|e| Error::io(format!("failed to spawn connect thread: {e}")))?;
            self.pending = Some(rx);
        } else {
            debug!("Waiting on a connect attempt that is still running");
        }

        self.state = ConnectState::Connecting {
            deadline: self.clock.now() + self.timeout,
        };
        Ok(())
    }

    /// Check on the current connect attempt
    ///
    /// Returns `None` while the attempt is running and its deadline has not
    /// passed.
    pub fn poll_connect(&mut self) -> Option<Result<()>> {
        let ConnectState::Connecting { deadline } = self.state else {
            return match self.state {
                ConnectState::Connected => Some(Ok(())),
                _ => Some(Err(Error::TagLost)),
            };
        };

        let Some(rx) = &self.pending else {
            self.state = ConnectState::Failed;
            return Some(Err(Error::TagLost));
        };

        match rx.try_recv() {
            Ok(result) => {
                self.pending = None;
                match result {
                    Ok(()) => {
                        info!("Connected to tag");
                        self.state = ConnectState::Connected;
                        Some(Ok(()))
                    }
                    Err(e) => {
                        debug!(error = ?e, "Connect failed");
                        self.state = ConnectState::Failed;
                        Some(Err(e.into()))
                    }
                }
            }
            Err(TryRecvError::Empty) if self.clock.now() >= deadline => {
                warn!(timeout = ?self.timeout, "Connect timed out");
                self.state = ConnectState::Failed;
                Some(Err(Error::ConnectTimeout(self.timeout)))
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                self.state = ConnectState::Failed;
                Some(Err(Error::io("connect thread exited without a result")))
            }
        }
    }
}

impl<L: TagLink> Tag<L> {
    /// Current connection state
    pub const fn state(&self) -> ConnectState {
        self.state
    }

    /// The clock used for deadlines and backoff
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Whether the tag is connected
    ///
    /// A link held by a running connect attempt counts as not connected.
    pub fn is_connected(&self) -> bool {
        self.link.try_lock().is_some_and(|link| link.is_connected())
    }

    /// Lock the link, treating a link stuck in a connect attempt as lost
    fn link(&self) -> Result<MutexGuard<'_, L>> {
        self.link.try_lock_for(self.timeout).ok_or(Error::TagLost)
    }

    /// Authenticate to a sector; `Ok(false)` means the key was rejected
    pub fn authenticate(&self, sector: usize, key: &Key, role: KeyRole) -> Result<bool> {
        Ok(self.link()?.authenticate(sector, key, role)?)
    }

    /// Read one block by absolute block number
    pub fn read_block(&self, block: usize) -> Result<[u8; BLOCK_LEN]> {
        Ok(self.link()?.read_block(block)?)
    }

    /// Write one block by absolute block number
    pub fn write_block(&self, block: usize, data: &[u8; BLOCK_LEN]) -> Result<()> {
        Ok(self.link()?.write_block(block, data)?)
    }

    /// Increment a value block
    pub fn increment(&self, block: usize, value: u32) -> Result<()> {
        Ok(self.link()?.increment(block, value)?)
    }

    /// Decrement a value block
    pub fn decrement(&self, block: usize, value: u32) -> Result<()> {
        Ok(self.link()?.decrement(block, value)?)
    }

    /// Write the transfer buffer to a block
    pub fn transfer(&self, block: usize) -> Result<()> {
        Ok(self.link()?.transfer(block)?)
    }

    /// Drop the connection
    pub fn close(&mut self) {
        if let Some(mut link) = self.link.try_lock_for(self.timeout) {
            link.close();
        }
        self.state = ConnectState::Idle;
    }

    /// Number of sectors on the tag
    pub fn sector_count(&self) -> Result<usize> {
        Ok(self.link()?.sector_count())
    }

    /// Number of blocks in a sector
    pub fn block_count_in_sector(&self, sector: usize) -> Result<usize> {
        Ok(self.link()?.block_count_in_sector(sector))
    }

    /// Absolute number of a sector's first block
    pub fn sector_to_block(&self, sector: usize) -> Result<usize> {
        Ok(self.link()?.sector_to_block(sector))
    }

    /// Run a closure with exclusive access to the link
    pub fn with_link<T>(&self, f: impl FnOnce(&mut L) -> T) -> Result<T> {
        Ok(f(&mut *self.link()?))
    }
}
