pub mod io;
pub mod timers;

use std::{collections::HashMap, io::ErrorKind, time::Instant};

use mio::Token;
use tracing::{debug, error, trace};

use crate::{
    config::HubConfig,
    error::{Error, Result},
    ready::FdSets,
    transfer::{DataTransfer, Status},
};
use io::{Os, Selector};
use timers::Deadline;

/// Drives many transfers at once from a single thread.
///
/// Transfers are keyed by a caller chosen [`Token`]. The hub owns them
/// while they are registered; [`remove`](TransferHub::remove) hands them
/// back. Descriptors are never closed by the hub.
pub struct TransferHub<S = Os> {
    selector: S,
    transfers: HashMap<Token, DataTransfer>,
}

impl TransferHub<Os> {
    pub fn new() -> Result<Self> {
        Self::with_config(HubConfig::default())
    }

    pub fn with_config(config: HubConfig) -> Result<Self> {
        Ok(Self::with_selector(Os::new(&config)?))
    }
}

impl<S: Selector> TransferHub<S> {
    pub fn with_selector(selector: S) -> Self {
        Self {
            selector,
            transfers: HashMap::new(),
        }
    }

    /// Register a configured transfer under `token`.
    ///
    /// # Panics
    ///
    /// If `token` is already registered, or the transfer has no driver, no
    /// descriptor, `min_len > max_len` or a buffer shorter than `max_len`.
    pub fn add(&mut self, token: Token, mut transfer: DataTransfer) {
        assert!(
            !self.transfers.contains_key(&token),
            "{token:?} is already registered"
        );
        transfer.register(Instant::now());
        debug!(?token, fd = transfer.fd, direction = ?transfer.direction, "transfer added");
        self.transfers.insert(token, transfer);
    }

    /// Unregister a transfer, handing it back. Its descriptor is left alone.
    pub fn remove(&mut self, token: Token) -> Option<DataTransfer> {
        let transfer = self.transfers.remove(&token)?;
        debug!(?token, status = ?transfer.status(), "transfer removed");
        Some(transfer)
    }

    pub fn get(&self, token: Token) -> Option<&DataTransfer> {
        self.transfers.get(&token)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Token, &DataTransfer)> {
        self.transfers.iter().map(|(token, transfer)| (*token, transfer))
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    /// Tear the hub down, handing back whatever is still registered.
    pub fn release(self) -> Vec<(Token, DataTransfer)> {
        self.transfers.into_iter().collect()
    }

    /// Wait for at least one pending transfer to complete or fail.
    ///
    /// Returns straight away if no transfer is pending. Otherwise rounds of
    /// select-then-transfer are run until a round changes the status of some
    /// transfer. Completed transfers short of `max_len` keep moving bytes
    /// while others are pending, but never keep the hub waiting by
    /// themselves.
    ///
    /// A selector failure other than an interruption aborts the process.
    pub fn wait(&mut self) {
        loop {
            // work out what this round is interested in
            let mut interest = FdSets::default();
            let mut deadline = Deadline::Never;
            let mut pending = 0;
            let mut active = Vec::new();

            for (token, transfer) in &self.transfers {
                if !transfer.is_active() {
                    continue;
                }
                if transfer.status() == Status::Pending {
                    pending += 1;
                }
                interest.insert(transfer.direction, transfer.fd);
                deadline = deadline.min(transfer.deadline());
                active.push(*token);
            }

            if pending == 0 {
                return;
            }

            let timeout = deadline.wait_from(Instant::now());
            trace!(
                active = active.len(),
                pending,
                max_fd = ?interest.max_fd(),
                ?timeout,
                "selecting"
            );

            let ready = match self.selector.select(&interest, timeout) {
                Ok(ready) => ready,
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    debug!("select interrupted, retrying");
                    continue;
                }
                Err(e) => fatal(Error::Select(e)),
            };

            // every active transfer gets its turn before deciding to return
            let now = Instant::now();
            let mut changed = false;
            for token in active {
                if let Some(transfer) = self.transfers.get_mut(&token) {
                    changed |= transfer.advance(&ready, now);
                }
            }

            if changed {
                return;
            }
        }
    }
}

/// The poller is broken beyond what the hub can recover from.
fn fatal(err: Error) -> ! {
    error!(%err, "unrecoverable readiness failure");
    std::process::abort()
}
