use std::{io, os::unix::io::RawFd, sync::Arc, time::Duration, time::Instant};

use tracing::debug;

use crate::{
    driver::{Driver, UNSET_FD},
    error::TransferError,
    reactor::timers::Deadline,
    ready::FdSets,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    Read,
    Write,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not (yet) added to a hub
    #[default]
    Unregistered,
    /// Fewer than `min_len` bytes have moved
    Pending,
    /// At least `min_len` bytes have moved.
    ///
    /// A completed transfer left in the hub may keep moving bytes up to
    /// `max_len`, so it can still turn into `Failed`.
    Completed,
    /// Timed out or the driver reported an error
    Failed,
}

/// One read or write of between `min_len` and `max_len` bytes on a
/// descriptor.
///
/// The public fields are the configuration and must be set before the
/// transfer is added to a [`TransferHub`](crate::TransferHub). Everything
/// else is bookkeeping owned by the hub.
#[derive(Educe)]
#[educe(Default, Debug)]
pub struct DataTransfer {
    pub direction: Direction,

    #[educe(Debug(ignore))]
    pub driver: Option<Arc<dyn Driver>>,

    #[educe(Default(expression = UNSET_FD))]
    pub fd: RawFd,

    /// Reads land in, and writes are drawn from, `buf[..max_len]`
    #[educe(Debug(ignore))]
    pub buf: Vec<u8>,

    /// Bytes needed before the transfer counts as completed.
    /// Zero completes as soon as the descriptor is ready.
    pub min_len: usize,
    pub max_len: usize,

    /// Longest allowed gap between two bursts of progress.
    /// `None` never times out. Only a driver call that moved at least
    /// one byte pushes the deadline back.
    pub op_timeout: Option<Duration>,

    transferred: usize,
    status: Status,
    deadline: Deadline,
    error: Option<TransferError>,
}

impl DataTransfer {
    /// An unconfigured transfer with an unset descriptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// A read of exactly `buf.len()` bytes.
    pub fn reader(driver: Arc<dyn Driver>, fd: RawFd, buf: Vec<u8>) -> Self {
        Self::configured(Direction::Read, driver, fd, buf)
    }

    /// A write of the whole of `buf`.
    pub fn writer(driver: Arc<dyn Driver>, fd: RawFd, buf: Vec<u8>) -> Self {
        Self::configured(Direction::Write, driver, fd, buf)
    }

    fn configured(
        direction: Direction,
        driver: Arc<dyn Driver>,
        fd: RawFd,
        buf: Vec<u8>,
    ) -> Self {
        let len = buf.len();
        Self {
            direction,
            driver: Some(driver),
            fd,
            buf,
            min_len: len,
            max_len: len,
            ..Self::default()
        }
    }

    /// Consider the transfer completed after `min_len` bytes,
    /// while still accepting up to `max_len`.
    pub fn min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Idle timeout in milliseconds, 0 for none.
    pub fn op_timeout_ms(mut self, ms: u64) -> Self {
        self.op_timeout = (ms != 0).then(|| Duration::from_millis(ms));
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Bytes moved since the transfer was added.
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// The bytes moved so far.
    pub fn data(&self) -> &[u8] {
        &self.buf[..self.transferred]
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Why the transfer failed, if it did.
    pub fn error(&self) -> Option<&TransferError> {
        self.error.as_ref()
    }

    /// Message describing the failure.
    ///
    /// # Panics
    ///
    /// If the transfer has not failed.
    pub fn error_message(&self) -> &str {
        assert_eq!(self.status, Status::Failed, "transfer has not failed");
        match &self.error {
            Some(error) => error.message(),
            None => TransferError::TIMEOUT_MESSAGE,
        }
    }

    /// Drop any recorded failure. Safe to call any number of times.
    pub fn release(&mut self) {
        self.error = None;
    }

    /// Close the descriptor through the driver. Meant for transfers that
    /// have been removed from their hub.
    pub fn disconnect(&mut self) {
        if let Some(driver) = &self.driver {
            driver.disconnect(&mut self.fd);
        }
    }

    /// Should the hub keep moving bytes for this transfer
    pub(crate) fn is_active(&self) -> bool {
        match self.status {
            Status::Pending => true,
            Status::Completed => self.transferred < self.max_len,
            Status::Unregistered | Status::Failed => false,
        }
    }

    /// Validate the configuration and reset the bookkeeping.
    pub(crate) fn register(&mut self, now: Instant) {
        assert!(self.driver.is_some(), "transfer has no driver");
        assert!(self.fd >= 0, "transfer has no descriptor, fd is {}", self.fd);
        assert!(
            self.min_len <= self.max_len,
            "min_len {} exceeds max_len {}",
            self.min_len,
            self.max_len
        );
        assert!(
            self.buf.len() >= self.max_len,
            "buffer of {} bytes cannot hold max_len {}",
            self.buf.len(),
            self.max_len
        );

        self.transferred = 0;
        self.status = Status::Pending;
        self.deadline = Deadline::after(now, self.op_timeout);
        self.error = None;
    }

    /// Process the outcome of one selector round.
    ///
    /// Returns true if the status changed.
    pub(crate) fn advance(&mut self, ready: &FdSets, now: Instant) -> bool {
        if !ready.contains(self.direction, self.fd) {
            if self.deadline.has_passed(now) {
                debug!(fd = self.fd, "transfer timed out");
                self.fail(TransferError::Timeout);
                return true;
            }
            return false;
        }

        let remaining = self.max_len - self.transferred;
        let result = if remaining == 0 {
            Ok(0)
        } else {
            self.transfer_more()
        };

        match result {
            Ok(n) => {
                assert!(n <= remaining, "driver moved {n} bytes, {remaining} requested");
                self.transferred += n;

                if n > 0 {
                    self.deadline = Deadline::after(now, self.op_timeout);
                }

                if self.status == Status::Pending && self.transferred >= self.min_len {
                    debug!(fd = self.fd, transferred = self.transferred, "transfer completed");
                    self.status = Status::Completed;
                    return true;
                }
                false
            }
            // ready but nothing there after all
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => false,
            Err(e) => {
                debug!(fd = self.fd, error = %e, "transfer failed");
                self.fail(TransferError::Driver(e.to_string()));
                true
            }
        }
    }

    fn transfer_more(&mut self) -> io::Result<usize> {
        let Self {
            direction,
            driver,
            fd,
            buf,
            max_len,
            transferred,
            ..
        } = self;
        let Some(driver) = driver else {
            unreachable!("registered transfer without a driver")
        };
        let window = &mut buf[*transferred..*max_len];
        match direction {
            Direction::Read => driver.read(*fd, window),
            Direction::Write => driver.write(*fd, window),
        }
    }

    fn fail(&mut self, error: TransferError) {
        self.status = Status::Failed;
        self.error = Some(error);
    }
}
