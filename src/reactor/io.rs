use std::{collections::BTreeMap, io, os::unix::io::RawFd, time::Duration};

use mio::{unix::SourceFd, Interest, Token};

use crate::{config::HubConfig, ready::FdSets, transfer::Direction};

/// Blocks until descriptors are ready or a timeout elapses.
pub trait Selector {
    /// Wait up to `timeout` for any descriptor in `interest` to become
    /// readable (read set) or writable (write set), and report the ones
    /// that did. An error of kind [`io::ErrorKind::Interrupted`] means
    /// the wait was cut short by a signal and is retried by the hub.
    fn select(&mut self, interest: &FdSets, timeout: Duration) -> io::Result<FdSets>;
}

/// Selector backed by the operating system's poller.
///
/// Descriptors are registered for a single round only, so the
/// hub's sets can change freely between rounds. They must be pollable
/// (sockets, pipes): epoll refuses regular files, and any registration
/// failure is reported as a selector error.
///
/// The event buffer grows to the number of descriptors in a round, so
/// every ready descriptor is reported at once.
pub struct Os {
    poll: mio::Poll,
    events: mio::Events,
}

impl Os {
    pub fn new(config: &HubConfig) -> io::Result<Self> {
        Ok(Self {
            poll: mio::Poll::new()?,
            events: mio::Events::with_capacity(config.event_capacity),
        })
    }

    fn wanted(interest: &FdSets) -> BTreeMap<RawFd, Interest> {
        let mut wanted = BTreeMap::new();
        for (direction, bit) in [
            (Direction::Read, Interest::READABLE),
            (Direction::Write, Interest::WRITABLE),
        ] {
            for fd in interest.set(direction).iter() {
                wanted
                    .entry(fd)
                    .and_modify(|i: &mut Interest| *i = i.add(bit))
                    .or_insert(bit);
            }
        }
        wanted
    }

    fn deregister(&self, fds: &[RawFd]) -> io::Result<()> {
        let registry = self.poll.registry();
        for fd in fds {
            registry.deregister(&mut SourceFd(fd))?;
        }
        Ok(())
    }
}

impl Selector for Os {
    fn select(&mut self, interest: &FdSets, timeout: Duration) -> io::Result<FdSets> {
        let wanted = Self::wanted(interest);
        if wanted.len() > self.events.capacity() {
            self.events = mio::Events::with_capacity(wanted.len());
        }

        let mut registered = Vec::with_capacity(wanted.len());
        for (fd, bits) in &wanted {
            let result = self
                .poll
                .registry()
                .register(&mut SourceFd(fd), Token(*fd as usize), *bits);
            if let Err(e) = result {
                // best effort, the registration error is the one worth reporting
                let _ = self.deregister(&registered);
                return Err(e);
            }
            registered.push(*fd);
        }

        let polled = self.poll.poll(&mut self.events, Some(timeout));
        let deregistered = self.deregister(&registered);
        polled?;
        deregistered?;

        let mut ready = FdSets::default();
        for event in &self.events {
            let fd = event.token().0 as RawFd;
            let readable = event.is_readable() || event.is_read_closed() || event.is_error();
            let writable = event.is_writable() || event.is_write_closed() || event.is_error();

            if readable && interest.contains(Direction::Read, fd) {
                ready.insert(Direction::Read, fd);
            }
            if writable && interest.contains(Direction::Write, fd) {
                ready.insert(Direction::Write, fd);
            }
        }
        Ok(ready)
    }
}
