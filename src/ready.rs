use std::{collections::BTreeSet, os::unix::io::RawFd};

use crate::transfer::Direction;

/// A set of descriptors, the moral equivalent of an `fd_set`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FdSet(BTreeSet<RawFd>);

impl FdSet {
    pub fn insert(&mut self, fd: RawFd) {
        self.0.insert(fd);
    }

    pub fn contains(&self, fd: RawFd) -> bool {
        self.0.contains(&fd)
    }

    /// highest descriptor in the set
    pub fn max(&self) -> Option<RawFd> {
        self.0.last().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<RawFd> for FdSet {
    fn from_iter<I: IntoIterator<Item = RawFd>>(iter: I) -> Self {
        FdSet(iter.into_iter().collect())
    }
}

/// The read and write sets of one selector round.
///
/// Used both for what the hub is interested in and for what the
/// selector reports as ready.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FdSets {
    pub read: FdSet,
    pub write: FdSet,
}

impl FdSets {
    pub fn insert(&mut self, direction: Direction, fd: RawFd) {
        self.set_mut(direction).insert(fd);
    }

    pub fn contains(&self, direction: Direction, fd: RawFd) -> bool {
        self.set(direction).contains(fd)
    }

    pub fn set(&self, direction: Direction) -> &FdSet {
        match direction {
            Direction::Read => &self.read,
            Direction::Write => &self.write,
        }
    }

    fn set_mut(&mut self, direction: Direction) -> &mut FdSet {
        match direction {
            Direction::Read => &mut self.read,
            Direction::Write => &mut self.write,
        }
    }

    /// highest descriptor across both sets
    pub fn max_fd(&self) -> Option<RawFd> {
        self.read.max().max(self.write.max())
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }
}
