use std::{io, os::unix::io::RawFd};

use nix::unistd;

/// Descriptor value meaning "no endpoint".
pub const UNSET_FD: RawFd = -1;

/// Moves bytes on a descriptor on behalf of a transfer.
///
/// `read` and `write` move at most `buf.len()` bytes and return how many
/// actually moved. An error of kind [`io::ErrorKind::WouldBlock`] means the
/// descriptor had nothing to offer after all, and the hub simply tries again
/// later. Any other error fails the transfer, with the error's text as the
/// failure message.
pub trait Driver {
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;

    /// Close the endpoint, leaving `fd` set to [`UNSET_FD`].
    /// The hub never calls this itself. The caller must own `fd`.
    fn disconnect(&self, fd: &mut RawFd);
}

/// Driver for plain non-blocking descriptors: sockets, pipes.
///
/// Stateless, construct one wherever it is needed. The descriptor must be
/// pollable: regular files are refused by epoll, which the hub cannot
/// recover from.
///
/// `disconnect` closes the raw descriptor, so it must only be used on
/// descriptors nothing else owns, such as ones obtained through
/// [`IntoRawFd`](std::os::unix::io::IntoRawFd).
#[derive(Debug, Default, Clone, Copy)]
pub struct SocketDriver;

impl Driver for SocketDriver {
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        assert!(!buf.is_empty(), "zero length read");
        match unistd::read(fd, buf).map_err(io::Error::from) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "cannot read data: remote side closed connection",
            )),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(e),
            Err(e) => Err(io::Error::new(e.kind(), format!("cannot read data: {e}"))),
        }
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        assert!(!buf.is_empty(), "zero length write");
        match unistd::write(fd, buf).map_err(io::Error::from) {
            Ok(0) => Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "cannot send data: remote side closed connection",
            )),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(e),
            Err(e) => Err(io::Error::new(e.kind(), format!("cannot send data: {e}"))),
        }
    }

    fn disconnect(&self, fd: &mut RawFd) {
        if *fd == UNSET_FD {
            return;
        }
        // nothing useful to do if close fails, the descriptor is gone either way
        let _ = unistd::close(*fd);
        *fd = UNSET_FD;
    }
}
