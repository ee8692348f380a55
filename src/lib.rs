#![forbid(unsafe_code)]

#[macro_use]
extern crate educe;

mod config;
mod driver;
mod error;
mod reactor;
mod ready;
mod transfer;

pub use config::HubConfig;
pub use driver::{Driver, SocketDriver, UNSET_FD};
pub use error::{Error, Result, TransferError};
pub use mio::Token;
pub use reactor::{
    io::{Os, Selector},
    timers::Deadline,
    TransferHub,
};
pub use ready::{FdSet, FdSets};
pub use transfer::{DataTransfer, Direction, Status};
