use std::{
    os::unix::{io::IntoRawFd, net::UnixStream},
    sync::Arc,
};

use rand::Rng;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transfer_hub::{DataTransfer, SocketDriver, Status, Token, TransferHub};

const WRITER: Token = Token(0);
const READER: Token = Token(1);

fn main() -> transfer_hub::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (a, b) = UnixStream::pair()?;
    a.set_nonblocking(true)?;
    b.set_nonblocking(true)?;

    let len = rand::thread_rng().gen_range(1..(1 << 20));
    let mut payload = vec![0; len];
    rand::thread_rng().fill(&mut payload[..]);

    let driver = Arc::new(SocketDriver);
    let mut hub = TransferHub::new()?;
    hub.add(
        WRITER,
        DataTransfer::writer(driver.clone(), a.into_raw_fd(), payload.clone()).op_timeout_ms(1000),
    );
    hub.add(
        READER,
        DataTransfer::reader(driver, b.into_raw_fd(), vec![0; len]).op_timeout_ms(1000),
    );

    while hub
        .iter()
        .any(|(_, transfer)| transfer.status() == Status::Pending)
    {
        hub.wait();
        for (token, transfer) in hub.iter() {
            info!(?token, status = ?transfer.status(), bytes = transfer.transferred(), "woke up");
        }
    }

    for (token, mut transfer) in hub.release() {
        match transfer.status() {
            Status::Failed => info!(?token, error = transfer.error_message(), "failed"),
            _ => info!(?token, bytes = transfer.transferred(), "done"),
        }
        if token == READER && transfer.status() == Status::Completed {
            assert_eq!(transfer.data(), &payload[..], "payload corrupted in transit");
        }
        transfer.disconnect();
    }

    Ok(())
}
