use std::{
    io::{Read, Write},
    os::unix::{
        io::{AsRawFd, IntoRawFd},
        net::UnixStream,
    },
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use transfer_hub::{
    DataTransfer, Direction, HubConfig, SocketDriver, Status, Token, TransferHub, UNSET_FD,
};

fn pair() -> (UnixStream, UnixStream) {
    let (a, b) = UnixStream::pair().unwrap();
    a.set_nonblocking(true).unwrap();
    b.set_nonblocking(true).unwrap();
    (a, b)
}

fn driver() -> Arc<SocketDriver> {
    Arc::new(SocketDriver)
}

#[test]
fn reads_what_was_written() {
    let (mut a, b) = pair();
    a.write_all(b"hello world").unwrap();

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::reader(driver(), b.as_raw_fd(), vec![0; 11]).op_timeout_ms(1000),
    );
    hub.wait();

    let transfer = hub.get(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Completed);
    assert_eq!(transfer.data(), b"hello world");
}

#[test]
fn satisfied_once_min_len_arrives() {
    let (mut a, b) = pair();

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::reader(driver(), b.as_raw_fd(), vec![0; 16])
            .min_len(4)
            .op_timeout_ms(1000),
    );

    let writer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        a.write_all(b"abcd").unwrap();
        a
    });
    hub.wait();
    let _a = writer.join().unwrap();

    let transfer = hub.get(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Completed);
    assert_eq!(transfer.transferred(), 4);
    assert_eq!(transfer.data(), b"abcd");
}

#[test]
fn silent_peer_times_out() {
    let (_a, b) = pair();

    let mut hub = TransferHub::new().unwrap();
    let start = Instant::now();
    hub.add(
        Token(1),
        DataTransfer::reader(driver(), b.as_raw_fd(), vec![0; 8]).op_timeout_ms(50),
    );
    hub.wait();

    let transfer = hub.get(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Failed);
    assert_eq!(transfer.error_message(), "timeout occurred");

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
}

#[test]
fn closed_peer_fails() {
    let (a, b) = pair();
    drop(a);

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::reader(driver(), b.as_raw_fd(), vec![0; 8]),
    );
    hub.wait();

    let transfer = hub.get(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Failed);
    assert_eq!(
        transfer.error_message(),
        "cannot read data: remote side closed connection"
    );
}

#[test]
fn zero_min_len_completes_on_readiness() {
    let (_a, b) = pair();

    let mut hub = TransferHub::new().unwrap();
    let mut transfer = DataTransfer::writer(driver(), b.as_raw_fd(), vec![7; 8]).min_len(0);
    transfer.max_len = 0;
    hub.add(Token(1), transfer);
    hub.wait();

    let transfer = hub.get(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Completed);
    assert_eq!(transfer.transferred(), 0);
}

#[test]
fn ready_writer_leaves_idle_reader_alone() {
    let (mut a, b) = pair();
    let (_c, d) = pair();

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::writer(driver(), b.as_raw_fd(), b"ping".to_vec()),
    );
    hub.add(
        Token(2),
        DataTransfer::reader(driver(), d.as_raw_fd(), vec![0; 4]).op_timeout_ms(0),
    );
    hub.wait();

    assert_eq!(hub.get(Token(1)).unwrap().status(), Status::Completed);
    let reader = hub.get(Token(2)).unwrap();
    assert_eq!(reader.status(), Status::Pending);
    assert_eq!(reader.transferred(), 0);
    assert_eq!(reader.direction, Direction::Read);

    let mut received = [0; 4];
    a.read_exact(&mut received).unwrap();
    assert_eq!(&received, b"ping");
}

#[test]
fn exchange_larger_than_socket_buffer() {
    let (a, b) = pair();
    let payload: Vec<u8> = (0..1 << 20).map(|i| (i % 251) as u8).collect();

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::writer(driver(), a.as_raw_fd(), payload.clone()).op_timeout_ms(1000),
    );
    hub.add(
        Token(2),
        DataTransfer::reader(driver(), b.as_raw_fd(), vec![0; payload.len()]).op_timeout_ms(1000),
    );

    let mut rounds = 0;
    while hub.iter().any(|(_, t)| t.status() == Status::Pending) {
        hub.wait();
        rounds += 1;
        assert!(rounds <= 2, "wait returned without a status change");
    }

    assert_eq!(hub.get(Token(1)).unwrap().status(), Status::Completed);
    let reader = hub.get(Token(2)).unwrap();
    assert_eq!(reader.status(), Status::Completed);
    assert_eq!(reader.data(), &payload[..]);
}

#[test]
fn removed_transfer_keeps_descriptor_until_disconnected() {
    let (_a, b) = pair();
    let fd = b.into_raw_fd();

    let mut hub = TransferHub::new().unwrap();
    hub.add(
        Token(1),
        DataTransfer::reader(driver(), fd, vec![0; 4]).op_timeout_ms(10),
    );
    hub.wait();

    let mut transfer = hub.remove(Token(1)).unwrap();
    assert_eq!(transfer.status(), Status::Failed);
    assert_eq!(transfer.fd, fd);

    // still open, so it can be registered again
    hub.add(Token(1), transfer);
    transfer = hub.remove(Token(1)).unwrap();
    assert!(hub.is_empty());

    transfer.disconnect();
    assert_eq!(transfer.fd, UNSET_FD);
}

#[test]
fn every_ready_transfer_progresses_in_one_round() {
    let pairs: Vec<_> = (0..32).map(|_| pair()).collect();

    let config = HubConfig::default().event_capacity(4);
    let mut hub = TransferHub::with_config(config).unwrap();
    for (i, (a, _)) in pairs.iter().enumerate() {
        hub.add(
            Token(i),
            DataTransfer::writer(driver(), a.as_raw_fd(), vec![1; 4]).op_timeout_ms(1),
        );
    }

    // every deadline has passed, only readiness saves them
    thread::sleep(Duration::from_millis(5));
    hub.wait();

    let completed = hub
        .iter()
        .filter(|(_, t)| t.status() == Status::Completed)
        .count();
    assert_eq!(completed, pairs.len());
}
