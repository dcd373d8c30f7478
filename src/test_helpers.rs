use crate::opts::{OptValue, ZMQ_RCVTIMEO};
use crate::sock::{Behavior, MessageSock, SockConfig, SockType};
use crate::sockets::zeromq::ZmqSock;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub fn config(
    sock_type: SockType,
    behavior: Behavior,
    addr: &str,
    options: Vec<(i32, OptValue)>,
) -> SockConfig {
    SockConfig {
        sock_type,
        behavior,
        addresses: vec![addr.to_string()],
        options,
    }
}

pub fn msgs(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

/// Opens a socket on `addr` and sends every message after a settling pause
/// (fresh pub/sub endpoints drop messages until the peer is wired up).
pub fn spawn_feeder(
    sock_type: SockType,
    behavior: Behavior,
    addr: &str,
    messages: Vec<Vec<u8>>,
) -> JoinHandle<io::Result<()>> {
    let config = config(sock_type, behavior, addr, Vec::new());
    thread::spawn(move || -> io::Result<()> {
        let mut sock = ZmqSock::new(config, None);
        sock.open()?;
        thread::sleep(Duration::from_millis(500));
        for message in &messages {
            sock.send(message)?;
        }
        // Let the peer drain before the context tears down
        thread::sleep(Duration::from_millis(500));
        sock.close();
        Ok(())
    })
}

/// PULL endpoint collecting exactly `count` messages.
pub fn spawn_collector(addr: &str, count: usize) -> JoinHandle<io::Result<Vec<Vec<u8>>>> {
    let config = config(
        SockType::Pull,
        Behavior::Bind,
        addr,
        vec![(ZMQ_RCVTIMEO, OptValue::Int(5000))],
    );
    thread::spawn(move || -> io::Result<Vec<Vec<u8>>> {
        let mut sock = ZmqSock::new(config, None);
        sock.open()?;
        let mut received = Vec::with_capacity(count);
        for _ in 0..count {
            received.push(sock.recv()?);
        }
        sock.close();
        Ok(received)
    })
}

/// REP endpoint echoing back `cycles` requests.
pub fn spawn_rep_echo(addr: &str, cycles: usize) -> JoinHandle<io::Result<()>> {
    let config = config(
        SockType::Rep,
        Behavior::Bind,
        addr,
        vec![(ZMQ_RCVTIMEO, OptValue::Int(5000))],
    );
    thread::spawn(move || -> io::Result<()> {
        let mut sock = ZmqSock::new(config, None);
        sock.open()?;
        for _ in 0..cycles {
            let request = sock.recv()?;
            sock.send(&request)?;
        }
        sock.close();
        Ok(())
    })
}
