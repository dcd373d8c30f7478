use crate::opts::OptValue;
use crate::sock::make_message_sock;
use crate::sock::{Behavior, MessageSock, SockConfig, SockType};
use log::debug;
use std::io::{Error, ErrorKind, Result};

make_message_sock!(ZmqSock {
    config: SockConfig,
    socket: Option<zmq::Socket>,
}, "zmq", self, {
    format!(
        "{}{} ({} {})",
        self.get_type_name(),
        self.get_id(),
        self.config.sock_type.name(),
        self.config.addresses.join(", ")
    )
});

fn raw_type(sock_type: SockType) -> zmq::SocketType {
    match sock_type {
        SockType::Push => zmq::PUSH,
        SockType::Pull => zmq::PULL,
        SockType::Pub => zmq::PUB,
        SockType::Sub => zmq::SUB,
        SockType::Req => zmq::REQ,
        SockType::Rep => zmq::REP,
        SockType::Pair => zmq::PAIR,
    }
}

fn to_io(e: zmq::Error) -> Error {
    let kind = match e {
        zmq::Error::EINTR => ErrorKind::Interrupted,
        zmq::Error::EAGAIN => ErrorKind::WouldBlock,
        _ => ErrorKind::Other,
    };
    Error::new(kind, e.message())
}

fn int32(v: i64) -> Result<i32> {
    i32::try_from(v).map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Option value {v} out of range"),
        )
    })
}

fn uint64(v: i64) -> Result<u64> {
    u64::try_from(v).map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Option value {v} out of range"),
        )
    })
}

fn text(v: &[u8]) -> Result<&str> {
    std::str::from_utf8(v)
        .map_err(|_| Error::new(ErrorKind::InvalidInput, "Option value is not valid UTF-8"))
}

/// Dispatches one (code, value) assignment to the matching typed setter.
fn apply_option(socket: &zmq::Socket, code: i32, value: &OptValue) -> Result<()> {
    use crate::opts::*;

    let res = match (code, value) {
        (ZMQ_AFFINITY, OptValue::Int(v)) => socket.set_affinity(uint64(*v)?),
        (ZMQ_RATE, OptValue::Int(v)) => socket.set_rate(int32(*v)?),
        (ZMQ_RECOVERY_IVL, OptValue::Int(v)) => socket.set_recovery_ivl(int32(*v)?),
        (ZMQ_SNDBUF, OptValue::Int(v)) => socket.set_sndbuf(int32(*v)?),
        (ZMQ_RCVBUF, OptValue::Int(v)) => socket.set_rcvbuf(int32(*v)?),
        (ZMQ_LINGER, OptValue::Int(v)) => socket.set_linger(int32(*v)?),
        (ZMQ_RECONNECT_IVL, OptValue::Int(v)) => socket.set_reconnect_ivl(int32(*v)?),
        (ZMQ_BACKLOG, OptValue::Int(v)) => socket.set_backlog(int32(*v)?),
        (ZMQ_RECONNECT_IVL_MAX, OptValue::Int(v)) => socket.set_reconnect_ivl_max(int32(*v)?),
        (ZMQ_MAXMSGSIZE, OptValue::Int(v)) => socket.set_maxmsgsize(*v),
        (ZMQ_SNDHWM, OptValue::Int(v)) => socket.set_sndhwm(int32(*v)?),
        (ZMQ_RCVHWM, OptValue::Int(v)) => socket.set_rcvhwm(int32(*v)?),
        (ZMQ_MULTICAST_HOPS, OptValue::Int(v)) => socket.set_multicast_hops(int32(*v)?),
        (ZMQ_RCVTIMEO, OptValue::Int(v)) => socket.set_rcvtimeo(int32(*v)?),
        (ZMQ_SNDTIMEO, OptValue::Int(v)) => socket.set_sndtimeo(int32(*v)?),
        (ZMQ_TCP_KEEPALIVE, OptValue::Int(v)) => socket.set_tcp_keepalive(int32(*v)?),
        (ZMQ_TCP_KEEPALIVE_CNT, OptValue::Int(v)) => socket.set_tcp_keepalive_cnt(int32(*v)?),
        (ZMQ_TCP_KEEPALIVE_IDLE, OptValue::Int(v)) => socket.set_tcp_keepalive_idle(int32(*v)?),
        (ZMQ_TCP_KEEPALIVE_INTVL, OptValue::Int(v)) => socket.set_tcp_keepalive_intvl(int32(*v)?),
        (ZMQ_IMMEDIATE, OptValue::Int(v)) => socket.set_immediate(*v != 0),
        (ZMQ_IPV6, OptValue::Int(v)) => socket.set_ipv6(*v != 0),
        (ZMQ_CONFLATE, OptValue::Int(v)) => socket.set_conflate(*v != 0),
        (ZMQ_TOS, OptValue::Int(v)) => socket.set_tos(int32(*v)?),
        (ZMQ_IDENTITY, OptValue::Bytes(v)) => socket.set_identity(v),
        (ZMQ_SUBSCRIBE, OptValue::Bytes(v)) => socket.set_subscribe(v),
        (ZMQ_UNSUBSCRIBE, OptValue::Bytes(v)) => socket.set_unsubscribe(v),
        (ZMQ_ZAP_DOMAIN, OptValue::Bytes(v)) => socket.set_zap_domain(text(v)?),
        (ZMQ_PLAIN_USERNAME, OptValue::Bytes(v)) => socket.set_plain_username(Some(text(v)?)),
        (ZMQ_PLAIN_PASSWORD, OptValue::Bytes(v)) => socket.set_plain_password(Some(text(v)?)),
        _ => {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("No setter for option code {code}"),
            ));
        }
    };
    res.map_err(to_io)
}

impl MessageSock for ZmqSock {
    fn open(&mut self) -> Result<()> {
        let context = zmq::Context::new();
        let socket = context
            .socket(raw_type(self.config.sock_type))
            .map_err(to_io)?;

        for address in &self.config.addresses {
            match self.config.behavior {
                Behavior::Bind => socket.bind(address),
                Behavior::Connect => socket.connect(address),
            }
            .map_err(to_io)?;
            debug!("Endpoint ready: {address}");
        }

        for (code, value) in &self.config.options {
            apply_option(&socket, *code, value)?;
        }

        self.socket = Some(socket);
        Ok(())
    }

    fn close(&mut self) {
        self.socket = None;
    }

    fn recv(&self) -> Result<Vec<u8>> {
        match &self.socket {
            Some(socket) => socket.recv_bytes(0).map_err(to_io),
            None => Err(Error::from(ErrorKind::NotConnected)),
        }
    }

    fn send(&self, message: &[u8]) -> Result<()> {
        match &self.socket {
            Some(socket) => socket.send(message, 0).map_err(to_io),
            None => Err(Error::from(ErrorKind::NotConnected)),
        }
    }
}

mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::opts::{OptValue, ZMQ_RCVTIMEO, ZMQ_SUBSCRIBE};
    use crate::sock::Behavior;
    use crate::test_helpers::*;

    #[test]
    fn pushpull_delivers_in_order() {
        let addr = "tcp://127.0.0.1:5611";
        let mut pull = ZmqSock::new(
            config(
                SockType::Pull,
                Behavior::Bind,
                addr,
                vec![(ZMQ_RCVTIMEO, OptValue::Int(5000))],
            ),
            None,
        );
        pull.open().unwrap();

        let feeder = spawn_feeder(
            SockType::Push,
            Behavior::Connect,
            addr,
            msgs(&["one", "two", "three"]),
        );

        assert_eq!(pull.recv().unwrap(), b"one".to_vec());
        assert_eq!(pull.recv().unwrap(), b"two".to_vec());
        assert_eq!(pull.recv().unwrap(), b"three".to_vec());

        feeder.join().unwrap().unwrap();
        pull.close();
    }

    #[test]
    fn sub_with_default_options_receives_everything() {
        let addr = "tcp://127.0.0.1:5612";
        let feeder = spawn_feeder(
            SockType::Pub,
            Behavior::Bind,
            addr,
            msgs(&["one", "two", "three"]),
        );

        let mut options = crate::opts::resolve(&[], SockType::Sub).unwrap();
        options.push((ZMQ_RCVTIMEO, OptValue::Int(5000)));
        let mut sub = ZmqSock::new(
            config(SockType::Sub, Behavior::Connect, addr, options),
            None,
        );
        sub.open().unwrap();

        assert_eq!(sub.recv().unwrap(), b"one".to_vec());
        assert_eq!(sub.recv().unwrap(), b"two".to_vec());
        assert_eq!(sub.recv().unwrap(), b"three".to_vec());

        feeder.join().unwrap().unwrap();
        sub.close();
    }

    #[test]
    fn sub_with_prefixes_filters_messages() {
        let addr = "tcp://127.0.0.1:5613";
        let feeder = spawn_feeder(
            SockType::Pub,
            Behavior::Bind,
            addr,
            msgs(&["A one", "B two", "C three"]),
        );

        let mut sub = ZmqSock::new(
            config(
                SockType::Sub,
                Behavior::Connect,
                addr,
                vec![
                    (ZMQ_SUBSCRIBE, OptValue::Bytes(b"A".to_vec())),
                    (ZMQ_SUBSCRIBE, OptValue::Bytes(b"B".to_vec())),
                    (ZMQ_RCVTIMEO, OptValue::Int(2000)),
                ],
            ),
            None,
        );
        sub.open().unwrap();

        assert_eq!(sub.recv().unwrap(), b"A one".to_vec());
        assert_eq!(sub.recv().unwrap(), b"B two".to_vec());
        // Nothing else matches, the receive times out
        assert_eq!(sub.recv().unwrap_err().kind(), ErrorKind::WouldBlock);

        feeder.join().unwrap().unwrap();
        sub.close();
    }

    #[test]
    fn sub_with_single_prefix_gets_one_message() {
        let addr = "tcp://127.0.0.1:5615";
        let feeder = spawn_feeder(
            SockType::Pub,
            Behavior::Bind,
            addr,
            msgs(&["A one", "B two", "C three"]),
        );

        let mut sub = ZmqSock::new(
            config(
                SockType::Sub,
                Behavior::Connect,
                addr,
                vec![
                    (ZMQ_SUBSCRIBE, OptValue::Bytes(b"A".to_vec())),
                    (ZMQ_RCVTIMEO, OptValue::Int(2000)),
                ],
            ),
            None,
        );
        sub.open().unwrap();

        assert_eq!(sub.recv().unwrap(), b"A one".to_vec());
        assert_eq!(sub.recv().unwrap_err().kind(), ErrorKind::WouldBlock);

        feeder.join().unwrap().unwrap();
        sub.close();
    }

    #[test]
    fn recv_before_open_is_rejected() {
        let sock = ZmqSock::new(
            config(SockType::Pull, Behavior::Bind, "tcp://127.0.0.1:5614", Vec::new()),
            None,
        );
        assert_eq!(sock.recv().unwrap_err().kind(), ErrorKind::NotConnected);
    }
}
