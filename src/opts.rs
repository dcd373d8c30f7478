use serde::Serialize;
use std::io::{Error, ErrorKind, Result};

use crate::sock::SockType;

/// Value class of a socket option, mirroring the two libzmq classification
/// sets: options taking a signed integer and options taking raw bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptKind {
    Int,
    Bytes,
}

/// A coerced option value, ready to apply to a socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptValue {
    Int(i64),
    Bytes(Vec<u8>),
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct OptSpec {
    pub name: &'static str,
    pub code: i32,
    pub kind: OptKind,
}

macro_rules! sockopt_table {
    ($($name:ident = $code:literal => $kind:ident),* $(,)?) => {
        paste::paste! {
            $(
                pub const [<ZMQ_ $name>]: i32 = $code;
            )*
            pub static SOCK_OPTS: &[OptSpec] = &[
                $(
                    OptSpec {
                        name: stringify!($name),
                        code: [<ZMQ_ $name>],
                        kind: OptKind::$kind,
                    },
                )*
            ];
        }
    };
}

// Codes are the libzmq ABI values, see zmq.h
sockopt_table!(
    AFFINITY = 4 => Int,
    IDENTITY = 5 => Bytes,
    SUBSCRIBE = 6 => Bytes,
    UNSUBSCRIBE = 7 => Bytes,
    RATE = 8 => Int,
    RECOVERY_IVL = 9 => Int,
    SNDBUF = 11 => Int,
    RCVBUF = 12 => Int,
    LINGER = 17 => Int,
    RECONNECT_IVL = 18 => Int,
    BACKLOG = 19 => Int,
    RECONNECT_IVL_MAX = 21 => Int,
    MAXMSGSIZE = 22 => Int,
    SNDHWM = 23 => Int,
    RCVHWM = 24 => Int,
    MULTICAST_HOPS = 25 => Int,
    RCVTIMEO = 27 => Int,
    SNDTIMEO = 28 => Int,
    TCP_KEEPALIVE = 34 => Int,
    TCP_KEEPALIVE_CNT = 35 => Int,
    TCP_KEEPALIVE_IDLE = 36 => Int,
    TCP_KEEPALIVE_INTVL = 37 => Int,
    IMMEDIATE = 39 => Int,
    IPV6 = 42 => Int,
    PLAIN_USERNAME = 45 => Bytes,
    PLAIN_PASSWORD = 46 => Bytes,
    CONFLATE = 54 => Int,
    ZAP_DOMAIN = 55 => Bytes,
    TOS = 57 => Int,
);

/// Looks up an option by name, with an optional ZMQ_ prefix.
pub fn lookup(name: &str) -> Option<&'static OptSpec> {
    let bare = name.strip_prefix("ZMQ_").unwrap_or(name);
    SOCK_OPTS.iter().find(|spec| spec.name == bare)
}

fn split_spec(spec: &str) -> Result<(&str, &str)> {
    let well_formed = |name: &str| {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_')
    };
    match spec.split_once('=') {
        Some((name, value)) if well_formed(name) => Ok((name, value)),
        _ => Err(Error::new(
            ErrorKind::InvalidInput,
            format!("Invalid option spec: '{spec}'"),
        )),
    }
}

/// Turns a list of 'NAME=VALUE' specs into the ordered list of
/// (option code, coerced value) assignments for `sock_type`.
///
/// A SUB socket with no explicit SUBSCRIBE assignment gets an implicit
/// subscription to the empty prefix, so it receives everything.
pub fn resolve(specs: &[String], sock_type: SockType) -> Result<Vec<(i32, OptValue)>> {
    let mut options = Vec::with_capacity(specs.len() + 1);
    for spec in specs {
        let (name, value) = split_spec(spec)?;
        let opt = lookup(name).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("Unrecognised socket option: '{name}'"),
            )
        })?;
        let value = match opt.kind {
            OptKind::Int => OptValue::Int(value.parse().map_err(|_| {
                Error::new(
                    ErrorKind::InvalidInput,
                    format!("Invalid value for option {}: '{value}'", opt.name),
                )
            })?),
            OptKind::Bytes => OptValue::Bytes(value.as_bytes().to_vec()),
        };
        options.push((opt.code, value));
    }

    if sock_type == SockType::Sub && !options.iter().any(|(code, _)| *code == ZMQ_SUBSCRIBE) {
        options.push((ZMQ_SUBSCRIBE, OptValue::Bytes(Vec::new())));
    }
    Ok(options)
}

/// Renders the option table for `--list-options`.
pub fn describe() -> String {
    serde_json::to_string_pretty(SOCK_OPTS).unwrap()
}

mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::sock::SockType;

    fn specs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prefix_does_not_change_code() {
        let plain = resolve(&specs(&["LINGER=0"]), SockType::Push).unwrap();
        let prefixed = resolve(&specs(&["ZMQ_LINGER=0"]), SockType::Push).unwrap();
        assert_eq!(plain, prefixed);
        assert_eq!(plain, vec![(ZMQ_LINGER, OptValue::Int(0))]);
    }

    #[test]
    fn int_values_round_trip() {
        let options = resolve(
            &specs(&["LINGER=0", "LINGER=-1", "LINGER=50"]),
            SockType::Push,
        )
        .unwrap();
        assert_eq!(
            options,
            vec![
                (ZMQ_LINGER, OptValue::Int(0)),
                (ZMQ_LINGER, OptValue::Int(-1)),
                (ZMQ_LINGER, OptValue::Int(50)),
            ]
        );
    }

    #[test]
    fn bytes_values_pass_through() {
        let options = resolve(&specs(&["SUBSCRIBE=", "SUBSCRIBE=abc"]), SockType::Sub).unwrap();
        assert_eq!(
            options,
            vec![
                (ZMQ_SUBSCRIBE, OptValue::Bytes(Vec::new())),
                (ZMQ_SUBSCRIBE, OptValue::Bytes(b"abc".to_vec())),
            ]
        );
    }

    #[test]
    fn non_numeric_int_value_is_rejected() {
        let err = resolve(&specs(&["LINGER=foo"]), SockType::Push).unwrap_err();
        assert!(err.to_string().contains("Invalid value for option LINGER"));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = resolve(&specs(&["NONEXISTENTOPTION=blah"]), SockType::Push).unwrap_err();
        assert!(err.to_string().contains("Unrecognised socket option"));
    }

    #[test]
    fn malformed_spec_is_rejected() {
        assert!(resolve(&specs(&["no-equals"]), SockType::Push).is_err());
        assert!(resolve(&specs(&["lower=1"]), SockType::Push).is_err());
        assert!(resolve(&specs(&["=1"]), SockType::Push).is_err());
    }

    #[test]
    fn sub_without_subscribe_gets_implicit_one() {
        let options = resolve(&specs(&["LINGER=0"]), SockType::Sub).unwrap();
        assert_eq!(
            options.last(),
            Some(&(ZMQ_SUBSCRIBE, OptValue::Bytes(Vec::new())))
        );
    }

    #[test]
    fn sub_with_explicit_subscribe_is_untouched() {
        let options = resolve(&specs(&["SUBSCRIBE=A"]), SockType::Sub).unwrap();
        assert_eq!(options, vec![(ZMQ_SUBSCRIBE, OptValue::Bytes(b"A".to_vec()))]);
    }

    #[test]
    fn other_types_get_no_implicit_subscribe() {
        assert!(resolve(&[], SockType::Pull).unwrap().is_empty());
    }

    #[test]
    fn describe_lists_the_table() {
        let listing = describe();
        assert!(listing.contains("SUBSCRIBE"));
        assert!(listing.contains("\"code\": 6"));
    }
}
