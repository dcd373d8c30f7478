pub mod decorators;
pub use decorators::{TraceHexDecorator, TraceInfoDecorator};

use clap::ValueEnum;
use std::io::Result;

use crate::opts::OptValue;

/// A blocking message socket providing whole-message exchange.
#[allow(unused)]
pub trait MessageSock: Send {
    /// Establishes the socket: create, bind/connect, apply options.
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    /// Tears the socket down.
    fn close(&mut self) {}

    /// Receives one whole message, blocking until it arrives.
    fn recv(&self) -> Result<Vec<u8>>;

    /// Sends one whole message, blocking until it is queued.
    fn send(&self, message: &[u8]) -> Result<()>;
}

pub trait SockInfo {
    fn get_type_name(&self) -> &str;
    fn get_id(&self) -> u32;
    fn get_description(&self) -> String {
        format!("{}{}", self.get_type_name(), self.get_id())
    }
}

pub trait ComplexSock: MessageSock + SockInfo {}

// Any type that impl MessageSock & SockInfo automatically
// implements ComplexSock
impl<T: MessageSock + SockInfo> ComplexSock for T {}

/// Messaging pattern of the socket, as understood by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum SockType {
    Push,
    Pull,
    Pub,
    Sub,
    Req,
    Rep,
    Pair,
}

impl SockType {
    pub fn name(&self) -> &'static str {
        match self {
            SockType::Push => "PUSH",
            SockType::Pull => "PULL",
            SockType::Pub => "PUB",
            SockType::Sub => "SUB",
            SockType::Req => "REQ",
            SockType::Rep => "REP",
            SockType::Pair => "PAIR",
        }
    }

    /// Whether the pattern can receive in plain read mode.
    pub fn can_recv(&self) -> bool {
        matches!(self, SockType::Pull | SockType::Sub | SockType::Pair)
    }

    /// Whether the pattern can send in plain write mode.
    pub fn can_send(&self) -> bool {
        matches!(self, SockType::Push | SockType::Pub | SockType::Pair)
    }

    /// Request/reply patterns run the alternation loop instead of a mode.
    pub fn is_reqrep(&self) -> bool {
        matches!(self, SockType::Req | SockType::Rep)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Bind,
    Connect,
}

/// Immutable socket recipe assembled from the command line.
pub struct SockConfig {
    pub sock_type: SockType,
    pub behavior: Behavior,
    pub addresses: Vec<String>,
    pub options: Vec<(i32, OptValue)>,
}

macro_rules! make_message_sock {
    ($name: ident { $($field:ident : $t:ty),* $(,)? }, $stype: expr $(, $self_ident: ident, $sock_descr: block)?) => {
        paste::paste! {
            use crate::sock::SockInfo;
            use std::sync::atomic::AtomicU32 as IdAtomic;
            use std::sync::atomic::Ordering as IdOrdering;
            #[allow(non_upper_case_globals)]
            static [<$name _id>]: IdAtomic = IdAtomic::new(0);
            pub struct $name {
                stype: String,
                id: u32,
                $($field: $t),*
            }
            impl $name {
                pub fn new($($field: $t),*) -> Self {
                    Self {
                        id: [<$name _id>].fetch_add(1, IdOrdering::Relaxed),
                        stype: $stype.to_string(),
                        $($field),*
                    }
                }
            }
            impl SockInfo for $name {
                fn get_type_name(&self) -> &str {
                    self.stype.as_str()
                }
                fn get_id(&self) -> u32 {
                    self.id
                }
                $(
                    fn get_description(&$self_ident) -> String {
                        $sock_descr
                    }
                )?
            }
        }
    };
}
pub(crate) use make_message_sock;

mod tests {
    #![allow(unused_imports)]

    use super::SockType;

    #[test]
    fn direction_matrix() {
        assert!(SockType::Push.can_send() && !SockType::Push.can_recv());
        assert!(SockType::Pull.can_recv() && !SockType::Pull.can_send());
        assert!(SockType::Pub.can_send() && !SockType::Pub.can_recv());
        assert!(SockType::Sub.can_recv() && !SockType::Sub.can_send());
        assert!(SockType::Pair.can_send() && SockType::Pair.can_recv());
        assert!(SockType::Req.is_reqrep() && SockType::Rep.is_reqrep());
    }
}
