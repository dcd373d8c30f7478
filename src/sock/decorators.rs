use super::{ComplexSock, MessageSock, SockInfo};
use log::{debug, trace};
use pretty_hex::{self, PrettyHex};
use std::io::Result;

// Diagnostics go through the logger: stdout is the data channel here.
macro_rules! sock_decorator {
    ($name: ident) => {
        pub struct $name {
            sock: Box<dyn ComplexSock>,
        }
        impl $name {
            pub fn new(sock: Box<dyn ComplexSock>) -> Box<dyn ComplexSock> {
                Box::new(Self { sock })
            }
        }
        impl SockInfo for $name {
            fn get_type_name(&self) -> &str {
                self.sock.get_type_name()
            }
            fn get_id(&self) -> u32 {
                self.sock.get_id()
            }
            fn get_description(&self) -> String {
                self.sock.get_description()
            }
        }
    };
}

sock_decorator!(TraceInfoDecorator);

impl MessageSock for TraceInfoDecorator {
    fn open(&mut self) -> Result<()> {
        debug!("Socket is opened: {}", self.sock.get_description());
        self.sock.open()
    }
    fn close(&mut self) {
        debug!("Socket is closed: {}", self.sock.get_description());
        self.sock.close();
    }
    fn recv(&self) -> Result<Vec<u8>> {
        let res = self.sock.recv();
        if let Ok(message) = &res {
            debug!(
                "Message of {} bytes received from: {}",
                message.len(),
                self.sock.get_description()
            );
        }
        res
    }
    fn send(&self, message: &[u8]) -> Result<()> {
        let res = self.sock.send(message);
        if res.is_ok() {
            debug!(
                "Message of {} bytes sent to: {}",
                message.len(),
                self.sock.get_description()
            );
        }
        res
    }
}

sock_decorator!(TraceHexDecorator);

impl MessageSock for TraceHexDecorator {
    fn open(&mut self) -> Result<()> {
        self.sock.open()
    }
    fn close(&mut self) {
        self.sock.close();
    }
    fn recv(&self) -> Result<Vec<u8>> {
        let res = self.sock.recv();
        if let Ok(message) = &res {
            trace!("Received message:\n{}", message.hex_dump());
        }
        res
    }
    fn send(&self, message: &[u8]) -> Result<()> {
        trace!("Sending message:\n{}", message.hex_dump());
        self.sock.send(message)
    }
}
