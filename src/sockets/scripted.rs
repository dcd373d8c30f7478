use crate::sock::make_message_sock;
use crate::sock::MessageSock;
use std::collections::VecDeque;
use std::io::{Error, ErrorKind, Result};
use std::sync::{Arc, Mutex};

make_message_sock!(ScriptedSock {
    replies: Mutex<VecDeque<Vec<u8>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}, "scripted");

impl ScriptedSock {
    pub fn with_replies(replies: Vec<Vec<u8>>) -> Self {
        Self::new(Mutex::new(replies.into()), Arc::new(Mutex::new(Vec::new())))
    }

    /// Shared log of sent messages, kept alive after the socket is boxed.
    pub fn sent_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        self.sent.clone()
    }
}

impl MessageSock for ScriptedSock {
    fn recv(&self) -> Result<Vec<u8>> {
        // A drained script behaves like a signal during a blocking receive
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::from(ErrorKind::Interrupted))
    }

    fn send(&self, message: &[u8]) -> Result<()> {
        self.sent.lock().unwrap().push(message.to_vec());
        Ok(())
    }
}

mod tests {
    #![allow(unused_imports)]

    use super::*;

    #[test]
    fn replays_then_reports_interrupted() {
        let sock = ScriptedSock::with_replies(vec![b"one".to_vec()]);
        assert_eq!(sock.recv().unwrap(), b"one".to_vec());
        assert_eq!(sock.recv().unwrap_err().kind(), ErrorKind::Interrupted);
    }

    #[test]
    fn records_sent_messages() {
        let sock = ScriptedSock::with_replies(Vec::new());
        let log = sock.sent_log();
        sock.send(b"payload").unwrap();
        assert_eq!(*log.lock().unwrap(), vec![b"payload".to_vec()]);
    }
}
