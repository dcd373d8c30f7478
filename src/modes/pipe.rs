use derive_builder::Builder;
use log::debug;

use crate::framing;
use crate::sock::ComplexSock;
use std::io::{self, BufRead, ErrorKind, Write};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exchange strategy, fixed once at startup from socket type and mode flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopKind {
    Read,
    Write,
    Request,
    Reply,
}

#[derive(Builder)]
pub struct PipeModeParams {
    #[builder(default = b'\n')]
    delimiter: u8,
    #[builder(default)]
    count: Option<u64>,
    kind: LoopKind,
}

/// Outcome of one primitive exchange step. `Stop` covers every clean
/// termination: end of input, broken output pipe, interrupted call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

fn read_one(sock: &dyn ComplexSock, output: &mut impl Write, delimiter: u8) -> io::Result<Flow> {
    let message = match sock.recv() {
        Ok(message) => message,
        Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(Flow::Stop),
        Err(e) => return Err(e),
    };
    match framing::write_frame(output, &message, delimiter) {
        Ok(()) => Ok(Flow::Continue),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(Flow::Stop),
        Err(e) => Err(e),
    }
}

fn write_one(sock: &dyn ComplexSock, input: &mut impl BufRead, delimiter: u8) -> io::Result<Flow> {
    let message = match framing::read_frame(input, delimiter) {
        Ok(Some(message)) => message,
        Ok(None) => return Ok(Flow::Stop),
        Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(Flow::Stop),
        Err(e) => return Err(e),
    };
    match sock.send(&message) {
        Ok(()) => Ok(Flow::Continue),
        Err(e) if e.kind() == ErrorKind::Interrupted => Ok(Flow::Stop),
        Err(e) => Err(e),
    }
}

pub struct PipeMode {
    sock: Box<dyn ComplexSock>,
    params: PipeModeParams,
    stop: Arc<AtomicBool>,
}

impl PipeMode {
    pub fn new(sock: Box<dyn ComplexSock>, params: PipeModeParams) -> Self {
        Self {
            sock,
            params,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag checked at iteration boundaries; the interrupt handler
    /// flips it.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn run(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<()> {
        self.sock.open()?;
        debug!(
            "{:?} loop started over {}",
            self.params.kind,
            self.sock.get_description()
        );
        let result = self.drive(input, output);
        self.sock.close();
        result
    }

    fn drive(&mut self, input: &mut impl BufRead, output: &mut impl Write) -> io::Result<()> {
        let delimiter = self.params.delimiter;
        let mut remaining = self.params.count;

        while self.next_iteration(&mut remaining) {
            let flow = match self.params.kind {
                LoopKind::Read => read_one(self.sock.as_ref(), output, delimiter)?,
                LoopKind::Write => write_one(self.sock.as_ref(), input, delimiter)?,
                LoopKind::Request => match write_one(self.sock.as_ref(), input, delimiter)? {
                    Flow::Stop => Flow::Stop,
                    Flow::Continue => read_one(self.sock.as_ref(), output, delimiter)?,
                },
                LoopKind::Reply => match read_one(self.sock.as_ref(), output, delimiter)? {
                    Flow::Stop => Flow::Stop,
                    Flow::Continue => write_one(self.sock.as_ref(), input, delimiter)?,
                },
            };
            if flow == Flow::Stop {
                break;
            }
        }
        Ok(())
    }

    fn next_iteration(&self, remaining: &mut Option<u64>) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return false;
        }
        match remaining {
            Some(0) => false,
            Some(left) => {
                *left -= 1;
                true
            }
            None => true,
        }
    }
}

pub struct PipeModeCommand {
    mode: PipeMode,
}

impl PipeModeCommand {
    pub fn new(mode: PipeMode) -> Self {
        Self { mode }
    }
}

impl super::Command for PipeModeCommand {
    fn execute(&mut self) {
        let stop = self.mode.stop_flag();
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            eprintln!("Interrupt handler installation failed: {e}");
            process::exit(1);
        }

        let mut input = io::stdin().lock();
        let mut output = io::stdout().lock();
        if let Err(e) = self.mode.run(&mut input, &mut output) {
            eprintln!("Socket exchange failed: {e}");
            process::exit(1);
        }
    }
}

mod tests {
    #![allow(unused_imports)]

    use super::*;
    use crate::opts::{OptValue, ZMQ_RCVTIMEO};
    use crate::sock::{Behavior, SockType};
    use crate::sockets::scripted::ScriptedSock;
    use crate::sockets::zeromq::ZmqSock;
    use crate::test_helpers::*;
    use std::io::Cursor;

    fn params(kind: LoopKind) -> PipeModeParamsBuilder {
        let mut builder = PipeModeParamsBuilder::default();
        builder.kind(kind);
        builder
    }

    fn run_scripted(
        replies: &[&str],
        input: &str,
        params: PipeModeParams,
    ) -> (Vec<u8>, Vec<Vec<u8>>) {
        let sock = ScriptedSock::with_replies(msgs(replies));
        let sent = sock.sent_log();
        let mut mode = PipeMode::new(Box::new(sock), params);
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(input.as_bytes().to_vec()), &mut output)
            .unwrap();
        let sent = sent.lock().unwrap().clone();
        (output, sent)
    }

    #[test]
    fn read_loop_frames_every_message() {
        let (output, _) = run_scripted(
            &["one", "two", "three"],
            "",
            params(LoopKind::Read).build().unwrap(),
        );
        assert_eq!(output, b"one\ntwo\nthree\n");
    }

    #[test]
    fn count_limits_processed_messages() {
        let (output, _) = run_scripted(
            &["one", "two", "three", "four", "five"],
            "",
            params(LoopKind::Read).count(Some(2)).build().unwrap(),
        );
        assert_eq!(output, b"one\ntwo\n");
    }

    #[test]
    fn write_loop_sends_each_frame() {
        let (_, sent) = run_scripted(&[], "alpha\nbeta\n", params(LoopKind::Write).build().unwrap());
        assert_eq!(sent, msgs(&["alpha", "beta"]));
    }

    #[test]
    fn trailing_unterminated_record_is_sent() {
        let (_, sent) = run_scripted(&[], "alpha\nbeta", params(LoopKind::Write).build().unwrap());
        assert_eq!(sent, msgs(&["alpha", "beta"]));
    }

    #[test]
    fn nul_delimiter_frames_input() {
        let (_, sent) = run_scripted(
            &[],
            "a b\0c\nd\0",
            params(LoopKind::Write).delimiter(0).build().unwrap(),
        );
        assert_eq!(sent, msgs(&["a b", "c\nd"]));
    }

    #[test]
    fn request_loop_alternates_send_and_recv() {
        let (output, sent) = run_scripted(
            &["R1", "R2"],
            "Q1\nQ2\nQ3\n",
            params(LoopKind::Request).build().unwrap(),
        );
        // The third request goes out, then the drained script interrupts
        assert_eq!(sent, msgs(&["Q1", "Q2", "Q3"]));
        assert_eq!(output, b"R1\nR2\n");
    }

    #[test]
    fn reply_loop_alternates_recv_and_send() {
        let (output, sent) = run_scripted(
            &["Q1", "Q2"],
            "R1\nR2\n",
            params(LoopKind::Reply).build().unwrap(),
        );
        assert_eq!(output, b"Q1\nQ2\n");
        assert_eq!(sent, msgs(&["R1", "R2"]));
    }

    #[test]
    fn request_count_limits_cycles() {
        let (output, sent) = run_scripted(
            &["R1", "R2", "R3"],
            "Q1\nQ2\nQ3\n",
            params(LoopKind::Request).count(Some(1)).build().unwrap(),
        );
        assert_eq!(sent, msgs(&["Q1"]));
        assert_eq!(output, b"R1\n");
    }

    struct BrokenPipeWriter;

    impl Write for BrokenPipeWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn broken_output_pipe_is_clean_termination() {
        let sock = ScriptedSock::with_replies(msgs(&["one", "two"]));
        let mut mode = PipeMode::new(Box::new(sock), params(LoopKind::Read).build().unwrap());
        let mut input = Cursor::new(Vec::new());
        assert!(mode.run(&mut input, &mut BrokenPipeWriter).is_ok());
    }

    #[test]
    fn raised_stop_flag_prevents_iterations() {
        let sock = ScriptedSock::with_replies(msgs(&["one"]));
        let mut mode = PipeMode::new(Box::new(sock), params(LoopKind::Read).build().unwrap());
        mode.stop_flag().store(true, Ordering::Relaxed);
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(Vec::new()), &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn read_loop_bridges_pushpull_endpoints() {
        let addr = "tcp://127.0.0.1:5621";
        let sock = ZmqSock::new(
            config(
                SockType::Pull,
                Behavior::Bind,
                addr,
                vec![(ZMQ_RCVTIMEO, OptValue::Int(5000))],
            ),
            None,
        );
        let feeder = spawn_feeder(
            SockType::Push,
            Behavior::Connect,
            addr,
            msgs(&["one", "two", "three"]),
        );

        let mut mode = PipeMode::new(
            Box::new(sock),
            params(LoopKind::Read).count(Some(3)).build().unwrap(),
        );
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(Vec::new()), &mut output).unwrap();

        assert_eq!(output, b"one\ntwo\nthree\n");
        feeder.join().unwrap().unwrap();
    }

    #[test]
    fn read_loop_prints_published_lines() {
        let addr = "tcp://127.0.0.1:5624";
        let feeder = spawn_feeder(
            SockType::Pub,
            Behavior::Bind,
            addr,
            msgs(&["one", "two", "three"]),
        );

        let mut options = crate::opts::resolve(&[], SockType::Sub).unwrap();
        options.push((ZMQ_RCVTIMEO, OptValue::Int(5000)));
        let sock = ZmqSock::new(config(SockType::Sub, Behavior::Connect, addr, options), None);

        let mut mode = PipeMode::new(
            Box::new(sock),
            params(LoopKind::Read).count(Some(3)).build().unwrap(),
        );
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(Vec::new()), &mut output).unwrap();

        assert_eq!(output, b"one\ntwo\nthree\n");
        feeder.join().unwrap().unwrap();
    }

    #[test]
    fn write_loop_feeds_a_pull_collector() {
        let addr = "tcp://127.0.0.1:5622";
        let collector = spawn_collector(addr, 2);

        let sock = ZmqSock::new(
            config(SockType::Push, Behavior::Connect, addr, Vec::new()),
            None,
        );
        let mut mode = PipeMode::new(Box::new(sock), params(LoopKind::Write).build().unwrap());
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(b"alpha\nbeta\n".to_vec()), &mut output)
            .unwrap();

        assert_eq!(collector.join().unwrap().unwrap(), msgs(&["alpha", "beta"]));
    }

    #[test]
    fn request_loop_round_trips_through_rep_echo() {
        let addr = "tcp://127.0.0.1:5623";
        let echo = spawn_rep_echo(addr, 2);

        let sock = ZmqSock::new(
            config(
                SockType::Req,
                Behavior::Connect,
                addr,
                vec![(ZMQ_RCVTIMEO, OptValue::Int(5000))],
            ),
            None,
        );
        let mut mode = PipeMode::new(Box::new(sock), params(LoopKind::Request).build().unwrap());
        let mut output = Vec::new();
        mode.run(&mut Cursor::new(b"ping\npong\n".to_vec()), &mut output)
            .unwrap();

        assert_eq!(output, b"ping\npong\n");
        echo.join().unwrap().unwrap();
    }
}
