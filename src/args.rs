use crate::modes::Command;
use crate::modes::pipe::{LoopKind, PipeMode, PipeModeCommand, PipeModeParamsBuilder};
use crate::opts;
use crate::sock::{Behavior, ComplexSock, SockConfig, SockType, TraceHexDecorator, TraceInfoDecorator};
use crate::sockets::zeromq::ZmqSock;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

use std::process;

#[derive(Parser)]
#[command(
    name = "zmqpipe",
    version,
    about = "Pipe interface to ZeroMQ sockets: create a socket of a given \
             type, bind or connect it to one or more addresses, set options \
             on it, and exchange messages with standard I/O, in the shell or \
             in scripts."
)]
pub struct ZmqPipeArgs {
    /// Delimit messages on input/output with NUL bytes instead of newlines.
    /// Use this if your messages may contain newlines and you want to avoid
    /// ambiguous message borders.
    #[arg(short = '0', long = "null")]
    null_delimiter: bool,

    /// Receive/send only NUM messages (whole request/reply cycles for REQ
    /// and REP sockets), then exit. By default the loop runs until the end
    /// of input in write mode, or forever in read mode.
    #[arg(short = 'n', value_name = "NUM")]
    number: Option<u64>,

    /// Read messages from the socket onto stdout.
    #[arg(short, long, group = "mode")]
    read: bool,

    /// Write messages from stdin to the socket.
    #[arg(short, long, group = "mode")]
    write: bool,

    /// Bind to the specified address(es).
    #[arg(short, long, group = "behavior")]
    bind: bool,

    /// Connect to the specified address(es).
    #[arg(short, long, group = "behavior")]
    connect: bool,

    /// Socket option to set on the created socket, as NAME=VALUE. The ZMQ_
    /// prefix may be omitted from the name. If the created socket is of type
    /// SUB and no SUBSCRIBE options are given, the socket is automatically
    /// subscribed to everything.
    #[arg(short = 'o', long = "option", value_name = "NAME=VALUE")]
    options: Vec<String>,

    /// Log socket lifecycle and message provenance to stderr.
    #[arg(long)]
    trace_info: bool,

    /// Log a hex dump of every message payload to stderr.
    #[arg(long)]
    trace_hex: bool,

    /// Print the supported socket options as JSON and exit.
    #[arg(long)]
    list_options: bool,

    /// Which type of socket to create. PUSH and PUB sockets only write,
    /// PULL and SUB sockets only read, PAIR sockets do either, REQ and REP
    /// sockets alternate between the two on their own.
    #[arg(
        value_name = "SOCK_TYPE",
        value_enum,
        ignore_case = true,
        required_unless_present = "list_options"
    )]
    sock_type: Option<SockType>,

    /// One or more addresses to bind/connect to, in ZMQ endpoint format
    /// (e.g. 'tcp://127.0.0.1:5000').
    #[arg(value_name = "address", required_unless_present = "list_options")]
    addresses: Vec<String>,
}

impl ZmqPipeArgs {
    pub fn get_scenario() -> Box<dyn Command> {
        let args = Self::parse();
        args.init_logging();

        if args.list_options {
            println!("{}", opts::describe());
            process::exit(0);
        }

        let sock_type = args.sock_type.unwrap_or_else(|| {
            Self::usage_error(ErrorKind::MissingRequiredArgument, "SOCK_TYPE is required")
        });
        let kind = args
            .loop_kind()
            .unwrap_or_else(|message| Self::usage_error(ErrorKind::ArgumentConflict, &message));
        let behavior = args
            .behavior()
            .unwrap_or_else(|message| Self::usage_error(ErrorKind::MissingRequiredArgument, &message));
        let options = opts::resolve(&args.options, sock_type)
            .unwrap_or_else(|e| Self::usage_error(ErrorKind::InvalidValue, &e.to_string()));

        let config = SockConfig {
            sock_type,
            behavior,
            addresses: args.addresses.clone(),
            options,
        };
        let mut sock: Box<dyn ComplexSock> = Box::new(ZmqSock::new(config, None));
        // Lifecycle events must be logged before payload dumps
        if args.trace_info {
            sock = TraceInfoDecorator::new(sock);
        }
        if args.trace_hex {
            sock = TraceHexDecorator::new(sock);
        }

        let params = PipeModeParamsBuilder::default()
            .delimiter(if args.null_delimiter { 0 } else { b'\n' })
            .count(args.number)
            .kind(kind)
            .build()
            .unwrap_or_else(|e| {
                eprintln!("Pipe command parameters building failed: {e}");
                process::exit(1)
            });

        Box::new(PipeModeCommand::new(PipeMode::new(sock, params)))
    }

    fn init_logging(&self) {
        let mut builder = env_logger::Builder::from_default_env();
        if self.trace_hex {
            builder.filter_level(log::LevelFilter::Trace);
        } else if self.trace_info {
            builder.filter_level(log::LevelFilter::Debug);
        }
        builder.init();
    }

    fn usage_error(kind: ErrorKind, message: &str) -> ! {
        Self::command().error(kind, message).exit()
    }

    /// Picks the loop strategy, enforcing the direction matrix: the chosen
    /// mode must fall inside the socket type's capability set, and REQ/REP
    /// types select their alternation loop themselves.
    fn loop_kind(&self) -> Result<LoopKind, String> {
        let Some(sock_type) = self.sock_type else {
            return Err("SOCK_TYPE is required".to_string());
        };

        if sock_type.is_reqrep() {
            if self.read || self.write {
                return Err(format!(
                    "Explicit --read/--write modes are not allowed for {} sockets",
                    sock_type.name()
                ));
            }
            return Ok(match sock_type {
                SockType::Req => LoopKind::Request,
                _ => LoopKind::Reply,
            });
        }

        if self.read && !sock_type.can_recv() {
            return Err(format!("Cannot read from a {} socket", sock_type.name()));
        }
        if self.write && !sock_type.can_send() {
            return Err(format!("Cannot write to a {} socket", sock_type.name()));
        }
        if self.read {
            Ok(LoopKind::Read)
        } else if self.write {
            Ok(LoopKind::Write)
        } else {
            Err(format!(
                "One of --read or --write is required for {} sockets",
                sock_type.name()
            ))
        }
    }

    fn behavior(&self) -> Result<Behavior, String> {
        match (self.bind, self.connect) {
            (true, false) => Ok(Behavior::Bind),
            (false, true) => Ok(Behavior::Connect),
            _ => Err("Exactly one of --bind or --connect is required".to_string()),
        }
    }
}

mod tests {
    #![allow(unused_imports)]

    use super::*;

    fn parse(argv: &[&str]) -> ZmqPipeArgs {
        ZmqPipeArgs::try_parse_from(argv.iter().copied()).unwrap()
    }

    #[test]
    fn read_and_write_conflict() {
        assert!(
            ZmqPipeArgs::try_parse_from(["zmqpipe", "-r", "-w", "-c", "PULL", "tcp://x"]).is_err()
        );
    }

    #[test]
    fn bind_and_connect_conflict() {
        assert!(
            ZmqPipeArgs::try_parse_from(["zmqpipe", "-r", "-b", "-c", "PULL", "tcp://x"]).is_err()
        );
    }

    #[test]
    fn addresses_are_required() {
        assert!(ZmqPipeArgs::try_parse_from(["zmqpipe", "-r", "-c", "PULL"]).is_err());
    }

    #[test]
    fn list_options_needs_no_socket() {
        let args = parse(&["zmqpipe", "--list-options"]);
        assert!(args.list_options);
        assert!(args.sock_type.is_none());
    }

    #[test]
    fn sock_type_is_case_insensitive() {
        assert_eq!(parse(&["zmqpipe", "-r", "-c", "pull", "tcp://x"]).sock_type, Some(SockType::Pull));
        assert_eq!(parse(&["zmqpipe", "-r", "-c", "PULL", "tcp://x"]).sock_type, Some(SockType::Pull));
    }

    #[test]
    fn plain_modes_map_to_loops() {
        let args = parse(&["zmqpipe", "-r", "-c", "SUB", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Read));
        assert_eq!(args.behavior(), Ok(Behavior::Connect));

        let args = parse(&["zmqpipe", "-w", "-b", "PUSH", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Write));
        assert_eq!(args.behavior(), Ok(Behavior::Bind));
    }

    #[test]
    fn direction_violations_are_rejected() {
        let args = parse(&["zmqpipe", "-w", "-c", "SUB", "tcp://x"]);
        assert_eq!(args.loop_kind(), Err("Cannot write to a SUB socket".to_string()));

        let args = parse(&["zmqpipe", "-r", "-c", "PUB", "tcp://x"]);
        assert_eq!(args.loop_kind(), Err("Cannot read from a PUB socket".to_string()));

        let args = parse(&["zmqpipe", "-r", "-c", "PUSH", "tcp://x"]);
        assert!(args.loop_kind().is_err());
    }

    #[test]
    fn pair_requires_an_explicit_mode() {
        let args = parse(&["zmqpipe", "-c", "PAIR", "tcp://x"]);
        assert!(args.loop_kind().is_err());

        let args = parse(&["zmqpipe", "-r", "-c", "PAIR", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Read));
        let args = parse(&["zmqpipe", "-w", "-c", "PAIR", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Write));
    }

    #[test]
    fn reqrep_forbids_modes_and_picks_alternation() {
        let args = parse(&["zmqpipe", "-c", "REQ", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Request));

        let args = parse(&["zmqpipe", "-b", "REP", "tcp://x"]);
        assert_eq!(args.loop_kind(), Ok(LoopKind::Reply));

        let args = parse(&["zmqpipe", "-r", "-c", "REQ", "tcp://x"]);
        assert!(args.loop_kind().is_err());
    }

    #[test]
    fn behavior_is_mandatory() {
        let args = parse(&["zmqpipe", "-r", "PULL", "tcp://x"]);
        assert!(args.behavior().is_err());
    }

    #[test]
    fn multiple_addresses_are_collected() {
        let args = parse(&["zmqpipe", "-r", "-c", "PULL", "tcp://x", "tcp://y"]);
        assert_eq!(args.addresses, vec!["tcp://x".to_string(), "tcp://y".to_string()]);
    }
}
