//! RESP wire protocol: the Wire Frame Builder and the Reply Parser.

pub mod frame;
pub mod parser;

pub use frame::{format, format_argv, Arg};
pub use parser::{ParseError, Reply, ReplyParser};
