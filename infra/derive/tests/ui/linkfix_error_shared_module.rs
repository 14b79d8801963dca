use linkfix_derive::linkfix_error;
use std::borrow::Cow;

#[linkfix_error]
pub enum ReadError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

#[linkfix_error]
pub enum ParseError {
    #[error("Bad number{}: {source}", format_context(.context))]
    Number { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Read failed{}: {source}", format_context(.context))]
    Read { source: ReadError, context: Option<Cow<'static, str>> },
}

fn main() {
    let err = ParseError::from(ReadError::from(std::io::Error::other("gone")));
    assert_eq!(err.to_string(), "Read failed: IO error: gone");
}
