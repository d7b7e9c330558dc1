use std::fmt;

/// A basic error type from this library.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The buffer ended before a complete field or record could be read.
    Truncated(String),

    /// A label length byte is invalid, or a name has no terminator.
    MalformedName(String),

    /// A compression pointer chain points forward or exceeds the
    /// resolution depth.
    CompressionLoop(String),

    /// An encoded label exceeds 63 bytes.
    LabelTooLong(String),

    /// An encoded name exceeds the 255-byte wire limit.
    NameTooLong(usize),

    /// An answer name is a literal label sequence instead of a
    /// compression pointer. Carries the offset of the offending name.
    UnsupportedAnswerNameEncoding(usize),

    /// A cursor advance or write would pass the end of the shared buffer.
    OutOfBounds(String),

    /// The UDP layer could not produce a packet.
    AllocationFailed(String),

    /// A generic error message.
    Msg(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated(s) => write!(f, "truncated input: {}", s),
            Error::MalformedName(s) => write!(f, "malformed name: {}", s),
            Error::CompressionLoop(s) => write!(f, "compression loop: {}", s),
            Error::LabelTooLong(s) => write!(f, "label too long: {}", s),
            Error::NameTooLong(n) => write!(f, "encoded name is {} bytes, limit is 255", n),
            Error::UnsupportedAnswerNameEncoding(offset) => {
                write!(f, "answer name at offset {} is not a compression pointer", offset)
            }
            Error::OutOfBounds(s) => write!(f, "out of bounds: {}", s),
            Error::AllocationFailed(s) => write!(f, "packet allocation failed: {}", s),
            Error::Msg(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for Error {}

/// One and only `Result` type from this library crate.
pub type Result<T> = core::result::Result<T, Error>;
