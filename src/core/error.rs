use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source document unreadable or store directory unwritable
    Io,
    /// Document content is not valid UTF-8 text
    Encoding,
    /// Durable medium unavailable or corrupted
    StoreIo,
    Closed,
    NotFound,
    /// Malformed query; `Error::position` carries the byte offset
    Parse,
    InvalidArgument,
    Cancelled,
    InvalidState,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub position: Option<usize>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context, position: None }
    }

    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: message.into(),
            position: Some(position),
        }
    }

    pub fn store(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::StoreIo, context.into())
    }

    pub fn closed() -> Self {
        Error::new(ErrorKind::Closed, "index store is closed".to_string())
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context.into())
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context.into())
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Attach a path or operation name in front of the existing context.
    pub fn with_context(mut self, prefix: impl fmt::Display) -> Self {
        self.context = format!("{}: {}", prefix, self.context);
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{:?} at {}: {}", self.kind, position, self.context),
            None => write!(f, "{:?}: {}", self.kind, self.context),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::new(ErrorKind::Encoding, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::StoreIo, format!("serialization error: {}", err))
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error::new(ErrorKind::StoreIo, format!("FST error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
