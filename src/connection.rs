//! Nonblocking connection handle abstracting over a TCP or local (Unix
//! domain) socket, so the rest of the crate can register one handle type
//! with the readiness loop regardless of target endpoint kind.

use std::io::{self, Read, Write};

use mio::event::Source;
use mio::net::{TcpStream, UnixStream};
use mio::{Interest, Registry, Token};

use crate::cli::Endpoint;

pub enum StreamHandle {
    Tcp(TcpStream),
    Unix(UnixStream),
}

impl StreamHandle {
    pub fn connect(endpoint: &Endpoint) -> io::Result<Self> {
        match endpoint {
            Endpoint::Tcp { host, port } => {
                let addr = format!("{}:{}", host, port)
                    .parse()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("{e}")))?;
                let stream = TcpStream::connect(addr)?;
                stream.set_nodelay(true).ok();
                Ok(StreamHandle::Tcp(stream))
            }
            Endpoint::Unix(path) => Ok(StreamHandle::Unix(UnixStream::connect(path)?)),
        }
    }
}

impl Read for StreamHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            StreamHandle::Tcp(s) => s.read(buf),
            StreamHandle::Unix(s) => s.read(buf),
        }
    }
}

impl Write for StreamHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            StreamHandle::Tcp(s) => s.write(buf),
            StreamHandle::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            StreamHandle::Tcp(s) => s.flush(),
            StreamHandle::Unix(s) => s.flush(),
        }
    }
}

impl Source for StreamHandle {
    fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        match self {
            StreamHandle::Tcp(s) => s.register(registry, token, interests),
            StreamHandle::Unix(s) => s.register(registry, token, interests),
        }
    }

    fn reregister(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        match self {
            StreamHandle::Tcp(s) => s.reregister(registry, token, interests),
            StreamHandle::Unix(s) => s.reregister(registry, token, interests),
        }
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        match self {
            StreamHandle::Tcp(s) => s.deregister(registry),
            StreamHandle::Unix(s) => s.deregister(registry),
        }
    }
}
