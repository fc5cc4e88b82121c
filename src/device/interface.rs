use flate2::read::GzDecoder;
use std::{
    fs::File,
    io::Read,
    net::TcpStream,
};

/// [Interface] to the measurement stream
pub enum Interface {
    /// [Interface::ReadOnly] is dedicated to read only input, mainly File inputs.
    /// Stacked files are consumed one after the other.
    ReadOnly(Box<dyn Read + Send>),

    /// [Interface::Socket] is a live stream, received over TCP.
    Socket(TcpStream),
}

impl Interface {
    /// Creates a new Read-Only interface
    pub fn from_file_handle(handle: File) -> Self {
        Self::ReadOnly(Box::new(handle))
    }

    /// Creates a new Read-Only interface, from gzip compressed file
    pub fn from_gzip_file_handle(handle: File) -> Self {
        Self::ReadOnly(Box::new(GzDecoder::new(handle)))
    }

    /// Creates a new socket interface
    pub fn from_socket(socket: TcpStream) -> Self {
        Self::Socket(socket)
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnly(_))
    }

    fn stack(&mut self, next: Box<dyn Read + Send>) {
        if let Self::ReadOnly(current) = self {
            let current = std::mem::replace(current, Box::new(std::io::empty()));
            *self = Self::ReadOnly(Box::new(current.chain(next)));
        }
    }

    /// Stacks a new file, consumed once the previous ones are exhausted.
    pub fn stack_file_handle(&mut self, handle: File) {
        self.stack(Box::new(handle));
    }

    /// Stacks a new gzip compressed file.
    pub fn stack_gzip_file_handle(&mut self, handle: File) {
        self.stack(Box::new(GzDecoder::new(handle)));
    }
}

impl std::io::Read for Interface {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::ReadOnly(r) => r.read(buf),
            Self::Socket(socket) => socket.read(buf),
        }
    }
}
