use log::{debug, info};

use std::{
    fs::File,
    io::Read,
    net::TcpStream,
    time::Duration,
};

mod interface;

use interface::Interface;

/// Live stream read timeout. Bounds the Ctrl+C reaction time.
const READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Measurement source
pub struct Device {
    pub interface: Interface,
}

impl Device {
    fn open(fullpath: &str) -> File {
        File::open(fullpath).unwrap_or_else(|e| {
            panic!("Failed to open {}: {}", fullpath, e);
        })
    }

    /// Opens all files, to be consumed in order.
    /// Gzip files must be terminated with '.gz'.
    pub fn open_files(fullpaths: &[&String]) -> Self {
        assert!(
            !fullpaths.is_empty(),
            "invalid command line: requires either a TCP stream or at least one input file"
        );

        let handle = Self::open(fullpaths[0]);

        let mut interface = if fullpaths[0].ends_with(".gz") {
            Interface::from_gzip_file_handle(handle)
        } else {
            Interface::from_file_handle(handle)
        };

        debug!("input: {}", fullpaths[0]);

        for fullpath in fullpaths.iter().skip(1) {
            let handle = Self::open(fullpath);

            if fullpath.ends_with(".gz") {
                interface.stack_gzip_file_handle(handle);
            } else {
                interface.stack_file_handle(handle);
            }

            debug!("input: {}", fullpath);
        }

        Self { interface }
    }

    /// Connects to a live TCP stream
    pub fn connect(address: &str) -> Self {
        let socket = TcpStream::connect(address)
            .unwrap_or_else(|e| panic!("Failed to connect to {}: {}", address, e));

        socket
            .set_read_timeout(Some(READ_TIMEOUT))
            .unwrap_or_else(|e| panic!("Failed to configure {}: {}", address, e));

        info!("connected to {}", address);

        Self {
            interface: Interface::from_socket(socket),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.interface.is_read_only()
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.interface.read(buf)
    }
}
