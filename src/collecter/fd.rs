use flate2::{write::GzEncoder, Compression};
use std::fs::File;

/// Output [FileDescriptor]
pub enum FileDescriptor {
    Plain(File),
    Gzip(GzEncoder<File>),
}

impl std::io::Write for FileDescriptor {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(data),
            Self::Gzip(w) => w.write(data),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
        }
    }
}

impl FileDescriptor {
    pub fn new(gzip: bool, filename: &str) -> std::io::Result<Self> {
        let fd = File::create(filename)?;

        if gzip {
            let compression = Compression::new(5);
            Ok(Self::Gzip(GzEncoder::new(fd, compression)))
        } else {
            Ok(Self::Plain(fd))
        }
    }

    /// Terminates this file. Gzip streams are only valid once finished.
    pub fn finish(self) -> std::io::Result<()> {
        match self {
            Self::Plain(mut w) => std::io::Write::flush(&mut w),
            Self::Gzip(w) => w.finish().map(|_| ()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::FileDescriptor;
    use flate2::read::GzDecoder;
    use std::io::{Read, Write};

    #[test]
    fn gzip_descriptor() {
        let path = std::env::temp_dir().join("android2rinex-fd-test.gz");
        let path = path.to_string_lossy().to_string();

        let mut fd = FileDescriptor::new(true, &path).unwrap();
        fd.write_all(b"     3.05           OBSERVATION DATA").unwrap();
        fd.finish().unwrap();

        let mut content = String::new();
        GzDecoder::new(std::fs::File::open(&path).unwrap())
            .read_to_string(&mut content)
            .unwrap();

        assert!(content.ends_with("OBSERVATION DATA"));
        let _ = std::fs::remove_file(&path);
    }
}
