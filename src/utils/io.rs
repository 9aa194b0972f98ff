//! Plain and gzip stream helpers
//!
//! `-` means stdin/stdout; a `.gz` suffix switches on (de)compression.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const BUFFER_SIZE: usize = 1 << 16;

pub fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|e| e == "gz").unwrap_or(false)
}

/// Open a file (or stdin) for buffered line reading
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    if is_stdio(path) {
        return Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, io::stdin())));
    }

    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::with_capacity(
            BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

/// Open a file (or stdout) for buffered writing
pub fn open_output(path: &Path) -> io::Result<Box<dyn Write>> {
    if is_stdio(path) {
        return Ok(Box::new(BufWriter::with_capacity(BUFFER_SIZE, io::stdout())));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    if is_gzip(path) {
        Ok(Box::new(GzOutput {
            inner: BufWriter::with_capacity(
                BUFFER_SIZE,
                GzEncoder::new(file, Compression::default()),
            ),
            finished: false,
        }))
    } else {
        Ok(Box::new(BufWriter::with_capacity(BUFFER_SIZE, file)))
    }
}

/// Gzip file writer whose `flush` also writes the gzip trailer, so a failed
/// trailer surfaces as an error instead of being lost in `Drop`.
/// The stream is closed after the first flush.
struct GzOutput {
    inner: BufWriter<GzEncoder<File>>,
    finished: bool,
}

impl Write for GzOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finished {
            return Err(io::Error::other("write after the gzip stream was finished"));
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.inner.flush()?;
        let encoder = self.inner.get_mut();
        encoder.try_finish()?;
        self.finished = true;
        encoder.get_mut().sync_all()
    }
}
