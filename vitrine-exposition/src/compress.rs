use flate2::write::GzEncoder;
use std::io::{self, Write};

/// Response compression scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    Gzip,
}

impl Compression {
    /// `Content-Encoding` value; empty for identity.
    pub fn label(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => "gzip",
        }
    }
}

/// Writer that optionally gzips everything written into `sink`.
///
/// Gzip output is incomplete until [`finish`](Self::finish) runs, so the sink
/// is only handed back by `finish`.
pub struct CompressingWriter<W: Write> {
    inner: Inner<W>,
    payload_len: usize,
}

enum Inner<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

/// Wrap `sink` for `scheme`. Returns the writer and its `Content-Encoding` label.
pub fn decorate<W: Write>(sink: W, scheme: Compression) -> (CompressingWriter<W>, &'static str) {
    let inner = match scheme {
        Compression::None => Inner::Plain(sink),
        Compression::Gzip => Inner::Gzip(GzEncoder::new(sink, flate2::Compression::default())),
    };
    (CompressingWriter { inner, payload_len: 0 }, scheme.label())
}

impl<W: Write> CompressingWriter<W> {
    pub fn compression(&self) -> Compression {
        match self.inner {
            Inner::Plain(_) => Compression::None,
            Inner::Gzip(_) => Compression::Gzip,
        }
    }

    /// Uncompressed bytes accepted so far.
    pub fn payload_len(&self) -> usize {
        self.payload_len
    }

    /// Flush all compression state into the sink and return it.
    pub fn finish(self) -> io::Result<W> {
        match self.inner {
            Inner::Plain(mut sink) => {
                sink.flush()?;
                Ok(sink)
            }
            Inner::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for CompressingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self.inner {
            Inner::Plain(ref mut sink) => sink.write(buf)?,
            Inner::Gzip(ref mut encoder) => encoder.write(buf)?,
        };
        self.payload_len += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner {
            Inner::Plain(ref mut sink) => sink.flush(),
            Inner::Gzip(ref mut encoder) => encoder.flush(),
        }
    }
}
