//! Blocking full-read/full-write helpers over a `TcpStream`.
//!
//! `std::io::Read`/`Write` don't guarantee a single call fills the buffer;
//! these loop until the buffer is exhausted or the peer closes the
//! connection, which a framed protocol's header-then-payload reads need.

use std::io::{self, Read, Write};

pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return if filled == 0 {
                    Ok(false)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed mid-frame",
                    ))
                };
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

pub fn write_all_flush<W: Write>(writer: &mut W, buf: &[u8]) -> io::Result<()> {
    writer.write_all(buf)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_full_buffer_across_short_reads() {
        struct Choppy(Cursor<Vec<u8>>);
        impl Read for Choppy {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let capped = &mut buf[..buf.len().min(2)];
                self.0.read(capped)
            }
        }
        let mut reader = Choppy(Cursor::new(vec![1, 2, 3, 4, 5]));
        let mut out = [0u8; 5];
        assert!(read_exact_or_eof(&mut reader, &mut out).unwrap());
        assert_eq!(out, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn clean_eof_at_frame_boundary_returns_false() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        let mut out = [0u8; 4];
        assert!(!read_exact_or_eof(&mut reader, &mut out).unwrap());
    }

    #[test]
    fn eof_mid_frame_is_an_error() {
        let mut reader = Cursor::new(vec![1, 2]);
        let mut out = [0u8; 4];
        assert!(read_exact_or_eof(&mut reader, &mut out).is_err());
    }
}
