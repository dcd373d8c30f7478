use std::io::{BufRead, Result, Write};

/// Reads bytes from `reader` up to the next delimiter or end of stream.
///
/// The delimiter is consumed but not included in the frame. Returns `None`
/// only when the stream ends with zero collected bytes; a trailing
/// unterminated record is still a frame. Works directly on `fill_buf` so an
/// `Interrupted` read surfaces to the caller instead of being retried.
pub fn read_frame<R: BufRead>(reader: &mut R, delimiter: u8) -> Result<Option<Vec<u8>>> {
    let mut frame = Vec::new();
    loop {
        let (done, used) = {
            let chunk = reader.fill_buf()?;
            if chunk.is_empty() {
                return Ok(if frame.is_empty() { None } else { Some(frame) });
            }
            match chunk.iter().position(|&b| b == delimiter) {
                Some(at) => {
                    frame.extend_from_slice(&chunk[..at]);
                    (true, at + 1)
                }
                None => {
                    frame.extend_from_slice(chunk);
                    (false, chunk.len())
                }
            }
        };
        reader.consume(used);
        if done {
            return Ok(Some(frame));
        }
    }
}

/// Writes one frame: payload, delimiter, flush.
pub fn write_frame<W: Write>(writer: &mut W, message: &[u8], delimiter: u8) -> Result<()> {
    writer.write_all(message)?;
    writer.write_all(&[delimiter])?;
    writer.flush()
}

mod tests {
    #![allow(unused_imports)]

    use super::*;
    use std::io::Cursor;

    #[test]
    fn splits_on_delimiter() {
        let mut input = Cursor::new(b"abcXdefgXfoo".to_vec());
        assert_eq!(read_frame(&mut input, b'X').unwrap(), Some(b"abc".to_vec()));
        assert_eq!(read_frame(&mut input, b'X').unwrap(), Some(b"defg".to_vec()));
        assert_eq!(read_frame(&mut input, b'X').unwrap(), Some(b"foo".to_vec()));
        assert_eq!(read_frame(&mut input, b'X').unwrap(), None);
    }

    #[test]
    fn empty_stream_is_end() {
        let mut input = Cursor::new(Vec::new());
        assert_eq!(read_frame(&mut input, b'\n').unwrap(), None);
    }

    #[test]
    fn empty_frame_between_delimiters() {
        let mut input = Cursor::new(b"\n\n".to_vec());
        assert_eq!(read_frame(&mut input, b'\n').unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut input, b'\n').unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut input, b'\n').unwrap(), None);
    }

    #[test]
    fn nul_delimited_frames() {
        let mut input = Cursor::new(b"one\0two\0".to_vec());
        assert_eq!(read_frame(&mut input, 0).unwrap(), Some(b"one".to_vec()));
        assert_eq!(read_frame(&mut input, 0).unwrap(), Some(b"two".to_vec()));
        assert_eq!(read_frame(&mut input, 0).unwrap(), None);
    }

    #[test]
    fn frame_may_contain_other_delimiter() {
        let mut input = Cursor::new(b"with\nnewline\0".to_vec());
        assert_eq!(
            read_frame(&mut input, 0).unwrap(),
            Some(b"with\nnewline".to_vec())
        );
    }

    #[test]
    fn write_appends_delimiter() {
        let mut output = Vec::new();
        write_frame(&mut output, b"one", b'\n').unwrap();
        write_frame(&mut output, b"two", b'\n').unwrap();
        assert_eq!(output, b"one\ntwo\n");
    }
}
