use bytes::Bytes;
use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::warn;

/// Splits a watch body into newline-delimited frames.
///
/// Never fails on content: a frame is just bytes, decoding to a record
/// happens later. A line longer than `max_len` is dropped up to and
/// including its newline, and splitting resumes with the next line. A
/// trailing line without newline is still emitted at end of stream.
#[derive(Debug)]
pub struct LineDecoder {
    max_len: usize,
    // resume the newline search here on the next call
    next_index: usize,
    discarding: bool,
    discarded: u64,
}

impl LineDecoder {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
            discarding: false,
            discarded: 0,
        }
    }

    /// Oversized lines dropped so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

fn without_line_ending(mut line: BytesMut) -> Bytes {
    if line.last() == Some(&b'\n') {
        line.truncate(line.len() - 1);
    }
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line.freeze()
}

impl Decoder for LineDecoder {
    type Item = Bytes;
    type Error = std::io::Error;

    fn decode(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match newline {
                Some(ix) => {
                    let line = buf.split_to(ix + 1);
                    self.next_index = 0;
                    if self.discarding {
                        // tail of an oversized line
                        self.discarding = false;
                        continue;
                    }
                    if line.len() - 1 > self.max_len {
                        self.discarded += 1;
                        warn!(len = line.len() - 1, max = self.max_len, "dropping oversized watch line");
                        continue;
                    }
                    return Ok(Some(without_line_ending(line)));
                }
                None if self.discarding => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                None if buf.len() > self.max_len => {
                    self.discarded += 1;
                    warn!(max = self.max_len, "dropping oversized watch line");
                    self.discarding = true;
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                None => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(
        &mut self,
        buf: &mut BytesMut,
    ) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if buf.is_empty() || self.discarding {
            buf.clear();
            self.discarding = false;
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        Ok(Some(without_line_ending(rest)))
    }
}
