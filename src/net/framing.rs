//! Length-prefix framing for DNS over stream transports.
//!
//! Over a stream, every DNS message is preceded by its length as a two
//! octet unsigned integer in network byte order (RFC 1035, section 4.2.2).
//! Since a stream may deliver or accept any number of bytes at a time, both
//! directions are driven by small state machines that only keep track of
//! how far along the current message they are. They do no I/O themselves,
//! which keeps them testable without a network.
//!
//! A [`FrameReader`] tells the caller where the next bytes read from the
//! stream should go via [`FrameReader::read_target`] and is informed of how
//! many arrived via [`FrameReader::advance`]. It never asks for more bytes
//! than belong to the current message, so nothing of the next message is
//! consumed.
//!
//! A [`FrameWriter`] holds the complete framed message and hands out the
//! part not yet written via [`FrameWriter::remaining`].

use bytes::{BufMut, Bytes, BytesMut};

use crate::net::error::Error;

/// The size of the length prefix.
const PREFIX_LEN: usize = 2;

//------------ RecvState -----------------------------------------------------

/// The progress of receiving a single message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecvState {
    /// Not all of the length prefix has arrived yet.
    AwaitingLengthPrefix,

    /// The length is known but not all of the payload has arrived yet.
    AwaitingPayload,

    /// The message is complete.
    Complete,
}

//------------ FrameReader ---------------------------------------------------

/// Reassembles one length-prefixed message.
#[derive(Clone, Debug)]
pub struct FrameReader {
    /// Where we are.
    state: RecvState,

    /// The length prefix as received so far.
    prefix: [u8; PREFIX_LEN],

    /// Bytes received in the current state.
    filled: usize,

    /// The announced payload length once known.
    expected: usize,

    /// The largest payload the caller accepts.
    capacity: usize,
}

impl FrameReader {
    /// Creates a reader for a message of at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        FrameReader {
            state: RecvState::AwaitingLengthPrefix,
            prefix: [0; PREFIX_LEN],
            filled: 0,
            expected: 0,
            capacity,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> RecvState {
        self.state
    }

    /// Returns whether any bytes of the message have been received.
    pub fn is_started(&self) -> bool {
        self.state != RecvState::AwaitingLengthPrefix || self.filled > 0
    }

    /// Returns the announced payload length if it is known.
    pub fn expected(&self) -> Option<usize> {
        match self.state {
            RecvState::AwaitingLengthPrefix => None,
            _ => Some(self.expected),
        }
    }

    /// Returns the slice the next bytes from the stream should be read into.
    ///
    /// The slice is empty once the message is complete.
    pub fn read_target<'a>(
        &'a mut self,
        payload: &'a mut BytesMut,
    ) -> &'a mut [u8] {
        match self.state {
            RecvState::AwaitingLengthPrefix => &mut self.prefix[self.filled..],
            RecvState::AwaitingPayload => {
                &mut payload[self.filled..self.expected]
            }
            RecvState::Complete => &mut [],
        }
    }

    /// Records that `n` bytes were placed into the last read target.
    ///
    /// Once the prefix is complete, `payload` is cleared and sized to the
    /// announced length. If that length exceeds the capacity, an error is
    /// returned and `payload` is left alone.
    pub fn advance(
        &mut self,
        n: usize,
        payload: &mut BytesMut,
    ) -> Result<RecvState, Error> {
        match self.state {
            RecvState::AwaitingLengthPrefix => {
                self.filled += n;
                debug_assert!(self.filled <= PREFIX_LEN);
                if self.filled == PREFIX_LEN {
                    let len = usize::from(u16::from_be_bytes(self.prefix));
                    if len > self.capacity {
                        return Err(Error::BufferOverflow {
                            required: len,
                            capacity: self.capacity,
                        });
                    }
                    self.expected = len;
                    self.filled = 0;
                    payload.clear();
                    payload.resize(len, 0);
                    self.state = if len == 0 {
                        RecvState::Complete
                    } else {
                        RecvState::AwaitingPayload
                    };
                }
            }
            RecvState::AwaitingPayload => {
                self.filled += n;
                debug_assert!(self.filled <= self.expected);
                if self.filled == self.expected {
                    self.state = RecvState::Complete;
                }
            }
            RecvState::Complete => debug_assert_eq!(n, 0),
        }
        Ok(self.state)
    }
}

//------------ SendState -----------------------------------------------------

/// The progress of sending a single message.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SendState {
    /// Some bytes still need to be written.
    Sending,

    /// The message has been written completely.
    Complete,
}

//------------ FrameWriter ---------------------------------------------------

/// Sends one length-prefixed message.
#[derive(Clone, Debug)]
pub struct FrameWriter {
    /// The prefix followed by the payload.
    frame: Bytes,

    /// Bytes written so far.
    written: usize,
}

impl FrameWriter {
    /// Creates a writer for the given payload.
    ///
    /// Fails with [`Error::BufferTooLarge`] if the payload length cannot be
    /// expressed in the prefix.
    pub fn new(payload: &[u8]) -> Result<Self, Error> {
        let len =
            u16::try_from(payload.len()).map_err(|_| Error::BufferTooLarge {
                requested: payload.len(),
                max: usize::from(u16::MAX),
            })?;
        let mut frame = BytesMut::with_capacity(PREFIX_LEN + payload.len());
        frame.put_u16(len);
        frame.extend_from_slice(payload);
        Ok(FrameWriter {
            frame: frame.freeze(),
            written: 0,
        })
    }

    /// Returns the current state.
    pub fn state(&self) -> SendState {
        if self.written == self.frame.len() {
            SendState::Complete
        } else {
            SendState::Sending
        }
    }

    /// Returns whether any bytes of the frame have been written.
    pub fn is_started(&self) -> bool {
        self.written > 0
    }

    /// Returns the length of the payload.
    pub fn payload_len(&self) -> usize {
        self.frame.len() - PREFIX_LEN
    }

    /// Returns the bytes not yet written.
    pub fn remaining(&self) -> &[u8] {
        &self.frame[self.written..]
    }

    /// Records that `n` bytes of [`Self::remaining`] were written.
    pub fn advance(&mut self, n: usize) -> SendState {
        debug_assert!(n <= self.remaining().len());
        self.written += n;
        self.state()
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    /// Feeds `data` to `reader` in chunks of at most `chunk` bytes.
    ///
    /// Returns the number of calls to `advance` and the final state.
    fn feed(
        reader: &mut FrameReader,
        payload: &mut BytesMut,
        mut data: &[u8],
        chunk: usize,
    ) -> Result<(usize, RecvState), Error> {
        let mut steps = 0;
        while reader.state() != RecvState::Complete && !data.is_empty() {
            let target = reader.read_target(payload);
            let n = chunk.min(target.len()).min(data.len());
            target[..n].copy_from_slice(&data[..n]);
            data = &data[n..];
            reader.advance(n, payload)?;
            steps += 1;
        }
        Ok((steps, reader.state()))
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut res = (payload.len() as u16).to_be_bytes().to_vec();
        res.extend_from_slice(payload);
        res
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(3)]
    #[case(7)]
    #[case(17)]
    fn reassembles_chunked_message(#[case] chunk: usize) {
        let payload: Vec<u8> = (0..15).collect();
        let mut reader = FrameReader::new(512);
        let mut buf = BytesMut::new();
        let (_, state) =
            feed(&mut reader, &mut buf, &frame(&payload), chunk).unwrap();
        assert_eq!(state, RecvState::Complete);
        assert_eq!(reader.expected(), Some(15));
        assert_eq!(buf.as_ref(), payload.as_slice());
    }

    #[test]
    fn split_prefix() {
        let mut reader = FrameReader::new(512);
        let mut buf = BytesMut::new();
        assert_eq!(reader.read_target(&mut buf).len(), 2);
        assert!(!reader.is_started());
        reader.read_target(&mut buf)[0] = 0;
        assert_eq!(
            reader.advance(1, &mut buf).unwrap(),
            RecvState::AwaitingLengthPrefix
        );
        assert_eq!(reader.expected(), None);
        assert!(reader.is_started());
        reader.read_target(&mut buf)[0] = 4;
        assert_eq!(
            reader.advance(1, &mut buf).unwrap(),
            RecvState::AwaitingPayload
        );
        assert_eq!(reader.read_target(&mut buf).len(), 4);
    }

    #[test]
    fn does_not_consume_next_message() {
        let mut data = frame(b"abc");
        data.extend_from_slice(&frame(b"defg"));
        let mut reader = FrameReader::new(512);
        let mut buf = BytesMut::new();
        feed(&mut reader, &mut buf, &data, 64).unwrap();
        assert_eq!(buf.as_ref(), b"abc");
        assert!(reader.read_target(&mut buf).is_empty());
    }

    #[test]
    fn empty_message() {
        let mut reader = FrameReader::new(512);
        let mut buf = BytesMut::from(&b"stale"[..]);
        let (steps, state) =
            feed(&mut reader, &mut buf, &[0, 0], 2).unwrap();
        assert_eq!((steps, state), (1, RecvState::Complete));
        assert!(buf.is_empty());
    }

    #[test]
    fn announced_length_over_capacity() {
        let mut reader = FrameReader::new(10);
        let mut buf = BytesMut::from(&b"untouched"[..]);
        let err =
            feed(&mut reader, &mut buf, &frame(&[0; 11]), 64).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferOverflow {
                required: 11,
                capacity: 10
            }
        ));
        assert_eq!(buf.as_ref(), b"untouched");
    }

    #[test]
    fn writer_partial_writes() {
        let payload = [0x55; 15];
        let mut writer = FrameWriter::new(&payload).unwrap();
        assert_eq!(writer.payload_len(), 15);
        assert_eq!(writer.remaining().len(), 17);
        assert_eq!(&writer.remaining()[..2], &[0, 15]);
        assert!(!writer.is_started());
        assert_eq!(writer.advance(10), SendState::Sending);
        assert_eq!(writer.remaining().len(), 7);
        assert!(writer.is_started());
        assert_eq!(writer.advance(7), SendState::Complete);
        assert!(writer.remaining().is_empty());
    }

    #[test]
    fn writer_rejects_oversized_payload() {
        let payload = vec![0; 65536];
        assert!(matches!(
            FrameWriter::new(&payload),
            Err(Error::BufferTooLarge {
                requested: 65536,
                ..
            })
        ));
        assert!(FrameWriter::new(&payload[..65535]).is_ok());
    }
}
