// Fixed-header message framing over TCP.
//
// Frame layout: a 6-byte header followed by the payload.
//
//   | offset | size | meaning                                   |
//   |--------|------|-------------------------------------------|
//   | 0      | 1    | sender: 0 = relay, 1 = peer A, 2 = peer B |
//   | 1..=4  | 4    | payload length (big-endian, see below)    |
//   | 5      | 1    | message kind (0..=14)                     |
//   | 6..    | len  | payload                                   |
//
// The length field is nominally four bytes, but the deployed peer software
// computes `((b1<<24)&0xFF) + ((b2<<16)&0xFF) + ((b3<<8)&0xFF) + (b4&0xFF)`
// when reading it. Every shifted term masks to zero, so only the last byte
// counts and payloads are capped at 255 bytes. We reproduce that arithmetic
// bit-for-bit (`decoded_payload_len`) to stay wire-compatible, and refuse to
// write anything larger rather than emit a frame the other end would
// misparse.

use std::io::{self, Read, Write};

use crate::message::Message;

/// Frame header length in bytes.
pub const HEADER_LEN: usize = 6;

/// Maximum payload size a frame can carry, imposed by the length-field
/// truncation described in the module comment.
pub const MAX_PAYLOAD: usize = 255;

/// Sender byte used for frames originating at the relay.
pub const RELAY_SENDER: u8 = 0;

/// A decoded frame: who sent it and what it says.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub sender: u8,
    pub message: Message,
}

/// Payload length as the deployed peers compute it from the four length
/// bytes. Equivalent to `bytes[3]`, kept in the original form so the
/// compatibility contract is visible (and testable) rather than folded away.
pub fn decoded_payload_len(bytes: [u8; 4]) -> usize {
    // i64 so the high-byte shifts cannot overflow; the & 0xFF masks make
    // the result identical to the peers' wrapping 32-bit arithmetic.
    let (b1, b2, b3, b4) = (
        i64::from(bytes[0]),
        i64::from(bytes[1]),
        i64::from(bytes[2]),
        i64::from(bytes[3]),
    );
    let len = ((b1 << 24) & 0xFF) + ((b2 << 16) & 0xFF) + ((b3 << 8) & 0xFF) + (b4 & 0xFF);
    #[expect(clippy::cast_sign_loss)]
    {
        len as usize
    }
}

/// Write one frame: header, then payload. Flushes the writer so a frame is
/// never left sitting in a `BufWriter`.
///
/// Returns `InvalidInput` if the payload exceeds `MAX_PAYLOAD` — such a
/// frame would be misread on the other end.
pub fn write_frame<W: Write>(writer: &mut W, sender: u8, message: &Message) -> io::Result<()> {
    let payload = message.encode_payload();
    if payload.len() > MAX_PAYLOAD {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload too large: {} bytes (max {MAX_PAYLOAD})", payload.len()),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (payload.len() as u32).to_be_bytes();
    let mut header = [0u8; HEADER_LEN];
    header[0] = sender;
    header[1..5].copy_from_slice(&len_bytes);
    header[5] = message.kind();
    writer.write_all(&header)?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame: blocking read of the 6-byte header, then of exactly the
/// decoded payload length.
///
/// Returns `UnexpectedEof` if the stream closes before or during a frame,
/// and `InvalidData` for an unknown sender byte or an undecodable payload.
pub fn read_frame<R: Read>(reader: &mut R) -> io::Result<Frame> {
    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header)?;
    let sender = header[0];
    if sender > 2 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid sender byte {sender}"),
        ));
    }
    let len = decoded_payload_len([header[1], header[2], header[3], header[4]]);
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    let message = Message::decode(header[5], &payload)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Frame { sender, message })
}
