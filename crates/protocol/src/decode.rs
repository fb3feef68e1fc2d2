//! Command frame decoder
//!
//! Decoding dispatches on the leading version byte so that older clients
//! keep working when the frame layout evolves. Each version gets its own
//! routine; only v1 exists today.
//!
//! Every length field is validated against its limit before the field body
//! is touched, so a hostile length cannot force an allocation.

use bytes::Bytes;

use crate::{
    CommandType, Delivery, MAX_PAYLOAD_SIZE, MAX_SHORT_STRING, ObjectType, ProtocolError, Result,
};

/// Decode one command frame (without its transport length prefix)
pub fn decode(frame: Bytes) -> Result<Delivery> {
    let version = *frame
        .first()
        .ok_or_else(|| ProtocolError::truncated("version", 1, 0))?;

    match version {
        1 => decode_v1(frame),
        other => Err(ProtocolError::UnsupportedVersion(other)),
    }
}

fn decode_v1(frame: Bytes) -> Result<Delivery> {
    let mut reader = Reader::new(&frame);

    let version = reader.u8("version")?;
    let object = ObjectType::try_from(reader.u8("object type")?)?;
    let command = CommandType::try_from(reader.u8("command type")?)?;

    let uid_len = reader.u8("uid length")? as usize;
    let uid = reader.string("uid", uid_len)?;

    let sender_len = reader.u16("sender length")? as usize;
    if sender_len > MAX_SHORT_STRING {
        return Err(ProtocolError::too_large("sender", sender_len, MAX_SHORT_STRING));
    }
    let sender = reader.string("sender", sender_len)?;

    let mut args: [String; 4] = Default::default();
    for (slot, field) in args.iter_mut().zip(ARG_FIELDS) {
        let len = reader.u8(field)? as usize;
        *slot = reader.string(field, len)?;
    }

    let payload_len = reader.u32("payload length")? as usize;
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::too_large("payload", payload_len, MAX_PAYLOAD_SIZE));
    }
    let range = reader.span("payload", payload_len)?;
    let payload = frame.slice(range);

    if reader.remaining() > 0 {
        return Err(ProtocolError::TrailingBytes(reader.remaining()));
    }

    Ok(Delivery::from_parts(
        version, object, command, uid, sender, args, payload,
    ))
}

const ARG_FIELDS: [&str; 4] = ["arg1", "arg2", "arg3", "arg4"];

/// Bounds-checked forward cursor over a frame
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline]
    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reserve `len` bytes and return their range within the frame
    fn span(&mut self, field: &'static str, len: usize) -> Result<std::ops::Range<usize>> {
        if len > self.remaining() {
            return Err(ProtocolError::truncated(field, len, self.remaining()));
        }
        let start = self.pos;
        self.pos += len;
        Ok(start..self.pos)
    }

    fn bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8]> {
        let range = self.span(field, len)?;
        Ok(&self.buf[range])
    }

    fn u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.bytes(field, 1)?[0])
    }

    fn u16(&mut self, field: &'static str) -> Result<u16> {
        let b = self.bytes(field, 2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self, field: &'static str) -> Result<u32> {
        let b = self.bytes(field, 4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn string(&mut self, field: &'static str, len: usize) -> Result<String> {
        let raw = self.bytes(field, len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidUtf8(field))
    }
}
