//! Command frame encoder
//!
//! Inverse of [`decode`](crate::decode). Always writes the current protocol
//! version. Fields that do not fit their length prefix are rejected rather
//! than truncated.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Delivery, MAX_PAYLOAD_SIZE, MAX_SHORT_STRING, MIN_FRAME_SIZE, PROTOCOL_VERSION, ProtocolError,
    Result,
};

const ARG_FIELDS: [&str; 4] = ["arg1", "arg2", "arg3", "arg4"];

/// Encoded size of a delivery, excluding the transport prefix
pub fn encoded_len(delivery: &Delivery) -> usize {
    MIN_FRAME_SIZE
        + delivery.uid().len()
        + delivery.sender().len()
        + delivery.args().iter().map(String::len).sum::<usize>()
        + delivery.payload().len()
}

/// Encode a delivery into a command frame (without transport prefix)
pub fn encode(delivery: &Delivery) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(encoded_len(delivery));

    buf.put_u8(PROTOCOL_VERSION);
    buf.put_u8(delivery.object().as_u8());
    buf.put_u8(delivery.command().as_u8());

    put_u8_string(&mut buf, "uid", delivery.uid())?;

    let sender = delivery.sender();
    if sender.len() > MAX_SHORT_STRING || sender.len() > u16::MAX as usize {
        return Err(ProtocolError::unencodable(
            "sender",
            sender.len(),
            u16::MAX as usize,
        ));
    }
    buf.put_u16(sender.len() as u16);
    buf.put_slice(sender.as_bytes());

    for (arg, field) in delivery.args().iter().zip(ARG_FIELDS) {
        put_u8_string(&mut buf, field, arg)?;
    }

    let payload = delivery.payload();
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(ProtocolError::unencodable(
            "payload",
            payload.len(),
            MAX_PAYLOAD_SIZE,
        ));
    }
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);

    Ok(buf.freeze())
}

fn put_u8_string(buf: &mut BytesMut, field: &'static str, value: &str) -> Result<()> {
    if value.len() > u8::MAX as usize {
        return Err(ProtocolError::unencodable(field, value.len(), u8::MAX as usize));
    }
    buf.put_u8(value.len() as u8);
    buf.put_slice(value.as_bytes());
    Ok(())
}
