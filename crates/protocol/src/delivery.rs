//! Decoded command frames
//!
//! A `Delivery` is immutable once decoded. Pipeline stages that change the
//! payload build a new `Delivery` through [`Delivery::with_payload`] and
//! leave the original untouched, so callers holding an `Arc<Delivery>` can
//! compare pointers to tell whether a stage produced output.

use bytes::Bytes;

use crate::{CommandType, ObjectType, PROTOCOL_VERSION};

/// A decoded command frame
///
/// Argument slots are positional:
///
/// | Slot | Meaning |
/// |------|---------|
/// | arg1 | route name |
/// | arg2 | channel name |
/// | arg3 | address, strategy name, or setting key |
/// | arg4 | correlation key, partition key selector, or security token |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    version: u8,
    object: ObjectType,
    command: CommandType,
    uid: String,
    sender: String,
    args: [String; 4],
    payload: Bytes,
}

impl Delivery {
    /// Start building a delivery for the given object/command pair
    pub fn builder(object: ObjectType, command: CommandType) -> DeliveryBuilder {
        DeliveryBuilder::new(object, command)
    }

    /// Assemble a delivery from decoded parts
    pub(crate) fn from_parts(
        version: u8,
        object: ObjectType,
        command: CommandType,
        uid: String,
        sender: String,
        args: [String; 4],
        payload: Bytes,
    ) -> Self {
        Self {
            version,
            object,
            command,
            uid,
            sender,
            args,
            payload,
        }
    }

    /// Copy of this delivery with a replaced payload and identical metadata
    pub fn with_payload(&self, payload: Bytes) -> Self {
        Self {
            version: self.version,
            object: self.object,
            command: self.command,
            uid: self.uid.clone(),
            sender: self.sender.clone(),
            args: self.args.clone(),
            payload,
        }
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn object(&self) -> ObjectType {
        self.object
    }

    #[inline]
    pub fn command(&self) -> CommandType {
        self.command
    }

    #[inline]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    #[inline]
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Argument slot by zero-based index (0..4)
    #[inline]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    #[inline]
    pub fn args(&self) -> &[String; 4] {
        &self.args
    }

    /// Route name (arg1)
    #[inline]
    pub fn route(&self) -> &str {
        &self.args[0]
    }

    /// Channel name (arg2)
    #[inline]
    pub fn channel(&self) -> &str {
        &self.args[1]
    }

    /// Object-specific target (arg3): an address, strategy, or setting key
    #[inline]
    pub fn target(&self) -> &str {
        &self.args[2]
    }

    /// Object-specific key (arg4): correlation key, key selector, or token
    #[inline]
    pub fn key(&self) -> &str {
        &self.args[3]
    }

    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload interpreted as UTF-8 (lossy)
    pub fn payload_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Builder for `Delivery`, used by clients and tests
#[derive(Debug, Clone)]
pub struct DeliveryBuilder {
    object: ObjectType,
    command: CommandType,
    uid: String,
    sender: String,
    args: [String; 4],
    payload: Bytes,
}

impl DeliveryBuilder {
    pub fn new(object: ObjectType, command: CommandType) -> Self {
        Self {
            object,
            command,
            uid: String::new(),
            sender: String::new(),
            args: Default::default(),
            payload: Bytes::new(),
        }
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn route(mut self, route: impl Into<String>) -> Self {
        self.args[0] = route.into();
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.args[1] = channel.into();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.args[2] = target.into();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.args[3] = key.into();
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    pub fn build(self) -> Delivery {
        Delivery {
            version: PROTOCOL_VERSION,
            object: self.object,
            command: self.command,
            uid: self.uid,
            sender: self.sender,
            args: self.args,
            payload: self.payload,
        }
    }
}
