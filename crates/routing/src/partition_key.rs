//! Partition key selection
//!
//! A channel hashes one field of each delivery to choose a partition.
//! Deliveries with equal keys always land on the same partition, which is
//! what gives them FIFO ordering.

use std::fmt;
use std::str::FromStr;

use courier_protocol::Delivery;
use xxhash_rust::xxh3::xxh3_64;

use crate::RoutingError;

/// Which delivery field a channel partitions on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PartitionKey {
    /// Correlation key (arg4), falling back to the uid when empty
    #[default]
    Correlation,
    Uid,
    Sender,
    Route,
    Channel,
    /// Object-specific arg3
    Arg3,
}

impl PartitionKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::Uid => "uid",
            Self::Sender => "sender",
            Self::Route => "route",
            Self::Channel => "channel",
            Self::Arg3 => "arg3",
        }
    }

    /// The field value this selector reads from `delivery`
    pub fn key<'a>(self, delivery: &'a Delivery) -> &'a str {
        match self {
            Self::Correlation if delivery.key().is_empty() => delivery.uid(),
            Self::Correlation => delivery.key(),
            Self::Uid => delivery.uid(),
            Self::Sender => delivery.sender(),
            Self::Route => delivery.route(),
            Self::Channel => delivery.channel(),
            Self::Arg3 => delivery.target(),
        }
    }

    /// Partition index in `0..partitions` for `delivery`
    #[inline]
    pub fn partition_for(self, delivery: &Delivery, partitions: usize) -> usize {
        if partitions <= 1 {
            return 0;
        }
        (xxh3_64(self.key(delivery).as_bytes()) % partitions as u64) as usize
    }
}

impl FromStr for PartitionKey {
    type Err = RoutingError;

    /// Parse a selector name; empty selects the default
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "correlation" | "key" => Ok(Self::Correlation),
            "uid" | "id" => Ok(Self::Uid),
            "sender" => Ok(Self::Sender),
            "route" => Ok(Self::Route),
            "channel" => Ok(Self::Channel),
            "arg3" | "target" => Ok(Self::Arg3),
            _ => Err(RoutingError::unknown_partition_key(s)),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
