//! Courier Client Library
//!
//! Builders and a TCP client for talking to a courier broker. It is used by:
//!
//! - **The `courier send` command**: one-shot admin and delivery frames
//! - **Integration tests**: driving a broker over real sockets
//!
//! # Quick Start
//!
//! ```ignore
//! use courier_client::{Client, command};
//!
//! let mut client = Client::connect("127.0.0.1:7070").await?;
//! client.send(&command::add_channel("orders", "primary", "broadcast", "")).await?;
//! client.send(&command::add_subscriber("orders", "primary", "127.0.0.1:9001")).await?;
//! client.send(&command::deliver("orders", "customer-42", b"payload".as_slice())).await?;
//! ```
//!
//! # Test Servers
//!
//! The [`test`] module provides loopback stand-ins for remote endpoints:
//! a prefixing transformer and a recording subscriber.

mod client;
mod error;

pub mod command;
pub mod test;

pub use client::Client;
pub use error::{ClientError, Result};

// Re-export protocol types
pub use courier_protocol::{CommandType, Delivery, ObjectType};
