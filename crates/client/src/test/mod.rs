//! Loopback test servers
//!
//! Stand-ins for the remote endpoints a broker talks to. Each server binds an
//! ephemeral port on 127.0.0.1 and stops when dropped.
//!
//! # Servers
//!
//! - [`PrefixServer`] - Transformer that replies `prefix + body`, optionally
//!   closing each connection after a fixed number of frames
//! - [`SilentServer`] - Transformer that reads but never replies
//! - [`RecordingServer`] - Subscriber that records every frame it receives,
//!   with the same optional per-connection limit
//!
//! # Example
//!
//! ```ignore
//! use courier_client::test::{PrefixServer, RecordingServer};
//!
//! let transformer = PrefixServer::start("X:").await?;
//! let subscriber = RecordingServer::start().await?;
//!
//! // ... wire them into a channel, send a delivery ...
//!
//! let got = subscriber.wait_for(1, Duration::from_secs(2)).await;
//! assert_eq!(got[0].as_ref(), b"X:payload");
//! ```


pub use servers::{PrefixServer, RecordingServer, SilentServer, closed_address};
