//! Send command - build one command frame and send it to a running broker
//!
//! # Usage
//!
//! ```bash
//! # Topology
//! courier send -o channel -m add --route orders --channel primary --arg3 round_robin --payload 8
//! courier send -o transformer -m add --route orders --channel primary --arg3 127.0.0.1:7001
//!
//! # Data
//! courier send -o delivery -m send --route orders --arg4 customer-42 --payload hello
//!
//! # Runtime update (arg3 setting, arg4 token, payload value)
//! courier send -o runtime_update -m update --arg3 verbosity --arg4 $TOKEN --payload debug
//! ```

use anyhow::{Context, Result};
use clap::Args;

use courier_client::{Client, command};
use courier_protocol::{CommandType, Delivery, ObjectType};

/// Default broker address
const DEFAULT_ADDRESS: &str = "127.0.0.1:7070";

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Broker address
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Object type (delivery, transformer, subscriber, channel, route, runtime_update)
    #[arg(short, long)]
    pub object: ObjectType,

    /// Command type (add, remove, send, update)
    #[arg(short = 'm', long)]
    pub command: CommandType,

    /// Route name (arg1)
    #[arg(long, default_value = "")]
    pub route: String,

    /// Channel name (arg2)
    #[arg(long, default_value = "")]
    pub channel: String,

    /// Address, strategy or setting name (arg3)
    #[arg(long, default_value = "")]
    pub arg3: String,

    /// Correlation key, partition key selector or token (arg4)
    #[arg(long, default_value = "")]
    pub arg4: String,

    /// Delivery id; generated when omitted
    #[arg(long)]
    pub uid: Option<String>,

    /// Sender identifier
    #[arg(long, default_value = "")]
    pub sender: String,

    /// Payload bytes, taken as UTF-8 text
    #[arg(long, default_value = "")]
    pub payload: String,

    /// Don't print what was sent
    #[arg(short, long)]
    pub quiet: bool,
}

impl SendArgs {
    fn delivery(&self) -> Delivery {
        Delivery::builder(self.object, self.command)
            .uid(self.uid.clone().unwrap_or_else(command::next_uid))
            .sender(self.sender.as_str())
            .route(self.route.as_str())
            .channel(self.channel.as_str())
            .target(self.arg3.as_str())
            .key(self.arg4.as_str())
            .payload(self.payload.clone())
            .build()
    }
}

pub async fn run(args: SendArgs) -> Result<()> {
    let delivery = args.delivery();

    let mut client = Client::connect(&args.address)
        .await
        .with_context(|| format!("failed to connect to {}", args.address))?;
    client
        .send(&delivery)
        .await
        .with_context(|| format!("failed to send {} {}", args.object, args.command))?;
    client.close().await.context("failed to close connection")?;

    if !args.quiet {
        println!(
            "sent {} {} (uid {}) to {}",
            delivery.object(),
            delivery.command(),
            delivery.uid(),
            args.address
        );
    }
    Ok(())
}

#[cfg(test)]
#[path = "send_test.rs"]
mod tests;
