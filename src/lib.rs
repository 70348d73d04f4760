//! SES Library
//!
//! A thin client for the Simple Email Service query API: it signs requests,
//! encodes parameters, and decodes the XML replies into typed results. HTTP is
//! delegated to a [`transport::Transport`]; the default is a blocking `reqwest`
//! client.
//!
//! ```no_run
//! use ses::{Message, SimpleEmailService};
//!
//! # fn example() -> ses::error::Result<()> {
//! let client = SimpleEmailService::new("AKID", "secret")?;
//! let quota = client.get_send_quota()?;
//! println!("{} of {} sent", quota.sent_last_24_hours, quota.max_24_hour_send);
//!
//! let message = Message::new("me@example.com", "Hello", "Hi there")?
//!     .to(["you@example.com"]);
//! client.send_email(&message)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod models;
pub mod signer;
pub mod transport;
pub mod xml_parser;

pub use client::SimpleEmailService;
pub use config::Config;
pub use error::SesError;
pub use message::{Message, MessageBody};
pub use signer::{Action, Credentials, Method};

// Credentials and the default client are shared read-only across threads.
const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    let _ = assert_send_sync::<Credentials>;
    let _ = assert_send_sync::<SimpleEmailService>;
    let _ = assert_send_sync::<SesError>;
};
