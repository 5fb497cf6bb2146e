//! High-level Bravia IRCC API for device control
//!
//! This crate provides a type-safe API for sending remote-control codes to
//! Sony Bravia televisions. It uses the private `soap-client` crate for the
//! low-level SOAP exchange.
//!
//! # Endpoint Resolution
//!
//! Sets expose the IRCC service on one of two paths. Resolve it once per
//! device and keep the result:
//!
//! ```rust,no_run
//! use bravia_api::{CommandCode, IrccClient, ResolvedSettings};
//!
//! # async fn run() -> Result<(), bravia_api::CommandError> {
//! let client = IrccClient::new();
//! let endpoint = client.resolve_endpoint("192.168.1.20").await;
//!
//! let settings = ResolvedSettings::new("192.168.1.20", endpoint);
//! client.send_command(settings.as_ref(), &CommandCode::new("AAAAAQAAAAEAAAASAw==")).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod command;
pub mod endpoint;
pub mod error;
pub mod transport;

pub use client::{IrccClient, ResolvedSettings};
pub use command::{CommandCode, CommandTable, RemoteAction};
pub use endpoint::Endpoint;
pub use error::{ApiError, CommandError, Result};
pub use transport::IrccTransport;

pub use soap_client::{HttpResponse, SoapClient, SoapError};
