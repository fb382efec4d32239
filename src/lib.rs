#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # GCDM Client
//!
//! Fetches netCDF file headers and variable data from a remote GCDM gRPC
//! server and decodes them into an in-memory file.
//!
//! ## Architecture
//!
//! - **[`error`]** - Error types and exit codes
//! - **[`config`]** - Server address, timeouts and chunk policy
//! - **[`proto`]** - Wire messages of the `ucar.gcdm` protocol
//! - **[`client`]** - gRPC transport behind the [`client::GcdmService`] trait
//! - **[`fetch`]** - The header → data → decode pipeline
//! - **[`decode`]** - Decoder trait and the netCDF decoder
//! - **[`output`]** - Text, JSON and CBOR rendering
//!
//! ## Quick Start
//!
//! ```bash
//! gcdm fetch ./test/data/test.nc analysed_sst
//! gcdm header ./test/data/test.nc --format json
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod output;
pub mod proto;

/// Error type alias for convenience
pub use error::{GcdmError, Result};

/// Configuration type alias for convenience
pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = "gcdm";
