//! Collaborator implementations for the heating controller.
//!
//! - `sim`: in-memory bed and token service (default backend)
//! - `store`: TOML-file profile store
//! - `http` (feature): the vendor's HTTPS API

pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod sim;
pub mod store;

pub use error::DeviceError;
#[cfg(feature = "http")]
pub use http::{VendorClient, VendorClientCfg};
pub use sim::{SimulatedAuth, SimulatedBed};
pub use store::TomlProfileStore;
