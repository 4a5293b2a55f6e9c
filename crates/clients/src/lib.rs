//! HTTP adapters for the external collaborators of the automation engine.
//!
//! - [`LandivoClient`]: properties and buyers from the Landivo listing API.
//! - [`MailivoApiClient`]: campaign creation and template lookup on the
//!   Mailivo campaign API.

pub mod error;
mod http;
pub mod landivo;
pub mod mailivo;

pub use error::ClientError;
pub use http::build_http_client;
pub use landivo::LandivoClient;
pub use mailivo::MailivoApiClient;
