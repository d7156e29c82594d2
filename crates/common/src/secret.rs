//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types. Use them for the gateway bearer token,
//! the ingress token and anything else that must never reach a log line.
//!
//! `SecretString` implements `Debug` with redaction, so deriving `Debug` on a
//! struct that holds one stays safe. The value is zeroized on drop.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct GatewayCredentials {
//!     url: String,
//!     token: SecretString,
//! }
//!
//! let creds = GatewayCredentials {
//!     url: "http://gateway:8080".to_string(),
//!     token: SecretString::from("t0ken"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("t0ken"));
//! assert_eq!(creds.token.expose_secret(), "t0ken");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
