//! Auth-domain identifiers, token secrets, and acquisition results.

pub mod id;
pub mod result;
pub mod secret;

pub use id::*;
pub use result::*;
pub use secret::*;
