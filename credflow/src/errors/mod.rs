pub mod error;
mod mapping_others;

pub use error::{CredflowError, CredflowErrorKind, CredflowResult};
