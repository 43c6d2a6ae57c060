pub use keel_core::*;
pub use keel_macros::*;
