mod authority;
mod common;
mod issue;
mod role;

pub use authority::*;
pub use common::*;
pub use issue::*;
pub use role::*;
