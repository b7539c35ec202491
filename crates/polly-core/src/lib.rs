pub mod completion;
pub mod config;
pub mod error;
pub mod future_features;
pub mod increments;
pub mod instructions;
pub mod machine;
pub mod paths;
pub mod phase;
pub mod session;
pub mod skills;
pub mod slug;
pub mod template;

pub use error::{PollyError, Result};
