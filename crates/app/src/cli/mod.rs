pub mod args;
pub mod logging;
pub mod op;
pub mod ops;

pub use ops::{BoxValue, Id, Init, Sign, Tag, Unbox, Verify, Version};
