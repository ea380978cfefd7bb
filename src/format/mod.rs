/// MPEG Transport Stream scanning and PID extraction
pub mod ts;

pub use self::ts::{StreamIndex, TSSource};
