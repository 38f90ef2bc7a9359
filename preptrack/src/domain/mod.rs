mod dates;
mod entry;
mod schedule;
mod stats;
mod user;

pub use dates::*;
pub use entry::*;
pub use schedule::*;
pub use stats::*;
pub use user::*;
