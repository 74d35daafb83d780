pub mod board;
pub mod clock;
pub mod completion;
pub mod config;
pub mod drag;
pub mod model;
pub mod notify;
pub mod pin;
pub mod point;
pub mod records;
pub mod reminder;
pub mod session;
pub mod stats;
pub mod store;
pub mod timer;
