//! The DRAM timing engine and scheduler: address decoding, the
//! bank/rank/channel state hierarchy, and the per-controller scheduler.

pub mod bank;
pub mod channel;
pub mod command;
pub mod controller;
pub mod coords;
pub mod hub;
pub mod rank;
pub mod request;

pub use command::{Command, CommandType};
pub use controller::Controller;
pub use coords::{AddressMapping, BitField, Coordinates};
pub use hub::ControllerHub;
pub use request::{Request, RequestId, Transaction};
