pub mod availability;
pub mod schedule;
pub mod session;
pub mod shift;
pub mod user;
