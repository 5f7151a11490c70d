//! sea-orm models for the shop schema created by [`crate::migrator`].

pub mod account;
pub mod cart;
pub mod delivery;
pub mod order;
pub mod order_line;
pub mod order_status;
pub mod payment_method;
pub mod product;
pub mod size;
pub mod user;
pub mod variant;
