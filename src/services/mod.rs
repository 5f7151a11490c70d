pub mod cart;
pub mod checkout;
pub mod orders;
pub mod user_data;
