pub mod data_holder;
pub mod health;
