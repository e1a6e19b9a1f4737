pub mod courier;
pub mod order;
