pub mod adapters;
pub mod selector;
pub mod state;
pub mod worker;
