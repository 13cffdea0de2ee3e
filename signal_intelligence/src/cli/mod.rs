pub mod load;
pub mod server;
