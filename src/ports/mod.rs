pub mod counter_store;
pub mod http_client;
