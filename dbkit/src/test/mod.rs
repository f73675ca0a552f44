pub mod sync_client;

mod client;
