pub mod subnoto_client;

pub use subnoto_client::SubnotoClient;
