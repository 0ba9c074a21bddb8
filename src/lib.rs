pub mod config;
pub mod http_client;
pub mod ingest;
pub mod logging;
pub mod opendota;
pub mod pagination;
pub mod records;
pub mod store;
