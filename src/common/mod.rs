pub mod garmin_client;
pub mod libra_client;
pub mod oauth1;
pub mod sso;
pub mod token_store;
pub mod types;
