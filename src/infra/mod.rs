pub mod redirect_uri;
pub mod spotify;
pub mod store;
