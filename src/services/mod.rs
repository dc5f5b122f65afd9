pub mod authenticator;
pub mod ingest;
