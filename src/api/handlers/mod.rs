pub mod health;
pub mod telemetry;
pub mod upload;
