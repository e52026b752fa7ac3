//! Request handlers that sit outside the bridged route table

pub mod health;

pub use health::health_router;
