pub mod controller;
pub mod credentials;
pub mod router;
pub mod service;

pub use router::init_auth_router;
