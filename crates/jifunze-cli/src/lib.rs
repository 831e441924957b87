//! # Jifunze CLI
//!
//! Administrative commands for a Jifunze database:
//!
//! - [`admin::create_manager`] provisions the first manager account.
//! - [`admin::purge_reset_tokens`] sweeps expired password reset tokens.
//! - [`seeder`] fills the database with demo tenants and clears them again.
//!
//! ## Usage
//!
//! ```ignore
//! use jifunze_cli::seeder::{seed_all, SeedConfig};
//!
//! let config = SeedConfig::new(3); // 3 schools with defaults
//! seed_all(&pool, config).await?;
//! ```

pub mod admin;
pub mod seeder;
