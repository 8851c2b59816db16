//! Handlers behind the `/api` routes.

pub mod signers;
pub mod vault;
pub mod withdraw;
