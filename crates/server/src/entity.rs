//! SeaORM entities backing the account store.

pub mod account;
