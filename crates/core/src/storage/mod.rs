pub mod logo_store;
