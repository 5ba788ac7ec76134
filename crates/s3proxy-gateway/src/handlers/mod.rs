//! Terminal request handlers

pub mod fetch;

pub use fetch::ObjectFetchHandler;
