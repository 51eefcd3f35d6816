pub mod cache;
pub mod calc;
pub mod config;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod pages;
pub mod repo;
pub mod search;
pub mod store;
