pub mod capture;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod notice;
pub mod options;
pub mod provider;
pub mod relay;
pub mod retry;
pub mod wizard;

#[cfg(test)]
pub(crate) mod test_support;
