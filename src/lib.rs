pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod debounce;
pub mod filter;
pub mod index;
pub mod output;
pub mod pager;
pub mod record;
pub mod session;
pub mod view;

#[cfg(test)]
mod tests;
