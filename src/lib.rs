pub mod config;
pub mod provider;
pub mod store;
pub mod tui;
pub mod vcs;

#[cfg(test)]
mod test_support;
