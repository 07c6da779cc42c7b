pub mod api;
pub mod config;
pub mod countdown;
pub mod lifecycle;
pub mod logging;
pub mod poller;
pub mod render;
pub mod selection;

#[cfg(test)]
mod test_helpers;
