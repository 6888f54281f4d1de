pub mod notifier;
pub mod time_source;
