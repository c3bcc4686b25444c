pub mod notifications;

pub use notifications::{CompletionNotifier, DesktopNotifier, LogNotifier};
