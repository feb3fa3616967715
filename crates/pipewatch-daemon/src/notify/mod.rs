mod dispatcher;
mod messages;
mod sink;

pub use dispatcher::{DeliverySummary, Notifier};
pub use messages::MessageBuilder;
pub use sink::{NotificationSink, TelegramSink};

#[cfg(test)]
pub(crate) mod testing;
