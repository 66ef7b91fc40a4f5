use tracing::{Event, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

use super::visitor::EventFields;
use crate::Level;

/// A [`tracing_subscriber::Layer`] forwarding events of intercepted sources.
///
/// The event's `message` becomes the record message, falling back to the event target if the
/// event has none. All other event fields are forwarded as record fields.
///
/// ```
/// use service_logger::bridge::InterceptLayer;
/// use tracing_subscriber::layer::SubscriberExt;
///
/// let subscriber = tracing_subscriber::registry().with(InterceptLayer::new());
/// # drop(subscriber);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct InterceptLayer;

impl InterceptLayer {
    /// Creates a new layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S: Subscriber> Layer<S> for InterceptLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from(*metadata.level());
        if !super::is_forwarded(metadata.target(), level) {
            return;
        }

        let mut visitor = EventFields::default();
        event.record(&mut visitor);
        let (message, fields) = visitor.into_parts();

        super::forward(
            metadata.target(),
            metadata.module_path(),
            level,
            message.as_deref().unwrap_or(metadata.target()),
            fields,
        );
    }
}
