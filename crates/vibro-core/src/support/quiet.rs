use tracing::dispatcher::DefaultGuard;
use tracing::subscriber::NoSubscriber;

/// Silences tracing output on the current thread until dropped.
///
/// The previous default dispatcher is restored when the guard goes out of
/// scope, including during unwinding.
#[must_use = "output is only silenced while the scope is alive"]
pub struct QuietScope {
    _guard: DefaultGuard,
}

impl QuietScope {
    pub fn enter() -> Self {
        Self {
            _guard: tracing::subscriber::set_default(NoSubscriber::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::span::{Attributes, Id, Record};
    use tracing::{Event, Metadata, Subscriber};

    struct Counting(Arc<AtomicUsize>);

    impl Subscriber for Counting {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &Attributes<'_>) -> Id {
            Id::from_u64(1)
        }
        fn record(&self, _: &Id, _: &Record<'_>) {}
        fn record_follows_from(&self, _: &Id, _: &Id) {}
        fn event(&self, _: &Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _: &Id) {}
        fn exit(&self, _: &Id) {}
    }

    #[test]
    fn restores_previous_dispatcher() {
        let events = Arc::new(AtomicUsize::new(0));
        let _outer = tracing::subscriber::set_default(Counting(Arc::clone(&events)));
        tracing::info!("before");
        {
            let _quiet = QuietScope::enter();
            tracing::info!("silenced");
        }
        tracing::info!("after");
        assert_eq!(events.load(Ordering::SeqCst), 2);
    }
}
