use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::error::ReaderError;
use crate::state::FavoritesStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteUpdated {
    pub reference: String,
    pub is_favorite: bool,
}

/// Fan-out of favorite changes to every view that shows a star.
///
/// Subscribers hold a plain receiver and drain it on their own schedule;
/// dropped receivers are pruned on the next publish.
#[derive(Debug, Default)]
pub struct FavoriteBus {
    subscribers: Mutex<Vec<Sender<FavoriteUpdated>>>,
}

impl FavoriteBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<FavoriteUpdated> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    pub fn publish(&self, event: FavoriteUpdated) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        log::debug!(
            "favorite {} -> {} ({} subscribers)",
            event.reference,
            event.is_favorite,
            subscribers.len()
        );
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// Flip a favorite optimistically.
///
/// Subscribers see the new star before the store is touched. A failed write
/// publishes the old state back; a store that disagrees gets the final say.
pub fn toggle_favorite(
    store: &dyn FavoritesStore,
    bus: &FavoriteBus,
    user: &str,
    reference: &str,
    preview: &str,
    was_favorite: bool,
) -> Result<bool, ReaderError> {
    bus.publish(FavoriteUpdated {
        reference: reference.to_string(),
        is_favorite: !was_favorite,
    });

    match store.toggle_favorite(user, reference, preview) {
        Ok(is_favorite) => {
            if is_favorite == was_favorite {
                bus.publish(FavoriteUpdated {
                    reference: reference.to_string(),
                    is_favorite,
                });
            }
            Ok(is_favorite)
        }
        Err(err) => {
            log::error!("favorite toggle for {} failed: {}", reference, err);
            bus.publish(FavoriteUpdated {
                reference: reference.to_string(),
                is_favorite: was_favorite,
            });
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Store whose writes either fail or report a fixed state.
    struct FixedStore {
        result: Option<bool>,
        calls: Cell<usize>,
    }

    impl FavoritesStore for FixedStore {
        fn is_favorite(&self, _user: &str, _reference: &str) -> Result<bool, ReaderError> {
            Ok(self.result.unwrap_or(false))
        }

        fn toggle_favorite(&self, _user: &str, _reference: &str, _preview: &str) -> Result<bool, ReaderError> {
            self.calls.set(self.calls.get() + 1);
            self.result
                .ok_or_else(|| ReaderError::PersistenceFailure("disk I/O error".to_string()))
        }
    }

    fn drain(rx: &Receiver<FavoriteUpdated>) -> Vec<bool> {
        rx.try_iter().map(|event| event.is_favorite).collect()
    }

    #[test]
    fn test_every_subscriber_sees_the_event() {
        let bus = FavoriteBus::new();
        let header = bus.subscribe();
        let section = bus.subscribe();

        let event = FavoriteUpdated {
            reference: "Gênesis 1".to_string(),
            is_favorite: true,
        };
        bus.publish(event.clone());

        assert_eq!(header.try_recv().unwrap(), event);
        assert_eq!(section.try_recv().unwrap(), event);
        assert!(header.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let bus = FavoriteBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(FavoriteUpdated {
            reference: "Êxodo 3".to_string(),
            is_favorite: false,
        });
        assert_eq!(bus.subscriber_count(), 1);
        assert!(!kept.try_recv().unwrap().is_favorite);
    }

    #[test]
    fn test_failed_toggle_restores_the_star() {
        let store = FixedStore { result: None, calls: Cell::new(0) };
        let bus = FavoriteBus::new();
        let header = bus.subscribe();
        let section = bus.subscribe();

        for was in [false, true] {
            let err = toggle_favorite(&store, &bus, "ana", "Salmos 23", "", was).unwrap_err();
            assert!(matches!(err, ReaderError::PersistenceFailure(_)));
            assert_eq!(drain(&header), vec![!was, was]);
            assert_eq!(drain(&section), vec![!was, was]);
        }
        assert_eq!(store.calls.get(), 2);
    }

    #[test]
    fn test_successful_toggle_publishes_once() {
        let store = FixedStore { result: Some(true), calls: Cell::new(0) };
        let bus = FavoriteBus::new();
        let rx = bus.subscribe();

        assert!(toggle_favorite(&store, &bus, "ana", "Salmos 23", "", false).unwrap());
        assert_eq!(drain(&rx), vec![true]);
    }

    #[test]
    fn test_store_disagreement_is_republished() {
        let store = FixedStore { result: Some(true), calls: Cell::new(0) };
        let bus = FavoriteBus::new();
        let rx = bus.subscribe();

        assert!(toggle_favorite(&store, &bus, "ana", "Salmos 23", "", true).unwrap());
        assert_eq!(drain(&rx), vec![false, true]);
    }
}
