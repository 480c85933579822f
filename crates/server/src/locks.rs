//! Per-(user, url) save serialization.
//!
//! Saving an article is check, then ingest, then insert. Two concurrent saves
//! of the same URL for the same user must not both pass the check, so the
//! whole sequence runs under a lock keyed by the pair. Different keys never
//! wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::store::UserId;

type Key = (UserId, String);

#[derive(Debug, Default)]
pub struct SaveLocks {
    slots: Mutex<HashMap<Key, Weak<Mutex<()>>>>,
}

impl SaveLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `(user_id, url)`.
    ///
    /// The lock is released when the guard is dropped.
    pub async fn acquire(&self, user_id: UserId, url: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.retain(|_, slot| slot.strong_count() > 0);

            let key = (user_id, url.to_string());
            match slots.get(&key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(Mutex::new(()));
                    slots.insert(key, Arc::downgrade(&slot));
                    slot
                }
            }
        };

        slot.lock_owned().await
    }

    /// Number of keys currently held or waited on.
    pub async fn active(&self) -> usize {
        self.slots.lock().await.values().filter(|slot| slot.strong_count() > 0).count()
    }
}
