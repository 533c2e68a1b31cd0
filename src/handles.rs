//! Transient display handles.
//!
//! A [`DisplayHandle`] is a short-lived, revocable reference to an in-memory
//! byte buffer that the presentation layer can use as an image source
//! (think `blob:` URLs). Handles are move-only: the record holding one owns
//! it, and [`HandleAllocator::revoke`] consumes it, so a handle cannot be
//! released twice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An owned reference to a buffer registered with a [`HandleAllocator`].
#[derive(Debug, PartialEq, Eq)]
pub struct DisplayHandle {
    key: u64,
    url: String,
}

impl DisplayHandle {
    /// Locally resolvable URL for the buffer.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl serde::Serialize for DisplayHandle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.url)
    }
}

/// Allocates, resolves and revokes transient handles.
pub trait HandleAllocator: Send + Sync {
    fn allocate(&self, bytes: Arc<[u8]>) -> DisplayHandle;

    /// The buffer behind `handle`, or `None` once it has been revoked.
    fn resolve(&self, handle: &DisplayHandle) -> Option<Arc<[u8]>>;

    /// Release the buffer. Consumes the handle.
    fn revoke(&self, handle: DisplayHandle);
}

/// In-process allocator backed by a map. Tracks allocation and revocation
/// counts so callers can audit that every handle is released.
#[derive(Debug, Default)]
pub struct MemoryHandles {
    buffers: Mutex<HashMap<u64, Arc<[u8]>>>,
    next_key: AtomicU64,
    allocated: AtomicUsize,
    revoked: AtomicUsize,
}

impl MemoryHandles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn revoked(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }

    /// Handles allocated and not yet revoked.
    pub fn live(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl HandleAllocator for MemoryHandles {
    fn allocate(&self, bytes: Arc<[u8]>) -> DisplayHandle {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst) + 1;
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, bytes);
        self.allocated.fetch_add(1, Ordering::SeqCst);
        DisplayHandle {
            key,
            url: format!("blob:imgconv/{key}"),
        }
    }

    fn resolve(&self, handle: &DisplayHandle) -> Option<Arc<[u8]>> {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle.key)
            .cloned()
    }

    fn revoke(&self, handle: DisplayHandle) {
        let removed = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.key);
        match removed {
            Some(_) => {
                self.revoked.fetch_add(1, Ordering::SeqCst);
            }
            None => tracing::warn!(url = %handle.url, "revoked a handle this allocator does not own"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_resolve() {
        let handles = MemoryHandles::new();
        let handle = handles.allocate(Arc::from(&b"abc"[..]));

        assert!(handle.url().starts_with("blob:imgconv/"));
        assert_eq!(handles.resolve(&handle).as_deref(), Some(&b"abc"[..]));
        assert_eq!(handles.live(), 1);
    }

    #[test]
    fn revoke_frees_buffer_and_counts() {
        let handles = MemoryHandles::new();
        let a = handles.allocate(Arc::from(&b"a"[..]));
        let b = handles.allocate(Arc::from(&b"b"[..]));
        assert_ne!(a.url(), b.url());

        handles.revoke(a);
        assert_eq!(handles.allocated(), 2);
        assert_eq!(handles.revoked(), 1);
        assert_eq!(handles.live(), 1);
        assert!(handles.resolve(&b).is_some());
    }

    #[test]
    fn unknown_handle_is_not_counted() {
        let ours = MemoryHandles::new();
        let _keep = ours.allocate(Arc::from(&b"x"[..]));

        let stray = DisplayHandle {
            key: 99,
            url: "blob:elsewhere/99".to_string(),
        };
        ours.revoke(stray);
        assert_eq!(ours.revoked(), 0);
        assert_eq!(ours.live(), 1);
    }

    #[test]
    fn handle_serializes_as_url() {
        let handles = MemoryHandles::new();
        let handle = handles.allocate(Arc::from(&b"x"[..]));
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, format!("\"{}\"", handle.url()));
    }
}
