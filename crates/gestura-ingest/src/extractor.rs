//! Pose extraction boundary and its exclusive-access handle.
//!
//! The pose extractor is stateful and not reentrant, so every call goes through
//! `ExtractorHandle`, which serializes access across sessions and requests.

use std::sync::Arc;

use gestura_core::LandmarkFrame;
use parking_lot::{Mutex, MutexGuard};

/// Turns one encoded frame into hand landmarks.
///
/// `None` covers both "no hand detected" and "payload could not be decoded".
pub trait PoseExtractor: Send {
    fn extract(&mut self, payload: &[u8]) -> Option<LandmarkFrame>;
}

/// Shared, exclusively-locked pose extractor.
#[derive(Clone)]
pub struct ExtractorHandle {
    inner: Arc<Mutex<Box<dyn PoseExtractor>>>,
}

impl ExtractorHandle {
    pub fn new(extractor: impl PoseExtractor + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(extractor))),
        }
    }

    /// Acquire the extractor; released when the guard drops.
    pub fn acquire(&self) -> MutexGuard<'_, Box<dyn PoseExtractor>> {
        self.inner.lock()
    }

    /// Run one extraction under the lock.
    pub fn extract(&self, payload: &[u8]) -> Option<LandmarkFrame> {
        let mut extractor = self.acquire();
        extractor.extract(payload)
    }
}

/// Decodes payloads that already carry landmarks: a JSON array of 21 `[x, y, z]` triples.
///
/// Used when pose estimation runs on the client.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLandmarkExtractor;

impl PoseExtractor for JsonLandmarkExtractor {
    fn extract(&mut self, payload: &[u8]) -> Option<LandmarkFrame> {
        if payload.is_empty() {
            return None;
        }
        let frame: LandmarkFrame = serde_json::from_slice(payload).ok()?;
        frame.is_finite().then_some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExtractor {
        calls: Arc<AtomicUsize>,
    }

    impl PoseExtractor for CountingExtractor {
        fn extract(&mut self, _payload: &[u8]) -> Option<LandmarkFrame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn test_json_extractor_decodes_landmarks() {
        let payload = serde_json::to_vec(&vec![[0.1f32, 0.2, 0.3]; 21]).unwrap();
        let mut extractor = JsonLandmarkExtractor;
        let frame = extractor.extract(&payload).unwrap();
        assert_eq!(frame.points()[3], [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_json_extractor_rejects_garbage() {
        let mut extractor = JsonLandmarkExtractor;
        assert!(extractor.extract(b"").is_none());
        assert!(extractor.extract(b"data:image/jpeg;base64,AAAA").is_none());
        assert!(extractor.extract(b"[[0,0,0]]").is_none());
    }

    #[test]
    fn test_handle_shares_one_extractor() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = ExtractorHandle::new(CountingExtractor {
            calls: calls.clone(),
        });
        let clone = handle.clone();
        handle.extract(b"a");
        clone.extract(b"b");

        let threads: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                std::thread::spawn(move || {
                    h.extract(b"c");
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert!(handle.acquire().extract(b"d").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }
}
