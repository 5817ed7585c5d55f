//! Randomness source
//!
//! The engine asks the source for random words and later receives them
//! through its fulfillment callback. Requesting and fulfilling are separate
//! steps: whatever delivers the words (an external service, or the node's
//! own fulfillment task) calls back into the engine with the request id.

use crate::ids::RequestId;
use rand::RngCore;
use std::sync::{Arc, Mutex};

/// Allocates randomness requests
pub trait RandomnessSource {
    /// Register a request for `num_words` random words, returning the id
    /// the eventual response must carry
    fn request_random_words(&mut self, num_words: u32) -> RequestId;
}

/// A request waiting to be fulfilled by the node's fulfillment task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRequest {
    pub request_id: RequestId,
    pub num_words: u32,
}

/// Local randomness source
///
/// Plays the external service's role inside a single node: requests queue
/// up here, and the fulfillment task drains them, draws words from the OS
/// generator, and calls the engine back.
#[derive(Debug)]
pub struct LocalRandomnessSource {
    next_id: RequestId,
    open: Vec<OpenRequest>,
}

impl Default for LocalRandomnessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRandomnessSource {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            open: Vec::new(),
        }
    }

    /// Drain requests that still need fulfilling
    pub fn take_open_requests(&mut self) -> Vec<OpenRequest> {
        std::mem::take(&mut self.open)
    }

    /// Draw `num_words` words from the OS generator
    pub fn draw_words(num_words: u32) -> Vec<u64> {
        let mut rng = rand::rngs::OsRng;
        (0..num_words).map(|_| rng.next_u64()).collect()
    }
}

impl RandomnessSource for LocalRandomnessSource {
    fn request_random_words(&mut self, num_words: u32) -> RequestId {
        let request_id = self.next_id;
        self.next_id += 1;
        self.open.push(OpenRequest {
            request_id,
            num_words,
        });
        request_id
    }
}

/// Cloneable handle sharing one local source between the engine and the
/// node's fulfillment task
#[derive(Debug, Clone)]
pub struct SharedRandomnessSource {
    inner: Arc<Mutex<LocalRandomnessSource>>,
}

impl Default for SharedRandomnessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedRandomnessSource {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LocalRandomnessSource::new())),
        }
    }

    /// Drain requests that still need fulfilling
    pub fn take_open_requests(&self) -> Vec<OpenRequest> {
        self.inner.lock().unwrap().take_open_requests()
    }
}

impl RandomnessSource for SharedRandomnessSource {
    fn request_random_words(&mut self, num_words: u32) -> RequestId {
        self.inner.lock().unwrap().request_random_words(num_words)
    }
}

/// Deterministic source for tests: ids count up, nothing queues
#[derive(Debug)]
pub struct SequentialRandomnessSource {
    next_id: RequestId,
}

impl Default for SequentialRandomnessSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialRandomnessSource {
    pub fn new() -> Self {
        Self { next_id: 1 }
    }
}

impl RandomnessSource for SequentialRandomnessSource {
    fn request_random_words(&mut self, _num_words: u32) -> RequestId {
        let request_id = self.next_id;
        self.next_id += 1;
        request_id
    }
}
