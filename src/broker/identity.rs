//! Identity allocation
//!
//! Every accepted connection gets a `client-<uuid>` identity. The allocator
//! checks candidates against the live set so an identity is never handed
//! out twice while its holder is still connected.

use std::fmt;

use uuid::Uuid;

pub type ConnectionId = String;

pub struct IdentityAllocator {
    generate: Box<dyn FnMut() -> ConnectionId + Send>,
}

impl IdentityAllocator {
    /// Allocator backed by random v4 UUIDs.
    pub fn new() -> Self {
        Self::with_generator(|| format!("client-{}", Uuid::new_v4()))
    }

    /// Allocator with a custom candidate source. Candidates must not contain
    /// `:` or `,`.
    pub fn with_generator<F>(generate: F) -> Self
    where
        F: FnMut() -> ConnectionId + Send + 'static,
    {
        Self {
            generate: Box::new(generate),
        }
    }

    /// Returns an identity for which `is_live` is false.
    pub fn allocate<F>(&mut self, is_live: F) -> ConnectionId
    where
        F: Fn(&str) -> bool,
    {
        loop {
            let candidate = (self.generate)();
            if !is_live(&candidate) {
                return candidate;
            }
        }
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdentityAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAllocator").finish_non_exhaustive()
    }
}
