//! # Shared World Access
//!
//! Reader/writer discipline for hosts that share one world across
//! threads: any number of concurrent readers, or exactly one writer.
//! In debug builds, while the write lock is held the world records the
//! holder's thread id and flags mutations arriving from any other
//! thread - catching code that smuggles a `&mut World` across a thread
//! boundary inside a job. Release builds compile the check out.
//!
//! Single-threaded hosts can skip this entirely and own a [`World`]
//! directly; with no recorded writer the mutation check passes.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::world::World;

/// Clonable shared handle to a world behind a reader/writer lock.
#[derive(Clone)]
pub struct SharedWorld {
    inner: Arc<RwLock<World>>,
}

impl SharedWorld {
    /// Wraps a world for shared access.
    #[must_use]
    pub fn new(world: World) -> Self {
        Self {
            inner: Arc::new(RwLock::new(world)),
        }
    }

    /// Acquires shared read access, blocking while a writer holds the
    /// lock.
    pub fn read(&self) -> WorldReadGuard<'_> {
        WorldReadGuard {
            guard: self.inner.read(),
        }
    }

    /// Acquires exclusive write access, blocking until all readers and
    /// writers release.
    pub fn write(&self) -> WorldWriteGuard<'_> {
        let mut guard = self.inner.write();
        guard.begin_write(std::thread::current().id());
        WorldWriteGuard { guard }
    }
}

/// Shared read access to a world.
pub struct WorldReadGuard<'a> {
    guard: RwLockReadGuard<'a, World>,
}

impl Deref for WorldReadGuard<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        &self.guard
    }
}

/// Exclusive write access to a world. Releasing the guard clears the
/// recorded writer thread.
pub struct WorldWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, World>,
}

impl Deref for WorldWriteGuard<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        &self.guard
    }
}

impl DerefMut for WorldWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut World {
        &mut self.guard
    }
}

impl Drop for WorldWriteGuard<'_> {
    fn drop(&mut self) {
        self.guard.end_write();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::object::ObjectDesc;

    #[test]
    fn test_write_then_concurrent_reads() {
        let shared = SharedWorld::new(World::new(WorldConfig::default()).unwrap());

        let id = {
            let mut world = shared.write();
            world.create_object(&ObjectDesc {
                name: "shared".to_owned(),
                ..ObjectDesc::default()
            })
        };

        let a = shared.clone();
        let b = shared.clone();
        std::thread::scope(|scope| {
            scope.spawn(|| assert!(a.read().is_valid(id)));
            scope.spawn(|| assert_eq!(b.read().object(id).unwrap().name(), "shared"));
        });
    }

    #[test]
    fn test_writer_thread_is_cleared_on_release() {
        let shared = SharedWorld::new(World::new(WorldConfig::default()).unwrap());
        {
            let mut world = shared.write();
            world.tick(0.016);
        }
        // A second writer (same or another thread) must acquire cleanly.
        let mut world = shared.write();
        world.tick(0.016);
        assert_eq!(world.clock().tick(), 2);
    }
}
