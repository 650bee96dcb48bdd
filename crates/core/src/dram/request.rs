//! Requests (the user-visible unit) and Transactions (their in-flight
//! decomposition once they cross the `transaction_delay` gate).

use super::coords::Coordinates;

/// Index into the request arena. Commands and Transactions hold this
/// instead of a `Request` reference, so there are no cycles.
pub type RequestId = usize;

/// The user-visible memory reference: one `submit` call.
#[derive(Debug, Clone, Copy)]
pub struct Request {
    pub address: u64,
    pub is_write: bool,
    /// Cycle the request was admitted via `submit`.
    pub allocate_time: u64,
    /// Cycle the satisfying data beat completed. `None` until retired.
    pub release_time: Option<u64>,
}

/// A Request's internal decomposition: its decoded Coordinates plus a
/// back-pointer to the owning Request.
#[derive(Debug, Clone, Copy)]
pub struct Transaction {
    pub request_id: RequestId,
    pub coords: Coordinates,
    pub is_write: bool,
}

/// Fixed-capacity arena of live Requests, indexed by `RequestId`.
///
/// Requests are retired (removed) out of order with respect to admission,
/// since distinct banks complete in different orders; a slab of `Option<T>`
/// slots with a free-list is the natural fit, the same shape as the
/// teacher's reorder buffer but without the head/tail ordering constraint
/// since retirement here is keyed by `release_time`, not FIFO position.
#[derive(Debug)]
pub struct RequestArena {
    slots: Vec<Option<Request>>,
    free: Vec<RequestId>,
    len: usize,
}

impl RequestArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).rev().collect(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Inserts a request, returning its id, or `None` if the arena is full.
    pub fn insert(&mut self, request: Request) -> Option<RequestId> {
        let id = self.free.pop()?;
        self.slots[id] = Some(request);
        self.len += 1;
        Some(id)
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.slots[id].as_ref()
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.slots[id].as_mut()
    }

    /// Removes the request at `id`, making the slot available for reuse.
    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        let value = self.slots[id].take();
        if value.is_some() {
            self.free.push(id);
            self.len -= 1;
        }
        value
    }

    /// Ids of all requests whose `release_time` has elapsed by `clock`,
    /// in arena-slot order (phase (g) "Request retirement").
    pub fn retirable(&self, clock: u64) -> Vec<RequestId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| {
                let request = slot.as_ref()?;
                let release = request.release_time?;
                (release <= clock).then_some(id)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(allocate_time: u64) -> Request {
        Request {
            address: 0,
            is_write: false,
            allocate_time,
            release_time: None,
        }
    }

    #[test]
    fn insert_and_remove_reuses_slots() {
        let mut arena = RequestArena::new(2);
        let a = arena.insert(req(0)).unwrap();
        let b = arena.insert(req(1)).unwrap();
        assert!(arena.insert(req(2)).is_none());
        assert!(arena.is_full());
        let _ = arena.remove(a);
        let c = arena.insert(req(2)).unwrap();
        assert_eq!(c, a);
        assert_eq!(arena.get(b).unwrap().allocate_time, 1);
    }

    #[test]
    fn retirable_picks_up_elapsed_release_times() {
        let mut arena = RequestArena::new(3);
        let a = arena.insert(req(0)).unwrap();
        let b = arena.insert(req(0)).unwrap();
        arena.get_mut(a).unwrap().release_time = Some(10);
        arena.get_mut(b).unwrap().release_time = Some(20);
        assert_eq!(arena.retirable(10), vec![a]);
        assert_eq!(arena.retirable(20), vec![a, b]);
    }
}
