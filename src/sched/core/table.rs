//! Tabela de threads
//!
//! Arena dona de todos os TCBs. O TID é o índice do slot; o slot 0 nunca é
//! usado. Um slot só volta a ficar livre no `remove` (reap), então um TID
//! parado não é reaproveitado antes de ser colhido.

use alloc::vec::Vec;

use crate::klib::{Link, LinkArena, LinkKind, TidList};
use crate::sched::task::Tcb;
use crate::sys::Tid;

pub struct ThreadTable {
    slots: Vec<Option<Tcb>>,
    live: usize,
}

impl ThreadTable {
    /// Maior capacidade possível: todo slot precisa de um TID `u16`.
    pub const MAX_CAPACITY: usize = u16::MAX as usize;

    /// Tabela para TIDs `1..=capacity`, limitada a `MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        if capacity > Self::MAX_CAPACITY {
            crate::kwarn!("(Sched) max_threads acima do limite de TID: ", capacity);
        }
        let capacity = capacity.min(Self::MAX_CAPACITY);
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self { slots, live: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Threads existentes (inclusive Stopped não colhidas)
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Menor TID livre, sem ocupá-lo.
    pub fn free_tid(&self) -> Option<Tid> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .map(|(index, _)| Tid::new(index as u16))
    }

    /// Ocupa o slot do TID do TCB.
    pub fn insert(&mut self, tcb: Tcb) {
        let index = tcb.tid().as_index();
        debug_assert!(index != 0, "slot 0 is reserved");
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(tcb);
                self.live += 1;
            }
            _ => crate::kerror!("(Sched) Slot de TID inválido ou ocupado: ", index),
        }
    }

    /// Libera o slot e devolve o TCB.
    pub fn remove(&mut self, tid: Tid) -> Option<Tcb> {
        if !tid.is_valid() {
            return None;
        }
        let tcb = self.slots.get_mut(tid.as_index())?.take()?;
        self.live -= 1;
        Some(tcb)
    }

    pub fn get(&self, tid: Tid) -> Option<&Tcb> {
        if !tid.is_valid() {
            return None;
        }
        self.slots.get(tid.as_index())?.as_ref()
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Tcb> {
        if !tid.is_valid() {
            return None;
        }
        self.slots.get_mut(tid.as_index())?.as_mut()
    }

    pub fn contains(&self, tid: Tid) -> bool {
        self.get(tid).is_some()
    }

    /// TCBs vivos em ordem de TID.
    pub fn iter(&self) -> impl Iterator<Item = &Tcb> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Insere `tid` em `list` na ordem de prioridade: antes do primeiro nó
    /// de prioridade menor, FIFO entre iguais.
    pub fn file_by_priority(&mut self, list: &mut TidList, kind: LinkKind, tid: Tid) {
        let Some(priority) = self.get(tid).map(Tcb::priority) else {
            return;
        };
        let at = list.iter(self, kind).find(|&other| {
            self.get(other)
                .is_some_and(|tcb| priority.is_higher_than(tcb.priority()))
        });
        list.insert_before(self, kind, at, tid);
    }
}

impl LinkArena for ThreadTable {
    fn link(&self, tid: Tid, kind: LinkKind) -> Option<&Link> {
        self.get(tid).map(|tcb| tcb.link(kind))
    }

    fn link_mut(&mut self, tid: Tid, kind: LinkKind) -> Option<&mut Link> {
        self.get_mut(tid).map(|tcb| tcb.link_mut(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::task::stack::{self, HeapStackAllocator, StackAllocator};
    use crate::sched::task::CreateFlags;
    use crate::sys::Priority;
    use alloc::vec::Vec;

    fn tcb(pool: &mut HeapStackAllocator, id: u16, prio: u8) -> Tcb {
        let region = pool.allocate(256).unwrap();
        let sp = stack::prepare(&region, false);
        Tcb::new(
            Tid::new(id),
            "t",
            Priority::new(prio).unwrap(),
            region,
            sp,
            CreateFlags::empty(),
        )
    }

    #[test]
    fn tids_start_at_one_and_are_not_reused_while_occupied() {
        let mut pool = HeapStackAllocator::new(8 * 1024);
        let mut table = ThreadTable::new(3);
        assert_eq!(table.free_tid(), Some(Tid::new(1)));
        table.insert(tcb(&mut pool, 1, 5));
        table.insert(tcb(&mut pool, 2, 5));
        assert_eq!(table.free_tid(), Some(Tid::new(3)));
        table.insert(tcb(&mut pool, 3, 5));
        assert_eq!(table.free_tid(), None);
        assert_eq!(table.len(), 3);

        assert!(table.remove(Tid::new(2)).is_some());
        assert_eq!(table.free_tid(), Some(Tid::new(2)));
        assert!(table.get(Tid::NONE).is_none());
    }

    #[test]
    fn capacity_is_limited_to_the_tid_range() {
        let table = ThreadTable::new(70_000);
        assert_eq!(table.capacity(), u16::MAX as usize);
        assert_eq!(table.free_tid(), Some(Tid::new(1)));
        assert_eq!(ThreadTable::new(5).capacity(), 5);
    }

    #[test]
    fn priority_filing_is_fifo_among_equals() {
        let mut pool = HeapStackAllocator::new(8 * 1024);
        let mut table = ThreadTable::new(4);
        for (id, prio) in [(1, 6), (2, 3), (3, 6), (4, 3)] {
            table.insert(tcb(&mut pool, id, prio));
        }
        let mut list = TidList::new();
        for id in 1..=4 {
            table.file_by_priority(&mut list, LinkKind::MsgQueue, Tid::new(id));
        }
        let order: Vec<u16> = list
            .iter(&table, LinkKind::MsgQueue)
            .map(Tid::as_u16)
            .collect();
        assert_eq!(order, [2, 4, 1, 3]);
    }
}
