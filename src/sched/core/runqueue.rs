//! Fila de threads prontas
//!
//! Um bucket FIFO por nível de prioridade mais um bitcache: o bit `n` está
//! ligado sse o bucket `n` não está vazio. Inserir, remover e escolher são
//! O(1); a escolhida é a cabeça do bucket do bit menos significativo
//! (menor valor = maior prioridade).

use crate::klib::{LinkArena, LinkKind, TidList};
use crate::sched::config::PRIORITY_LEVELS;
use crate::sys::{Priority, Tid};

const KIND: LinkKind = LinkKind::RunQueue;

pub struct RunQueue {
    buckets: [TidList; PRIORITY_LEVELS],
    bitcache: u32,
}

impl RunQueue {
    pub const fn new() -> Self {
        Self {
            buckets: [TidList::new(); PRIORITY_LEVELS],
            bitcache: 0,
        }
    }

    /// Adiciona no fim do bucket da prioridade.
    pub fn push<A: LinkArena + ?Sized>(&mut self, arena: &mut A, tid: Tid, priority: Priority) {
        let index = priority.as_index();
        self.buckets[index].push_back(arena, KIND, tid);
        self.bitcache |= 1 << index;
    }

    /// Remove do bucket. Retorna false se não estava encadeada.
    pub fn remove<A: LinkArena + ?Sized>(&mut self, arena: &mut A, tid: Tid, priority: Priority) -> bool {
        let index = priority.as_index();
        let bucket = &mut self.buckets[index];
        let removed = bucket.remove(arena, KIND, tid);
        if bucket.is_empty() {
            self.bitcache &= !(1 << index);
        }
        removed
    }

    /// Cabeça do bucket mais prioritário não vazio.
    pub fn highest(&self) -> Option<Tid> {
        if self.bitcache == 0 {
            return None;
        }
        let index = self.bitcache.trailing_zeros() as usize;
        self.buckets[index].head()
    }

    /// Prioridade do bucket mais prioritário não vazio.
    pub fn highest_priority(&self) -> Option<Priority> {
        if self.bitcache == 0 {
            return None;
        }
        Priority::new(self.bitcache.trailing_zeros() as u8)
    }

    /// Manda `tid` para o fim do seu bucket. Se já é a cabeça (o caso de
    /// quem está rodando), basta girar.
    pub fn requeue<A: LinkArena + ?Sized>(&mut self, arena: &mut A, tid: Tid, priority: Priority) {
        if self.buckets[priority.as_index()].head() == Some(tid) {
            self.rotate(arena, priority);
        } else if self.remove(arena, tid, priority) {
            self.push(arena, tid, priority);
        }
    }

    /// Round-robin: cabeça do bucket vai para o fim.
    pub fn rotate<A: LinkArena + ?Sized>(&mut self, arena: &mut A, priority: Priority) {
        self.buckets[priority.as_index()].rotate(arena, KIND);
    }

    pub fn contains<A: LinkArena + ?Sized>(&self, arena: &A, tid: Tid, priority: Priority) -> bool {
        self.buckets[priority.as_index()].contains(arena, KIND, tid)
    }

    pub fn bucket(&self, priority: Priority) -> &TidList {
        &self.buckets[priority.as_index()]
    }

    pub fn bitcache(&self) -> u32 {
        self.bitcache
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(TidList::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bitcache == 0
    }
}

impl Default for RunQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klib::Link;
    use alloc::vec::Vec;

    struct Arena(Vec<Link>);

    impl LinkArena for Arena {
        fn link(&self, tid: Tid, _: LinkKind) -> Option<&Link> {
            self.0.get(tid.as_index())
        }

        fn link_mut(&mut self, tid: Tid, _: LinkKind) -> Option<&mut Link> {
            self.0.get_mut(tid.as_index())
        }
    }

    fn prio(level: u8) -> Priority {
        Priority::new(level).unwrap()
    }

    #[test]
    fn lowest_value_bucket_is_selected() {
        let mut arena = Arena(alloc::vec![Link::new(); 8]);
        let mut rq = RunQueue::new();
        assert_eq!(rq.highest(), None);

        rq.push(&mut arena, Tid(1), prio(7));
        rq.push(&mut arena, Tid(2), prio(3));
        rq.push(&mut arena, Tid(3), prio(3));
        assert_eq!(rq.highest(), Some(Tid(2)));
        assert_eq!(rq.highest_priority(), Some(prio(3)));
        assert_eq!(rq.bitcache(), (1 << 7) | (1 << 3));

        rq.rotate(&mut arena, prio(3));
        assert_eq!(rq.highest(), Some(Tid(3)));
    }

    #[test]
    fn requeue_moves_thread_to_bucket_tail() {
        let mut arena = Arena(alloc::vec![Link::new(); 5]);
        let mut rq = RunQueue::new();
        for id in 1..=3 {
            rq.push(&mut arena, Tid(id), prio(4));
        }
        let order = |rq: &RunQueue, arena: &Arena| -> Vec<u16> {
            rq.bucket(prio(4)).iter(arena, KIND).map(Tid::as_u16).collect()
        };

        rq.requeue(&mut arena, Tid(1), prio(4));
        assert_eq!(order(&rq, &arena), [2, 3, 1]);
        rq.requeue(&mut arena, Tid(3), prio(4));
        assert_eq!(order(&rq, &arena), [2, 1, 3]);

        // fora da fila: nada muda
        rq.requeue(&mut arena, Tid(4), prio(4));
        assert_eq!(rq.len(), 3);
    }

    #[test]
    fn emptying_a_bucket_clears_its_bit() {
        let mut arena = Arena(alloc::vec![Link::new(); 4]);
        let mut rq = RunQueue::new();
        rq.push(&mut arena, Tid(1), prio(2));
        rq.push(&mut arena, Tid(2), prio(9));
        assert!(rq.remove(&mut arena, Tid(1), prio(2)));
        assert_eq!(rq.bitcache(), 1 << 9);
        assert_eq!(rq.highest(), Some(Tid(2)));
        assert!(!rq.remove(&mut arena, Tid(1), prio(2)));
        assert!(rq.remove(&mut arena, Tid(2), prio(9)));
        assert!(rq.is_empty());
        assert_eq!(rq.len(), 0);
    }
}
