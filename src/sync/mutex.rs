//! Mutex de kernel - bloqueia a thread em vez de girar
//!
//! # Diferença do Spinlock
//!
//! - Mutex PODE bloquear (a thread sai da run-queue como MutexBlocked)
//! - Spinlock NÃO pode dormir (busy-wait com IRQs desligadas)
//!
//! A fila de espera usa o `msg_link` dos TCBs, em ordem de prioridade
//! (FIFO entre iguais). No unlock a posse passa direto para a cabeça da
//! fila, que volta a Pending já como dona.

use alloc::vec::Vec;

use crate::klib::{LinkKind, TidList};
use crate::sched::core::Scheduler;
use crate::sched::task::{MutexId, ThreadStatus, WaitData};
use crate::sys::{SchedError, SchedResult, Tid};

const KIND: LinkKind = LinkKind::MsgQueue;

/// Estado de um mutex de kernel
#[derive(Debug, Default)]
pub struct KMutex {
    /// Dona atual
    pub(crate) owner: Option<Tid>,
    /// Threads MutexBlocked, mais prioritária na cabeça
    pub(crate) waiters: TidList,
}

impl KMutex {
    pub const fn new() -> Self {
        Self {
            owner: None,
            waiters: TidList::new(),
        }
    }

    pub fn owner(&self) -> Option<Tid> {
        self.owner
    }

    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Registro dos mutexes vivos
pub struct MutexTable {
    mutexes: Vec<(MutexId, KMutex)>,
    next_id: u32,
}

impl MutexTable {
    pub const fn new() -> Self {
        Self {
            mutexes: Vec::new(),
            next_id: 1,
        }
    }

    /// Próximo ID livre. Ao dar a volta, pula IDs ainda vivos; 0 é
    /// reservado.
    fn create(&mut self) -> MutexId {
        let id = loop {
            let candidate = MutexId(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if self.get(candidate).is_none() {
                break candidate;
            }
        };
        self.mutexes.push((id, KMutex::new()));
        id
    }

    fn remove(&mut self, id: MutexId) -> Option<KMutex> {
        let pos = self.mutexes.iter().position(|(m, _)| *m == id)?;
        Some(self.mutexes.swap_remove(pos).1)
    }

    pub fn get(&self, id: MutexId) -> Option<&KMutex> {
        self.mutexes.iter().find(|(m, _)| *m == id).map(|(_, k)| k)
    }

    pub(crate) fn get_mut(&mut self, id: MutexId) -> Option<&mut KMutex> {
        self.mutexes
            .iter_mut()
            .find(|(m, _)| *m == id)
            .map(|(_, k)| k)
    }

    /// Mutexes que `tid` possui
    fn owned_by(&self, tid: Tid) -> Vec<MutexId> {
        self.mutexes
            .iter()
            .filter(|(_, k)| k.owner == Some(tid))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mutexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutexes.is_empty()
    }
}

impl Default for MutexTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// OPERAÇÕES DE MUTEX NO SCHEDULER
// =============================================================================

impl Scheduler {
    pub fn mutex_create(&mut self) -> MutexId {
        let id = self.mutexes.create();
        crate::ktrace!("(Mutex) Criado. ID=", id.as_u32());
        id
    }

    /// Destroi um mutex livre e sem fila.
    pub fn mutex_destroy(&mut self, id: MutexId) -> SchedResult<()> {
        let mutex = self.mutexes.get(id).ok_or(SchedError::InvalidHandle)?;
        if mutex.is_locked() || !mutex.waiters.is_empty() {
            return Err(SchedError::Busy);
        }
        self.mutexes.remove(id);
        Ok(())
    }

    /// Adquire ou bloqueia.
    ///
    /// Retorna `true` se `tid` virou dona agora, `false` se ficou
    /// MutexBlocked (a posse chega junto com o desbloqueio).
    pub fn mutex_lock(&mut self, tid: Tid, id: MutexId) -> SchedResult<bool> {
        self.require_runnable(tid)?;
        let mutex = self.mutexes.get_mut(id).ok_or(SchedError::InvalidHandle)?;
        let owner = mutex.owner;
        match owner {
            None => {
                mutex.owner = Some(tid);
                crate::ktrace!("(Mutex) Adquirido por TID=", tid.as_u16());
                Ok(true)
            }
            Some(owner) if owner == tid => Err(SchedError::Busy),
            Some(_) => {
                self.block(tid, ThreadStatus::MutexBlocked, WaitData::Mutex(id))?;
                if let Some(mutex) = self.mutexes.get_mut(id) {
                    self.threads.file_by_priority(&mut mutex.waiters, KIND, tid);
                }
                crate::kdebug!("(Mutex) Contenção, bloqueando TID=", tid.as_u16());
                self.verify();
                Ok(false)
            }
        }
    }

    /// Adquire sem bloquear; `WouldBlock` se já tem dona.
    pub fn mutex_trylock(&mut self, tid: Tid, id: MutexId) -> SchedResult<()> {
        self.require_runnable(tid)?;
        let mutex = self.mutexes.get_mut(id).ok_or(SchedError::InvalidHandle)?;
        match mutex.owner {
            None => {
                mutex.owner = Some(tid);
                Ok(())
            }
            Some(owner) if owner == tid => Err(SchedError::Busy),
            Some(_) => Err(SchedError::WouldBlock),
        }
    }

    /// Libera. A posse passa para a espera mais prioritária, que é
    /// retornada.
    pub fn mutex_unlock(&mut self, tid: Tid, id: MutexId) -> SchedResult<Option<Tid>> {
        let mutex = self.mutexes.get(id).ok_or(SchedError::InvalidHandle)?;
        if mutex.owner != Some(tid) {
            crate::kwarn!("(Mutex) unlock por quem não é dona. TID=", tid.as_u16());
            return Err(SchedError::NotOwner);
        }
        let next = self.mutex_hand_over(id);
        self.verify();
        Ok(next)
    }

    pub fn mutex_owner(&self, id: MutexId) -> SchedResult<Option<Tid>> {
        self.mutexes
            .get(id)
            .map(KMutex::owner)
            .ok_or(SchedError::InvalidHandle)
    }

    /// Fila de espera, cabeça primeiro.
    pub fn mutex_waiters(&self, id: MutexId) -> SchedResult<Vec<Tid>> {
        let mutex = self.mutexes.get(id).ok_or(SchedError::InvalidHandle)?;
        Ok(mutex.waiters.iter(&self.threads, KIND).collect())
    }

    /// Passa a posse para a cabeça da fila (ou libera).
    fn mutex_hand_over(&mut self, id: MutexId) -> Option<Tid> {
        let mutex = self.mutexes.get_mut(id)?;
        let next = mutex.waiters.pop_front(&mut self.threads, KIND);
        mutex.owner = next;
        match next {
            Some(waiter) => {
                crate::kdebug!("(Mutex) Posse transferida para TID=", waiter.as_u16());
                // A cabeça é sempre MutexBlocked neste mutex
                let _ = self.unblock(waiter, WaitData::None);
            }
            None => crate::ktrace!("(Mutex) Liberado. ID=", id.as_u32()),
        }
        next
    }

    /// Tira `tid` da fila de espera (thread parada).
    pub(crate) fn mutex_forget_waiter(&mut self, id: MutexId, tid: Tid) {
        if let Some(mutex) = self.mutexes.get_mut(id) {
            mutex.waiters.remove(&mut self.threads, KIND, tid);
        }
    }

    /// Libera todos os mutexes de `tid` (thread parada).
    pub(crate) fn mutex_release_all(&mut self, tid: Tid) {
        for id in self.mutexes.owned_by(tid) {
            crate::kwarn!("(Mutex) Dona parada segurando mutex. ID=", id.as_u32());
            self.mutex_hand_over(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::config::{SchedConfig, STACK_DEFAULT_SIZE};
    use crate::sched::task::CreateFlags;

    fn setup() -> Scheduler {
        Scheduler::new(SchedConfig::new().with_max_threads(8))
    }

    fn spawn(s: &mut Scheduler, prio: u8) -> Tid {
        s.spawn("m", prio, STACK_DEFAULT_SIZE, CreateFlags::empty())
            .unwrap()
    }

    #[test]
    fn higher_priority_waiter_is_served_first() {
        let mut s = setup();
        let owner = spawn(&mut s, 5);
        let low = spawn(&mut s, 9);
        let high = spawn(&mut s, 2);
        let m = s.mutex_create();

        assert_eq!(s.mutex_lock(owner, m), Ok(true));
        assert_eq!(s.mutex_lock(low, m), Ok(false));
        assert_eq!(s.mutex_lock(high, m), Ok(false));
        assert_eq!(s.status(low), ThreadStatus::MutexBlocked);
        assert_eq!(s.status(high), ThreadStatus::MutexBlocked);
        assert!(s.thread(high).unwrap().is_on_msg_queue());
        assert_eq!(s.mutex_waiters(m), Ok(alloc::vec![high, low]));

        assert_eq!(s.mutex_unlock(owner, m), Ok(Some(high)));
        assert_eq!(s.status(high), ThreadStatus::Pending);
        assert_eq!(s.status(low), ThreadStatus::MutexBlocked);
        assert!(!s.thread(high).unwrap().is_on_msg_queue());
        assert_eq!(s.mutex_owner(m), Ok(Some(high)));
        assert_eq!(s.mutex_waiters(m), Ok(alloc::vec![low]));

        assert_eq!(s.mutex_unlock(high, m), Ok(Some(low)));
        assert_eq!(s.mutex_unlock(low, m), Ok(None));
        assert_eq!(s.mutex_owner(m), Ok(None));
    }

    #[test]
    fn ownership_rules() {
        let mut s = setup();
        let a = spawn(&mut s, 3);
        let b = spawn(&mut s, 3);
        let m = s.mutex_create();

        assert_eq!(s.mutex_trylock(a, m), Ok(()));
        assert_eq!(s.mutex_trylock(a, m), Err(SchedError::Busy));
        assert_eq!(s.mutex_lock(a, m), Err(SchedError::Busy));
        assert_eq!(s.mutex_trylock(b, m), Err(SchedError::WouldBlock));
        assert_eq!(s.mutex_unlock(b, m), Err(SchedError::NotOwner));
        assert_eq!(s.mutex_destroy(m), Err(SchedError::Busy));

        s.mutex_unlock(a, m).unwrap();
        assert_eq!(s.mutex_destroy(m), Ok(()));
        assert_eq!(s.mutex_lock(a, m), Err(SchedError::InvalidHandle));
    }

    #[test]
    fn uncollected_message_refuses_to_block_on_mutex() {
        let mut s = setup();
        let owner = spawn(&mut s, 3);
        let rx = spawn(&mut s, 4);
        let m = s.mutex_create();
        s.mutex_lock(owner, m).unwrap();

        s.msg_receive(rx).unwrap();
        s.msg_try_send(owner, rx, crate::ipc::Message::new(1, 3)).unwrap();
        assert_eq!(s.mutex_lock(rx, m), Err(SchedError::Busy));
        assert_eq!(s.status(rx), ThreadStatus::Pending);
        assert_eq!(s.mutex_waiters(m), Ok(alloc::vec![]));

        s.take_message(rx).unwrap();
        assert_eq!(s.mutex_lock(rx, m), Ok(false));
    }

    #[test]
    fn wrapped_ids_skip_live_mutexes() {
        let mut table = MutexTable::new();
        let first = table.create();
        table.next_id = u32::MAX;
        assert_eq!(table.create(), MutexId(u32::MAX));
        let wrapped = table.create();
        assert_ne!(wrapped, first);
        assert_eq!(wrapped, MutexId(2));
    }

    #[test]
    fn stopping_owner_hands_mutex_over() {
        let mut s = setup();
        let owner = spawn(&mut s, 3);
        let waiter = spawn(&mut s, 4);
        let m = s.mutex_create();
        s.mutex_lock(owner, m).unwrap();
        s.mutex_lock(waiter, m).unwrap();

        s.stop(owner).unwrap();
        assert_eq!(s.mutex_owner(m), Ok(Some(waiter)));
        assert_eq!(s.status(waiter), ThreadStatus::Pending);
    }

    #[test]
    fn stopping_waiter_leaves_the_wait_list() {
        let mut s = setup();
        let owner = spawn(&mut s, 3);
        let w1 = spawn(&mut s, 4);
        let w2 = spawn(&mut s, 4);
        let m = s.mutex_create();
        s.mutex_lock(owner, m).unwrap();
        s.mutex_lock(w1, m).unwrap();
        s.mutex_lock(w2, m).unwrap();

        s.stop(w1).unwrap();
        assert!(!s.thread(w1).unwrap().is_on_msg_queue());
        assert_eq!(s.mutex_waiters(m), Ok(alloc::vec![w2]));
        assert_eq!(s.mutex_unlock(owner, m), Ok(Some(w2)));
    }
}
