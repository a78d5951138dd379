//! Timer Queue - timers de sono e one-shot
//!
//! Timers ordenados por deadline (em ticks absolutos). Cada timer tem no
//! máximo uma thread esperando; quando o deadline passa, o scheduler acorda
//! essa thread.

use alloc::vec::Vec;

use crate::sched::task::TimerId;
use crate::sys::{SchedError, SchedResult, Tid};

/// Origem do timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Despertar de `sleep_for`; morre junto com o sono
    Wake,
    /// Criado por `timer_set`; qualquer thread pode esperá-lo
    Oneshot,
}

impl TimerKind {
    pub const fn name(self) -> &'static str {
        match self {
            TimerKind::Wake => "Wake",
            TimerKind::Oneshot => "Oneshot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub id: TimerId,
    pub deadline: u64,
    pub kind: TimerKind,
    pub waiter: Option<Tid>,
}

pub struct TimerQueue {
    /// Ordenado por deadline; FIFO entre iguais
    timers: Vec<Timer>,
    next_id: u32,
}

impl TimerQueue {
    pub const fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
        }
    }

    /// Próximo ID livre. 0 é reservado; ao dar a volta, IDs de timers
    /// ainda armados são pulados.
    fn alloc_id(&mut self) -> TimerId {
        loop {
            let id = TimerId(self.next_id);
            self.next_id = self.next_id.checked_add(1).unwrap_or(1);
            if !self.timers.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }

    /// Arma um timer para `deadline`.
    pub fn arm(&mut self, deadline: u64, kind: TimerKind, waiter: Option<Tid>) -> TimerId {
        let id = self.alloc_id();
        let pos = self.timers.partition_point(|t| t.deadline <= deadline);
        self.timers.insert(
            pos,
            Timer {
                id,
                deadline,
                kind,
                waiter,
            },
        );
        id
    }

    /// Desarma; retorna o timer removido.
    pub fn cancel(&mut self, id: TimerId) -> Option<Timer> {
        let pos = self.timers.iter().position(|t| t.id == id)?;
        Some(self.timers.remove(pos))
    }

    /// Registra a thread que espera o timer.
    pub fn set_waiter(&mut self, id: TimerId, tid: Tid) -> SchedResult<()> {
        let timer = self
            .timers
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(SchedError::InvalidHandle)?;
        if timer.waiter.is_some() {
            return Err(SchedError::Busy);
        }
        timer.waiter = Some(tid);
        Ok(())
    }

    /// Esquece a thread que esperava o timer (o timer continua armado).
    pub fn clear_waiter(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.iter_mut().find(|t| t.id == id) {
            timer.waiter = None;
        }
    }

    /// Remove e retorna o primeiro timer com deadline <= `now`.
    pub fn pop_expired(&mut self, now: u64) -> Option<Timer> {
        match self.timers.first() {
            Some(t) if t.deadline <= now => Some(self.timers.remove(0)),
            _ => None,
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.first().map(|t| t.deadline)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timer> {
        self.timers.iter()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}
