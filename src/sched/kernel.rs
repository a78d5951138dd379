//! Handle do kernel
//!
//! Dono único do `Scheduler`. Todo acesso passa por `critical`, que
//! desabilita interrupções e pega o spinlock; não existe scheduler global.

use alloc::boxed::Box;

use crate::arch::{HostCpu, InterruptControl};
use crate::sched::config::SchedConfig;
use crate::sched::core::Scheduler;
use crate::sched::task::{StackAllocator, ThreadStatus};
use crate::sync::spinlock::IrqSpinlock;

pub struct Kernel<C: InterruptControl = HostCpu> {
    sched: IrqSpinlock<Scheduler, C>,
}

impl<C: InterruptControl> Kernel<C> {
    /// Inicializa o subsistema de escalonamento.
    pub fn init(config: SchedConfig) -> Self {
        let kernel = Self {
            sched: IrqSpinlock::new(Scheduler::new(config)),
        };
        crate::kinfo!("(Sched) Kernel pronto. Quantum=", config.quantum);
        kernel
    }

    /// Inicializa com um alocador de stacks próprio.
    pub fn init_with_allocator(config: SchedConfig, stacks: Box<dyn StackAllocator>) -> Self {
        Self {
            sched: IrqSpinlock::new(Scheduler::with_allocator(config, stacks)),
        }
    }

    /// Executa `f` dentro da seção crítica.
    pub fn critical<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> R {
        let mut guard = self.sched.lock();
        f(&mut guard)
    }

    /// Como `critical`, mas desiste se o lock já está tomado (ex.: IRQ que
    /// interrompeu o próprio kernel).
    pub fn try_critical<R>(&self, f: impl FnOnce(&mut Scheduler) -> R) -> Option<R> {
        let mut guard = self.sched.try_lock()?;
        Some(f(&mut guard))
    }

    /// Para e colhe todas as threads. Retorna quantas foram destruídas.
    pub fn shutdown(self) -> usize {
        let mut sched = self.sched.into_inner();
        let live: alloc::vec::Vec<_> = sched
            .threads()
            .filter(|t| t.status() != ThreadStatus::Stopped)
            .map(|t| t.tid())
            .collect();
        for tid in live {
            // Uma parada pode ter soltado outra; nenhuma delas falha
            let _ = sched.stop(tid);
        }
        let reaped = sched.reap_all();
        crate::kinfo!("(Sched) Shutdown. Threads destruídas=", reaped);
        reaped
    }
}
