//! Flags de criação de thread

use bitflags::bitflags;

bitflags! {
    /// Opções de `Scheduler::spawn`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CreateFlags: u8 {
        /// Nasce em Sleeping, fora da run-queue, até um `wakeup`
        const SLEEPING = 1 << 0;
        /// Não pede reescalonamento mesmo tendo prioridade maior que a atual
        const NO_YIELD = 1 << 1;
        /// Pinta a stack com `STACK_MARKER` para medir uso
        const STACKTEST = 1 << 2;
    }
}
