//! # Multitasking & Scheduler Subsystem
//!
//! O módulo `sched` é o motor de execução do Forge: o Thread Control Block
//! e o escalonador preemptivo por prioridade que o mantém.
//!
//! ## 🎯 Propósito e Responsabilidade
//! - **TCB:** identidade, estado, `sp` salvo, stack e encadeamentos de uma thread.
//! - **Máquina de Estados:** `ThreadStatus` com teste de executável O(1).
//! - **Política:** prioridade fixa (0 = maior), round-robin com quantum dentro do nível.
//!
//! ## 🏗️ Arquitetura: Cooperative + Preemptive
//! 1. **Preemptivo:** o tick do timer chama `Scheduler::tick`, que cobra o quantum.
//! 2. **Cooperativo:** threads cedem via `yield_now`, sono, IPC ou mutex.
//!
//! ## Organização
//! - `task/`: o TCB e seus componentes (estado, wait_data, stack, flags)
//! - `core/`: tabela de threads, run-queue, timers, orquestrador
//! - `kernel`: handle com seção crítica (dono único do scheduler)
//!
//! A troca de contexto em assembly fica fora deste crate: a arquitetura
//! chama `schedule()` para saber o próximo e `save_context` com o `sp` salvo.

pub mod config;
pub mod core;
pub mod kernel;
pub mod task;

#[cfg(any(test, feature = "self_test"))]
pub mod test;
