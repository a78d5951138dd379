//! Forge TCB Library.
//!
//! Thread Control Block e núcleo de escalonamento do microkernel Forge.
//! Define o registro por-thread (identidade, estado, filas) e os
//! colaboradores mínimos que o mantêm consistente: run-queue, timers,
//! mensagens síncronas e mutex de kernel.

#![cfg_attr(not(test), no_std)]

// Habilitar alocação dinâmica (Vec/Box para tabelas e pool de stacks)
extern crate alloc;

// --- Infraestrutura ---
pub mod klog; // Logging zero-overhead
pub mod arch; // Controle de interrupções (HAL mínimo)
pub mod klib; // Listas indexadas, framework de testes

// --- Núcleo ---
pub mod sys; // Tipos e códigos de erro
pub mod sync; // Spinlock de seção crítica, mutex de kernel
pub mod sched; // TCB, run-queue, timers, scheduler
pub mod ipc; // Mensagens síncronas

pub use crate::ipc::Message;
pub use crate::sched::config::SchedConfig;
pub use crate::sched::core::Scheduler;
pub use crate::sched::kernel::Kernel;
pub use crate::sched::task::{CreateFlags, Tcb, ThreadStatus, WaitData};
pub use crate::sys::{Priority, SchedError, SchedResult, Tid};
