//! Núcleo do escalonador: tabela de threads, run-queue, timers e o
//! orquestrador que os mantém consistentes.

pub mod debug;
pub mod runqueue;
pub mod scheduler;
pub mod table;
pub mod timer;

pub use debug::{check_invariants, dump_threads};
pub use scheduler::Scheduler;
