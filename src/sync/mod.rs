//! # Synchronization Primitives
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! IrqSpinlock → Seção crítica do scheduler (IRQs desligadas, não dorme)
//! KMutex      → Mutex de kernel: bloqueia a thread na fila de espera
//! ```
//!
//! ## Regras
//!
//! - **IrqSpinlock**: só em volta de transições curtas do scheduler
//! - **KMutex**: operado pelo scheduler (`mutex_lock`, `mutex_unlock`, ...)

// =============================================================================
// PRIMITIVAS
// =============================================================================

/// Spinlock com interrupções desabilitadas
pub mod spinlock;

/// Mutex de kernel (bloqueia thread)
pub mod mutex;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use mutex::{KMutex, MutexTable};
pub use spinlock::{IrqSpinlock, IrqSpinlockGuard};
