//! Thread Control Block e seus componentes.

pub mod accounting;
pub mod entity;
pub mod flags;
pub mod stack;
pub mod state;
pub mod wait;

pub use accounting::Accounting;
pub use entity::Tcb;
pub use flags::CreateFlags;
pub use stack::{HeapStackAllocator, StackAllocator, StackRegion};
pub use state::ThreadStatus;
pub use wait::{MutexId, TimerId, WaitData};
