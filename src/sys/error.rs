//! # Códigos de Erro do Scheduler
//!
//! Erros são estados sentinela ou operações rejeitadas, nunca falhas:
//! - Identificador inexistente → `NotFound`.
//! - Transição ilegal (ex: escalonar uma thread Stopped) → `ThreadNotRunnable`.
//!
//! Nenhuma operação é repetida automaticamente; o chamador revalida antes de
//! tentar de novo. Violações de invariante são bugs e viram `debug_assert!`,
//! não códigos de erro.
//!
//! A numeração segue o padrão POSIX/Linux onde existe equivalente. Códigos
//! específicos do scheduler começam em 1000.

use core::fmt;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    NotOwner = 1,         // EPERM: mutex liberado por quem não é dono
    NotFound = 3,         // ESRCH: nenhuma thread com este TID
    WouldBlock = 11,      // EAGAIN: operação não-bloqueante sem parceiro
    OutOfMemory = 12,     // ENOMEM: pool de stacks esgotado
    Busy = 16,            // EBUSY: recurso em uso
    InvalidArgument = 22, // EINVAL
    TableFull = 24,       // sem slot livre na tabela de threads

    // Específicos do scheduler
    ThreadNotRunnable = 1000, // estado incompatível com a operação
    InvalidPriority = 1001,
    StackTooSmall = 1002,
    StackOverflow = 1003, // ponteiro de contexto fora da stack
    InvalidHandle = 1004, // mutex/timer inexistente
}

/// Resultado padrão das operações do scheduler
pub type SchedResult<T> = Result<T, SchedError>;

impl SchedError {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Valor negativo para retorno de syscall (RAX).
    pub fn as_isize(self) -> isize {
        -(self as i32) as isize
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::NotOwner => "caller does not own the mutex",
            Self::NotFound => "no such thread",
            Self::WouldBlock => "operation would block",
            Self::OutOfMemory => "stack pool exhausted",
            Self::Busy => "resource busy",
            Self::InvalidArgument => "invalid argument",
            Self::TableFull => "thread table full",
            Self::ThreadNotRunnable => "thread state incompatible with operation",
            Self::InvalidPriority => "priority out of range",
            Self::StackTooSmall => "stack size below minimum",
            Self::StackOverflow => "context pointer outside thread stack",
            Self::InvalidHandle => "no such mutex or timer",
        }
    }
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syscall_return_is_negative() {
        assert_eq!(SchedError::NotFound.as_isize(), -3);
        assert_eq!(SchedError::ThreadNotRunnable.as_isize(), -1000);
    }
}
