//! Tipos fundamentais do sistema

use crate::sched::config::PRIORITY_LEVELS;

/// Thread ID
///
/// Também é o índice do slot da thread na tabela de TCBs. O valor 0 é
/// reservado e significa "nenhuma thread".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Tid(pub u16);

impl Tid {
    /// "Nenhuma thread"
    pub const NONE: Tid = Tid(0);

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Índice do slot na tabela de threads.
    pub const fn as_index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Prioridade de escalonamento (imutável após o spawn).
///
/// Convenção: valor numérico MENOR = prioridade MAIOR. `0` vence tudo,
/// `PRIORITY_LEVELS - 1` é a mais baixa (idle). A mesma regra vale para a
/// run-queue, para a fila de espera de mutex e para a fila de remetentes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Priority(u8);

impl Priority {
    /// Prioridade mais alta
    pub const HIGHEST: Priority = Priority(0);
    /// Prioridade mais baixa
    pub const LOWEST: Priority = Priority((PRIORITY_LEVELS - 1) as u8);

    /// Cria uma prioridade, validando o intervalo.
    pub const fn new(level: u8) -> Option<Self> {
        if (level as usize) < PRIORITY_LEVELS {
            Some(Self(level))
        } else {
            None
        }
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    /// Índice do bucket na run-queue.
    pub const fn as_index(self) -> usize {
        self.0 as usize
    }

    /// `self` deve rodar antes de `other`?
    pub const fn is_higher_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}
