//! Definição de Mensagens IPC.
//!
//! Mensagens síncronas são pequenas e copiadas por valor entre TCBs: um
//! tipo definido pelo protocolo e uma palavra de conteúdo (valor imediato
//! ou endereço de buffer compartilhado). Dados grandes vão por memória
//! compartilhada; só o endereço trafega aqui.

use crate::sys::Tid;

/// Mensagem IPC
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Remetente; preenchido pelo kernel no envio/resposta
    pub sender: Tid,
    /// Tipo (protocolo específico)
    pub msg_type: u16,
    /// Conteúdo
    pub value: u64,
}

impl Message {
    pub const fn new(msg_type: u16, value: u64) -> Self {
        Self {
            sender: Tid::NONE,
            msg_type,
            value,
        }
    }

    /// Cópia com o remetente carimbado.
    pub(crate) const fn stamped(mut self, sender: Tid) -> Self {
        self.sender = sender;
        self
    }
}
