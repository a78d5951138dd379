//! Dados de espera (wait_data)
//!
//! Payload tipado do TCB. A variante válida é determinada pelo status:
//!
//! | Status                 | WaitData aceito              |
//! |------------------------|------------------------------|
//! | Running, Pending       | `None`, `Message` (entregue) |
//! | Stopped, ReceiveBlocked| `None`                       |
//! | Sleeping               | `None`, `Timer`              |
//! | MutexBlocked           | `Mutex`                      |
//! | SendBlocked            | `Outgoing`                   |
//! | ReplyBlocked           | `Peer`                       |
//! | TimerWaiting           | `Timer`                      |

use super::state::ThreadStatus;
use crate::ipc::Message;
use crate::sys::Tid;

/// Identificador de mutex de kernel (nunca 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct MutexId(pub(crate) u32);

impl MutexId {
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identificador de timer (nunca 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct TimerId(pub(crate) u32);

impl TimerId {
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Payload de espera de uma thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitData {
    #[default]
    None,
    /// Mensagem (ou resposta) entregue e ainda não coletada
    Message(Message),
    /// Mensagem aguardando o destinatário receber
    Outgoing { target: Tid, msg: Message },
    /// Thread de quem se espera a resposta
    Peer(Tid),
    /// Mutex pelo qual se espera
    Mutex(MutexId),
    /// Timer de despertar / timer esperado
    Timer(TimerId),
}

impl WaitData {
    /// Este payload é válido para `status`?
    pub const fn fits(&self, status: ThreadStatus) -> bool {
        use ThreadStatus as S;
        match status {
            S::Running | S::Pending => matches!(self, Self::None | Self::Message(_)),
            S::Stopped | S::ReceiveBlocked => matches!(self, Self::None),
            S::Sleeping => matches!(self, Self::None | Self::Timer(_)),
            S::MutexBlocked => matches!(self, Self::Mutex(_)),
            S::SendBlocked => matches!(self, Self::Outgoing { .. }),
            S::ReplyBlocked => matches!(self, Self::Peer(_)),
            S::TimerWaiting => matches!(self, Self::Timer(_)),
            S::NotFound => false,
        }
    }

    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub const fn message(&self) -> Option<&Message> {
        match self {
            Self::Message(msg) => Some(msg),
            _ => None,
        }
    }

    pub const fn timer(&self) -> Option<TimerId> {
        match self {
            Self::Timer(id) => Some(*id),
            _ => None,
        }
    }

    pub const fn mutex(&self) -> Option<MutexId> {
        match self {
            Self::Mutex(id) => Some(*id),
            _ => None,
        }
    }

    /// Thread parceira (destino de envio ou de quem se espera resposta)
    pub const fn peer(&self) -> Option<Tid> {
        match self {
            Self::Peer(tid) => Some(*tid),
            Self::Outgoing { target, .. } => Some(*target),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_must_match_status() {
        let msg = Message::new(1, 7);
        assert!(WaitData::None.fits(ThreadStatus::Pending));
        assert!(WaitData::Message(msg).fits(ThreadStatus::Pending));
        assert!(!WaitData::Message(msg).fits(ThreadStatus::Stopped));
        assert!(WaitData::Mutex(MutexId(1)).fits(ThreadStatus::MutexBlocked));
        assert!(!WaitData::None.fits(ThreadStatus::MutexBlocked));
        assert!(WaitData::Peer(Tid(2)).fits(ThreadStatus::ReplyBlocked));
        assert!(!WaitData::Peer(Tid(2)).fits(ThreadStatus::SendBlocked));
        assert!(WaitData::Timer(TimerId(3)).fits(ThreadStatus::Sleeping));
        assert!(WaitData::None.fits(ThreadStatus::Sleeping));
        assert!(!WaitData::None.fits(ThreadStatus::TimerWaiting));
        assert!(!WaitData::None.fits(ThreadStatus::NotFound));
    }
}
