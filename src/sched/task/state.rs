//! Estados de thread
//!
//! Máquina de estados do TCB. "Executável" é uma função pura da variante,
//! testada em O(1) por `is_runnable`; nenhum bit de flag é exposto.

/// Estado de uma thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadStatus {
    /// Sentinela: nenhuma thread com este TID
    NotFound,
    /// Executando na CPU (é a `current` do scheduler)
    Running,
    /// Pronta, na run-queue, esperando a CPU
    Pending,
    /// Parada; terminal até ser colhida
    Stopped,
    /// Dormindo (com ou sem timer de despertar)
    Sleeping,
    /// Na fila de espera de um mutex
    MutexBlocked,
    /// Esperando um remetente
    ReceiveBlocked,
    /// Esperando o destinatário receber
    SendBlocked,
    /// Mensagem entregue, esperando a resposta
    ReplyBlocked,
    /// Esperando um timer one-shot disparar
    TimerWaiting,
}

impl ThreadStatus {
    /// Verifica se pode ser escalonada (está na run-queue)
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::Running | Self::Pending)
    }

    /// Bloqueada esperando algum evento externo
    pub const fn is_blocked(self) -> bool {
        matches!(
            self,
            Self::Sleeping
                | Self::MutexBlocked
                | Self::ReceiveBlocked
                | Self::SendBlocked
                | Self::ReplyBlocked
                | Self::TimerWaiting
        )
    }

    /// Existe uma thread (mesmo parada) com este TID
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Encadeada na fila secundária (`msg_link`)
    pub const fn uses_msg_queue(self) -> bool {
        matches!(self, Self::MutexBlocked | Self::SendBlocked)
    }

    /// Nome curto para dumps
    pub const fn name(self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::Running => "running",
            Self::Pending => "pending",
            Self::Stopped => "stopped",
            Self::Sleeping => "sleeping",
            Self::MutexBlocked => "bl mutex",
            Self::ReceiveBlocked => "bl rx",
            Self::SendBlocked => "bl send",
            Self::ReplyBlocked => "bl reply",
            Self::TimerWaiting => "bl timer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ThreadStatus; 10] = [
        ThreadStatus::NotFound,
        ThreadStatus::Running,
        ThreadStatus::Pending,
        ThreadStatus::Stopped,
        ThreadStatus::Sleeping,
        ThreadStatus::MutexBlocked,
        ThreadStatus::ReceiveBlocked,
        ThreadStatus::SendBlocked,
        ThreadStatus::ReplyBlocked,
        ThreadStatus::TimerWaiting,
    ];

    #[test]
    fn only_running_and_pending_are_runnable() {
        for s in ALL {
            let expected = matches!(s, ThreadStatus::Running | ThreadStatus::Pending);
            assert_eq!(s.is_runnable(), expected, "{:?}", s);
        }
    }

    #[test]
    fn classes_are_disjoint() {
        for s in ALL {
            let classes = [s.is_runnable(), s.is_blocked(), s == ThreadStatus::Stopped, !s.is_live()];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{:?}", s);
        }
    }
}
