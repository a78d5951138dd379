//! Thread Control Block
//!
//! Registro passivo por-thread: identidade, estado, ponteiro de contexto,
//! limites de stack e os dois encadeamentos (run-queue e fila secundária).
//! Só o scheduler o altera, sempre dentro da seção crítica.

use super::accounting::Accounting;
use super::flags::CreateFlags;
use super::stack::StackRegion;
use super::state::ThreadStatus;
use super::wait::WaitData;
use crate::ipc::Message;
use crate::klib::{Link, LinkKind, TidList};
use crate::sys::{Priority, SchedError, SchedResult, Tid};

/// Thread Control Block
#[derive(Debug)]
pub struct Tcb {
    /// Ponteiro de contexto salvo (sempre dentro de `stack`)
    sp: usize,
    /// Estado atual
    status: ThreadStatus,
    /// ID único (também índice na tabela)
    tid: Tid,
    /// Prioridade (0 = maior), imutável
    priority: Priority,
    /// Payload de espera, validado contra `status`
    wait_data: WaitData,
    /// Encadeamento na fila de mutex / fila de remetentes
    pub(crate) msg_link: Link,
    /// Encadeamento no bucket da run-queue
    pub(crate) rq_link: Link,
    /// Remetentes bloqueados nesta thread (ordem de prioridade)
    pub(crate) msg_waiters: TidList,
    /// Nome (debug)
    name: &'static str,
    /// Stack exclusiva da thread
    stack: StackRegion,
    /// Flags de criação
    flags: CreateFlags,
    /// Estatísticas de contabilidade
    pub(crate) accounting: Accounting,
}

impl Tcb {
    /// Cria TCB já com stack preparada. Nasce Pending sem encadeamento;
    /// quem cria é responsável por colocá-lo na run-queue.
    pub(crate) fn new(
        tid: Tid,
        name: &'static str,
        priority: Priority,
        stack: StackRegion,
        sp: usize,
        flags: CreateFlags,
    ) -> Self {
        debug_assert!(stack.contains(sp), "initial sp outside stack");
        Self {
            sp,
            status: ThreadStatus::Pending,
            tid,
            priority,
            wait_data: WaitData::None,
            msg_link: Link::new(),
            rq_link: Link::new(),
            msg_waiters: TidList::new(),
            name,
            stack,
            flags,
            accounting: Accounting::new(),
        }
    }

    // =========================================================================
    // LEITURA (colaboradores)
    // =========================================================================

    pub fn tid(&self) -> Tid {
        self.tid
    }

    pub fn status(&self) -> ThreadStatus {
        self.status
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn stack(&self) -> &StackRegion {
        &self.stack
    }

    pub fn flags(&self) -> CreateFlags {
        self.flags
    }

    pub fn wait_data(&self) -> &WaitData {
        &self.wait_data
    }

    pub fn accounting(&self) -> &Accounting {
        &self.accounting
    }

    /// Está de fato encadeado na run-queue?
    pub fn is_on_runqueue(&self) -> bool {
        self.rq_link.is_linked()
    }

    /// Está encadeado numa fila secundária?
    pub fn is_on_msg_queue(&self) -> bool {
        self.msg_link.is_linked()
    }

    /// Mensagem entregue e ainda não coletada
    pub fn delivered_message(&self) -> Option<&Message> {
        match self.status {
            ThreadStatus::Running | ThreadStatus::Pending => self.wait_data.message(),
            _ => None,
        }
    }

    /// Número de remetentes esperando esta thread receber
    pub fn pending_senders(&self) -> usize {
        self.msg_waiters.len()
    }

    // =========================================================================
    // ESCRITA (somente scheduler)
    // =========================================================================

    /// Troca estado e payload juntos.
    ///
    /// Um payload incompatível com o status é bug de programação.
    pub(crate) fn set_state(&mut self, status: ThreadStatus, wait_data: WaitData) {
        debug_assert!(
            wait_data.fits(status),
            "wait_data variant does not fit thread status"
        );
        self.status = status;
        self.wait_data = wait_data;
    }

    /// Troca só o status, mantendo o payload (Running ↔ Pending).
    pub(crate) fn set_status(&mut self, status: ThreadStatus) {
        debug_assert!(self.wait_data.fits(status));
        self.status = status;
    }

    /// Retira a mensagem entregue, limpando o payload.
    pub(crate) fn take_message(&mut self) -> Option<Message> {
        match self.wait_data {
            WaitData::Message(msg) if self.status.is_runnable() => {
                self.wait_data = WaitData::None;
                Some(msg)
            }
            _ => None,
        }
    }

    /// Salva o ponteiro de contexto vindo da troca de contexto.
    pub(crate) fn set_sp(&mut self, sp: usize) -> SchedResult<()> {
        if !self.stack.contains(sp) {
            crate::kerror!("(TCB) sp fora da stack! TID=", self.tid.as_u16());
            return Err(SchedError::StackOverflow);
        }
        self.sp = sp;
        Ok(())
    }

    pub(crate) fn link(&self, kind: LinkKind) -> &Link {
        match kind {
            LinkKind::RunQueue => &self.rq_link,
            LinkKind::MsgQueue => &self.msg_link,
        }
    }

    pub(crate) fn link_mut(&mut self, kind: LinkKind) -> &mut Link {
        match kind {
            LinkKind::RunQueue => &mut self.rq_link,
            LinkKind::MsgQueue => &mut self.msg_link,
        }
    }
}
