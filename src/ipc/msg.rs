//! Troca de mensagens síncrona (rendezvous)
//!
//! Cada thread é uma caixa de correio: remetentes que chegam antes do
//! `receive` ficam SendBlocked na fila `msg_waiters` do destinatário,
//! em ordem de prioridade.
//!
//! ```text
//!  remetente                      destinatário
//!  msg_send ──┬─ destino em ReceiveBlocked ──► Pending(Message)
//!             │  remetente ► ReplyBlocked(peer)
//!             └─ senão ► SendBlocked, na fila do destino
//!                                  msg_receive ─► pega o primeiro da fila
//!                                                 remetente ► ReplyBlocked
//!  ◄──────────────────────────────────────────── msg_reply
//!  Pending(resposta)
//! ```

use super::message::Message;
use crate::klib::LinkKind;
use crate::sched::core::Scheduler;
use crate::sched::task::{ThreadStatus, WaitData};
use crate::sys::{SchedError, SchedResult, Tid};

const KIND: LinkKind = LinkKind::MsgQueue;

/// Resultado de `msg_send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// O destinatário estava em `msg_receive` e já tem a mensagem
    Delivered,
    /// O remetente entrou na fila do destinatário
    Queued,
}

impl Scheduler {
    /// Valida remetente e destino de um envio.
    fn check_send(&self, sender: Tid, target: Tid) -> SchedResult<ThreadStatus> {
        if sender == target {
            return Err(SchedError::InvalidArgument);
        }
        self.require_runnable(sender)?;
        match self.status(target) {
            ThreadStatus::NotFound => Err(SchedError::NotFound),
            ThreadStatus::Stopped => Err(SchedError::ThreadNotRunnable),
            status => Ok(status),
        }
    }

    /// Envia uma requisição e espera a resposta.
    ///
    /// Em ambos os casos o remetente sai da run-queue; a resposta chega via
    /// `msg_reply` e é coletada com `take_message`.
    pub fn msg_send(&mut self, sender: Tid, target: Tid, msg: Message) -> SchedResult<SendOutcome> {
        let target_status = self.check_send(sender, target)?;
        let msg = msg.stamped(sender);

        if target_status == ThreadStatus::ReceiveBlocked {
            self.block(sender, ThreadStatus::ReplyBlocked, WaitData::Peer(target))?;
            self.unblock(target, WaitData::Message(msg))?;
            crate::kdebug!("(IPC) Entregue direto para TID=", target.as_u16());
            self.verify();
            return Ok(SendOutcome::Delivered);
        }

        self.block(
            sender,
            ThreadStatus::SendBlocked,
            WaitData::Outgoing { target, msg },
        )?;
        self.enqueue_sender(target, sender);
        crate::kdebug!("(IPC) Remetente na fila de TID=", target.as_u16());
        self.verify();
        Ok(SendOutcome::Queued)
    }

    /// Envio não bloqueante: só entrega se o destino está em `msg_receive`.
    pub fn msg_try_send(&mut self, sender: Tid, target: Tid, msg: Message) -> SchedResult<()> {
        if self.check_send(sender, target)? != ThreadStatus::ReceiveBlocked {
            return Err(SchedError::WouldBlock);
        }
        self.unblock(target, WaitData::Message(msg.stamped(sender)))?;
        crate::ktrace!("(IPC) try_send entregue para TID=", target.as_u16());
        self.verify();
        Ok(())
    }

    /// Recebe. Uma mensagem já entregue e não coletada volta primeiro.
    /// Com remetente na fila, a mensagem volta na hora e o remetente passa
    /// a esperar a resposta; senão a thread fica ReceiveBlocked e retorna
    /// `None` (a mensagem chega no wait_data).
    pub fn msg_receive(&mut self, tid: Tid) -> SchedResult<Option<Message>> {
        self.require_runnable(tid)?;
        if let Some(pending) = self.tcb_mut(tid)?.take_message() {
            crate::ktrace!("(IPC) Mensagem pendente coletada. TID=", tid.as_u16());
            return Ok(Some(pending));
        }

        let Some(sender) = self.dequeue_sender(tid) else {
            self.block(tid, ThreadStatus::ReceiveBlocked, WaitData::None)?;
            crate::ktrace!("(IPC) Esperando mensagem. TID=", tid.as_u16());
            self.verify();
            return Ok(None);
        };

        let tcb = self.tcb_mut(sender)?;
        let msg = match *tcb.wait_data() {
            WaitData::Outgoing { msg, .. } => msg,
            _ => {
                crate::kerror!("(IPC) Fila com remetente inválido. TID=", sender.as_u16());
                return Err(SchedError::ThreadNotRunnable);
            }
        };
        // Continua fora da run-queue, agora esperando a resposta
        tcb.set_state(ThreadStatus::ReplyBlocked, WaitData::Peer(tid));
        crate::kdebug!("(IPC) Recebido de TID=", sender.as_u16());
        self.verify();
        Ok(Some(msg))
    }

    /// Coleta a mensagem (ou resposta) entregue enquanto a thread estava
    /// bloqueada.
    pub fn take_message(&mut self, tid: Tid) -> SchedResult<Option<Message>> {
        Ok(self.tcb_mut(tid)?.take_message())
    }

    /// Responde a quem está ReplyBlocked esperando `replier`.
    pub fn msg_reply(&mut self, replier: Tid, target: Tid, reply: Message) -> SchedResult<()> {
        let tcb = self.tcb(target)?;
        let waiting = tcb.status() == ThreadStatus::ReplyBlocked
            && *tcb.wait_data() == WaitData::Peer(replier);
        if !waiting {
            crate::kwarn!("(IPC) Resposta para quem não espera. TID=", target.as_u16());
            return Err(SchedError::ThreadNotRunnable);
        }
        self.unblock(target, WaitData::Message(reply.stamped(replier)))?;
        crate::kdebug!("(IPC) Resposta entregue para TID=", target.as_u16());
        self.verify();
        Ok(())
    }

    // =========================================================================
    // FILA DE REMETENTES
    // =========================================================================

    // A fila mora no TCB do destino: copia a cabeça, opera na tabela e
    // grava de volta.

    fn enqueue_sender(&mut self, target: Tid, sender: Tid) {
        let Some(mut list) = self.threads.get(target).map(|t| t.msg_waiters) else {
            return;
        };
        self.threads.file_by_priority(&mut list, KIND, sender);
        if let Some(tcb) = self.threads.get_mut(target) {
            tcb.msg_waiters = list;
        }
    }

    fn dequeue_sender(&mut self, target: Tid) -> Option<Tid> {
        let mut list = self.threads.get(target)?.msg_waiters;
        let sender = list.pop_front(&mut self.threads, KIND);
        if let Some(tcb) = self.threads.get_mut(target) {
            tcb.msg_waiters = list;
        }
        sender
    }

    /// Tira `sender` da fila de `target` (remetente ou destino parado).
    pub(crate) fn forget_sender(&mut self, target: Tid, sender: Tid) {
        let Some(mut list) = self.threads.get(target).map(|t| t.msg_waiters) else {
            return;
        };
        list.remove(&mut self.threads, KIND, sender);
        if let Some(tcb) = self.threads.get_mut(target) {
            tcb.msg_waiters = list;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::config::{SchedConfig, STACK_DEFAULT_SIZE};
    use crate::sched::task::CreateFlags;

    fn setup() -> Scheduler {
        Scheduler::new(SchedConfig::new().with_max_threads(8))
    }

    fn spawn(s: &mut Scheduler, name: &'static str, prio: u8) -> Tid {
        s.spawn(name, prio, STACK_DEFAULT_SIZE, CreateFlags::empty())
            .unwrap()
    }

    #[test]
    fn send_to_waiting_receiver_is_a_rendezvous() {
        let mut s = setup();
        let a = spawn(&mut s, "a", 4);
        let b = spawn(&mut s, "b", 4);

        assert_eq!(s.msg_receive(b), Ok(None));
        assert_eq!(s.status(b), ThreadStatus::ReceiveBlocked);

        let out = s.msg_send(a, b, Message::new(7, 0xCAFE)).unwrap();
        assert_eq!(out, SendOutcome::Delivered);
        assert_eq!(s.status(a), ThreadStatus::ReplyBlocked);
        assert_eq!(s.status(b), ThreadStatus::Pending);
        assert!(s.thread(b).unwrap().is_on_runqueue());

        let delivered = *s.thread(b).unwrap().delivered_message().unwrap();
        assert_eq!(delivered.sender, a);
        assert_eq!(delivered.value, 0xCAFE);

        assert_eq!(s.take_message(b), Ok(Some(delivered)));
        s.msg_reply(b, a, Message::new(8, 1)).unwrap();
        assert_eq!(s.status(a), ThreadStatus::Pending);
        let reply = s.take_message(a).unwrap().unwrap();
        assert_eq!((reply.sender, reply.msg_type, reply.value), (b, 8, 1));
    }

    #[test]
    fn senders_queue_by_priority_until_receive() {
        let mut s = setup();
        let rx = spawn(&mut s, "rx", 4);
        let low = spawn(&mut s, "low", 9);
        let high = spawn(&mut s, "high", 1);

        assert_eq!(s.msg_send(low, rx, Message::new(1, 10)), Ok(SendOutcome::Queued));
        assert_eq!(s.msg_send(high, rx, Message::new(1, 20)), Ok(SendOutcome::Queued));
        assert_eq!(s.status(low), ThreadStatus::SendBlocked);
        assert!(s.thread(low).unwrap().is_on_msg_queue());
        assert_eq!(s.thread(rx).unwrap().pending_senders(), 2);

        let first = s.msg_receive(rx).unwrap().unwrap();
        assert_eq!((first.sender, first.value), (high, 20));
        assert_eq!(s.status(high), ThreadStatus::ReplyBlocked);
        assert!(!s.thread(high).unwrap().is_on_msg_queue());
        assert_eq!(s.status(rx), ThreadStatus::Pending);

        let second = s.msg_receive(rx).unwrap().unwrap();
        assert_eq!(second.sender, low);
        assert_eq!(s.thread(rx).unwrap().pending_senders(), 0);
    }

    #[test]
    fn try_send_never_blocks() {
        let mut s = setup();
        let a = spawn(&mut s, "a", 4);
        let b = spawn(&mut s, "b", 4);
        assert_eq!(
            s.msg_try_send(a, b, Message::new(1, 1)),
            Err(SchedError::WouldBlock)
        );
        assert_eq!(s.status(a), ThreadStatus::Pending);

        s.msg_receive(b).unwrap();
        s.msg_try_send(a, b, Message::new(1, 2)).unwrap();
        assert_eq!(s.status(a), ThreadStatus::Pending);
        assert_eq!(s.take_message(b).unwrap().map(|m| m.value), Some(2));
    }

    #[test]
    fn invalid_sends_are_rejected() {
        let mut s = setup();
        let a = spawn(&mut s, "a", 4);
        let b = spawn(&mut s, "b", 4);
        let msg = Message::new(0, 0);
        assert_eq!(s.msg_send(a, a, msg), Err(SchedError::InvalidArgument));
        assert_eq!(s.msg_send(a, Tid::new(7), msg), Err(SchedError::NotFound));
        s.stop(b).unwrap();
        assert_eq!(s.msg_send(a, b, msg), Err(SchedError::ThreadNotRunnable));
        assert_eq!(
            s.msg_reply(b, a, msg),
            Err(SchedError::ThreadNotRunnable)
        );
    }

    #[test]
    fn stopping_receiver_releases_queued_senders() {
        let mut s = setup();
        let rx = spawn(&mut s, "rx", 4);
        let tx = spawn(&mut s, "tx", 4);
        let waiting = spawn(&mut s, "w", 4);

        s.msg_send(tx, rx, Message::new(1, 1)).unwrap();
        s.msg_receive(rx).unwrap();
        s.msg_send(waiting, rx, Message::new(1, 2)).unwrap();
        assert_eq!(s.status(tx), ThreadStatus::ReplyBlocked);
        assert_eq!(s.status(waiting), ThreadStatus::SendBlocked);

        s.stop(rx).unwrap();
        assert_eq!(s.status(tx), ThreadStatus::Pending);
        assert_eq!(s.status(waiting), ThreadStatus::Pending);
        assert!(!s.thread(waiting).unwrap().is_on_msg_queue());
        assert_eq!(s.take_message(tx), Ok(None));
    }

    #[test]
    fn uncollected_message_is_returned_by_next_receive() {
        let mut s = setup();
        let a = spawn(&mut s, "a", 4);
        let b = spawn(&mut s, "b", 4);
        let c = spawn(&mut s, "c", 4);

        s.msg_receive(b).unwrap();
        s.msg_send(a, b, Message::new(1, 0xAA)).unwrap();

        let first = s.msg_receive(b).unwrap().unwrap();
        assert_eq!((first.sender, first.value), (a, 0xAA));
        assert_eq!(s.status(b), ThreadStatus::Pending);
        assert_eq!(s.status(a), ThreadStatus::ReplyBlocked);

        assert_eq!(s.msg_receive(b), Ok(None));
        s.msg_try_send(c, b, Message::new(1, 0xBB)).unwrap();
        assert_eq!(s.take_message(b).unwrap().map(|m| m.value), Some(0xBB));
        s.msg_reply(b, a, Message::new(2, 0)).unwrap();
        assert_eq!(s.status(a), ThreadStatus::Pending);
    }

    #[test]
    fn uncollected_message_blocks_send_until_taken() {
        let mut s = setup();
        let a = spawn(&mut s, "a", 4);
        let b = spawn(&mut s, "b", 4);
        let c = spawn(&mut s, "c", 4);

        s.msg_receive(b).unwrap();
        s.msg_send(a, b, Message::new(1, 0xAA)).unwrap();

        assert_eq!(s.msg_send(b, c, Message::new(1, 1)), Err(SchedError::Busy));
        assert_eq!(s.status(b), ThreadStatus::Pending);
        assert_eq!(s.thread(c).unwrap().pending_senders(), 0);
        assert_eq!(
            s.thread(b).unwrap().delivered_message().map(|m| m.value),
            Some(0xAA)
        );

        s.take_message(b).unwrap();
        assert_eq!(s.msg_send(b, c, Message::new(1, 1)), Ok(SendOutcome::Queued));
    }

    #[test]
    fn stopping_queued_sender_leaves_receiver_queue() {
        let mut s = setup();
        let rx = spawn(&mut s, "rx", 4);
        let tx = spawn(&mut s, "tx", 4);
        s.msg_send(tx, rx, Message::new(1, 1)).unwrap();
        s.stop(tx).unwrap();
        assert_eq!(s.thread(rx).unwrap().pending_senders(), 0);
        assert_eq!(s.msg_receive(rx), Ok(None));
    }
}
