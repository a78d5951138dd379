//! # Orquestrador de Agendamento
//!
//! O `Scheduler` é o único dono dos TCBs e o único que os altera. Cada
//! transição de estado (status + wait_data + encadeamentos) acontece dentro
//! de uma chamada `&mut Scheduler`, então nenhum outro componente enxerga um
//! TCB no meio de uma transição.
//!
//! ## Mecanismos de Execução:
//! - **Cooperativo:** threads cedem a CPU via `yield_now`, `sleep`, IPC ou mutex.
//! - **Preemptivo:** `tick()` cobra o quantum de `current`; ao esgotar, o
//!   bucket gira e `need_resched` é levantado.
//!
//! `schedule()` só decide quem roda. A troca de contexto real fica com a
//! arquitetura, que devolve o `sp` salvo via `save_context`.

use alloc::boxed::Box;

use super::runqueue::RunQueue;
use super::table::ThreadTable;
use super::timer::{Timer, TimerKind, TimerQueue};
use crate::sched::config::{SchedConfig, STACK_MIN_SIZE};
use crate::sched::task::stack::{self, HeapStackAllocator, StackAllocator};
use crate::sched::task::{CreateFlags, Tcb, ThreadStatus, TimerId, WaitData};
use crate::sync::mutex::MutexTable;
use crate::sys::{Priority, SchedError, SchedResult, Tid};

pub struct Scheduler {
    pub(crate) threads: ThreadTable,
    pub(crate) runqueue: RunQueue,
    pub(crate) timers: TimerQueue,
    pub(crate) mutexes: MutexTable,
    stacks: Box<dyn StackAllocator>,
    current: Option<Tid>,
    need_resched: bool,
    now: u64,
    config: SchedConfig,
    switches: u64,
}

impl Scheduler {
    /// Cria o scheduler com o pool de stacks padrão.
    pub fn new(config: SchedConfig) -> Self {
        let stacks = Box::new(HeapStackAllocator::new(config.stack_pool_size));
        Self::with_allocator(config, stacks)
    }

    /// Cria o scheduler com um alocador de stacks próprio.
    pub fn with_allocator(config: SchedConfig, stacks: Box<dyn StackAllocator>) -> Self {
        crate::kinfo!("(Sched) Inicializando. MaxThreads=", config.max_threads);
        Self {
            threads: ThreadTable::new(config.max_threads),
            runqueue: RunQueue::new(),
            timers: TimerQueue::new(),
            mutexes: MutexTable::new(),
            stacks,
            current: None,
            need_resched: false,
            now: 0,
            config,
            switches: 0,
        }
    }

    // =========================================================================
    // CONSULTAS
    // =========================================================================

    /// Thread despachada pelo último `schedule()`
    pub fn current(&self) -> Option<Tid> {
        self.current
    }

    /// Ticks desde a criação
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    /// Um `schedule()` é necessário?
    pub fn need_resched(&self) -> bool {
        self.need_resched
    }

    /// Total de trocas de thread feitas por `schedule()`
    pub fn context_switches(&self) -> u64 {
        self.switches
    }

    /// Status de `tid`; `NotFound` se não existe.
    pub fn status(&self, tid: Tid) -> ThreadStatus {
        self.threads
            .get(tid)
            .map_or(ThreadStatus::NotFound, Tcb::status)
    }

    pub fn thread(&self, tid: Tid) -> Option<&Tcb> {
        self.threads.get(tid)
    }

    /// Todos os TCBs existentes, em ordem de TID.
    pub fn threads(&self) -> impl Iterator<Item = &Tcb> {
        self.threads.iter()
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Bytes livres no pool de stacks
    pub fn stack_pool_free(&self) -> usize {
        self.stacks.free_bytes()
    }

    pub(crate) fn tcb(&self, tid: Tid) -> SchedResult<&Tcb> {
        self.threads.get(tid).ok_or(SchedError::NotFound)
    }

    pub(crate) fn tcb_mut(&mut self, tid: Tid) -> SchedResult<&mut Tcb> {
        self.threads.get_mut(tid).ok_or(SchedError::NotFound)
    }

    /// Exige que `tid` exista e esteja na run-queue.
    pub(crate) fn require_runnable(&self, tid: Tid) -> SchedResult<&Tcb> {
        let tcb = self.tcb(tid)?;
        if !tcb.status().is_runnable() {
            crate::kwarn!("(Sched) Thread não executável. TID=", tid.as_u16());
            return Err(SchedError::ThreadNotRunnable);
        }
        Ok(tcb)
    }

    /// Como `require_runnable`, mas recusa com `Busy` enquanto há mensagem
    /// entregue e não coletada: bloquear de novo a sobrescreveria.
    pub(crate) fn require_idle(&self, tid: Tid) -> SchedResult<&Tcb> {
        let tcb = self.require_runnable(tid)?;
        if tcb.delivered_message().is_some() {
            crate::kwarn!("(Sched) Mensagem não coletada. TID=", tid.as_u16());
            return Err(SchedError::Busy);
        }
        Ok(tcb)
    }

    // =========================================================================
    // CICLO DE VIDA
    // =========================================================================

    /// Cria uma thread.
    ///
    /// A thread nasce Pending na run-queue (ou Sleeping com
    /// `CreateFlags::SLEEPING`) com a stack preparada e `sp` no frame inicial.
    pub fn spawn(
        &mut self,
        name: &'static str,
        priority: u8,
        stack_size: usize,
        flags: CreateFlags,
    ) -> SchedResult<Tid> {
        let priority = Priority::new(priority).ok_or(SchedError::InvalidPriority)?;
        if stack_size < STACK_MIN_SIZE {
            crate::kwarn!("(Sched) spawn: stack pequena demais. Bytes=", stack_size);
            return Err(SchedError::StackTooSmall);
        }
        let tid = self.threads.free_tid().ok_or_else(|| {
            crate::kwarn!("(Sched) spawn: tabela de threads cheia");
            SchedError::TableFull
        })?;

        let region = self.stacks.allocate(stack_size)?;
        let sp = stack::prepare(&region, flags.contains(CreateFlags::STACKTEST));
        let mut tcb = Tcb::new(tid, name, priority, region, sp, flags);

        if flags.contains(CreateFlags::SLEEPING) {
            tcb.set_state(ThreadStatus::Sleeping, WaitData::None);
            self.threads.insert(tcb);
        } else {
            self.threads.insert(tcb);
            self.runqueue.push(&mut self.threads, tid, priority);
            if !flags.contains(CreateFlags::NO_YIELD) {
                self.request_resched_for(priority);
            }
        }

        crate::kinfo!("(Sched) Thread criada. TID=", tid.as_u16());
        crate::ktrace!("(Sched)   Prioridade=", priority.as_u8());
        self.verify();
        Ok(tid)
    }

    /// Para a thread e desfaz toda a participação dela em filas.
    ///
    /// - sai da run-queue, da fila de mutex ou da fila de remetentes do alvo;
    /// - o timer de despertar é cancelado;
    /// - mutexes que ela possui passam ao próximo da fila;
    /// - remetentes esperando por ela e threads esperando resposta dela
    ///   voltam a Pending sem mensagem.
    ///
    /// O TCB fica Stopped (o TID continua reservado) até `reap`.
    pub fn stop(&mut self, tid: Tid) -> SchedResult<()> {
        let (status, wait) = {
            let tcb = self.tcb(tid)?;
            (tcb.status(), *tcb.wait_data())
        };

        match (status, wait) {
            (ThreadStatus::Stopped, _) => return Err(SchedError::ThreadNotRunnable),
            (ThreadStatus::Running | ThreadStatus::Pending, _) => {
                let priority = self.tcb(tid)?.priority();
                self.runqueue.remove(&mut self.threads, tid, priority);
            }
            (ThreadStatus::Sleeping, WaitData::Timer(id)) => {
                self.timers.cancel(id);
            }
            (ThreadStatus::TimerWaiting, WaitData::Timer(id)) => {
                self.timers.clear_waiter(id);
            }
            (ThreadStatus::MutexBlocked, WaitData::Mutex(id)) => {
                self.mutex_forget_waiter(id, tid);
            }
            (ThreadStatus::SendBlocked, WaitData::Outgoing { target, .. }) => {
                self.forget_sender(target, tid);
            }
            _ => {}
        }

        self.tcb_mut(tid)?.set_state(ThreadStatus::Stopped, WaitData::None);

        self.release_dependents(tid);
        self.mutex_release_all(tid);

        if self.current == Some(tid) {
            self.need_resched = true;
        }
        crate::kinfo!("(Sched) Thread parada. TID=", tid.as_u16());
        self.verify();
        Ok(())
    }

    /// Destroi uma thread Stopped: devolve a stack e libera o TID.
    pub fn reap(&mut self, tid: Tid) -> SchedResult<()> {
        if self.tcb(tid)?.status() != ThreadStatus::Stopped {
            crate::kwarn!("(Sched) reap de thread viva. TID=", tid.as_u16());
            return Err(SchedError::Busy);
        }
        let tcb = self.threads.remove(tid).ok_or(SchedError::NotFound)?;
        self.stacks.release(*tcb.stack());
        if self.current == Some(tid) {
            self.current = None;
        }
        crate::kdebug!("(Sched) Thread colhida. TID=", tid.as_u16());
        self.verify();
        Ok(())
    }

    /// Colhe todas as threads Stopped. Retorna quantas.
    pub fn reap_all(&mut self) -> usize {
        let mut reaped = 0;
        loop {
            let next = self
                .threads
                .iter()
                .find(|t| t.status() == ThreadStatus::Stopped)
                .map(Tcb::tid);
            let Some(tid) = next else {
                break;
            };
            if self.reap(tid).is_err() {
                break;
            }
            reaped += 1;
        }
        reaped
    }

    // =========================================================================
    // ESCALONAMENTO
    // =========================================================================

    /// Escolhe quem roda: a cabeça do bucket mais prioritário.
    ///
    /// A thread anterior, se ainda Running, volta a Pending (continua na
    /// run-queue). Retorna a nova `current`, ou `None` se não há ninguém
    /// pronto (idle).
    pub fn schedule(&mut self) -> Option<Tid> {
        self.need_resched = false;
        let prev = self.current;
        let next = self.runqueue.highest();
        let quantum = self.config.quantum;

        if next.is_some() && next == prev {
            if let Some(tcb) = prev.and_then(|tid| self.threads.get_mut(tid)) {
                if tcb.status() == ThreadStatus::Running {
                    // Continua rodando; só renova o quantum se esgotou
                    if tcb.accounting.quantum_left == 0 {
                        tcb.accounting.quantum_left = quantum;
                    }
                    return prev;
                }
            }
        }

        if let Some(tcb) = prev.and_then(|tid| self.threads.get_mut(tid)) {
            // Ainda Running aqui = foi preemptada
            let preempted = tcb.status() == ThreadStatus::Running;
            if preempted {
                tcb.set_status(ThreadStatus::Pending);
            }
            if next != prev {
                tcb.accounting.account_switch(!preempted);
            }
        }

        if let Some(tcb) = next.and_then(|tid| self.threads.get_mut(tid)) {
            tcb.set_status(ThreadStatus::Running);
            tcb.accounting.start_exec(quantum);
        }

        if next != prev {
            self.switches += 1;
            match next {
                Some(tid) => crate::ktrace!("(Sched) schedule() selecionou TID=", tid.as_u16()),
                None => crate::ktrace!("(Sched) schedule(): nada pronto, idle"),
            }
        }
        self.current = next;
        self.verify();
        next
    }

    /// Cede a CPU: a thread vai para o fim do seu bucket.
    pub fn yield_now(&mut self, tid: Tid) -> SchedResult<()> {
        let priority = self.require_runnable(tid)?.priority();
        self.runqueue.requeue(&mut self.threads, tid, priority);
        self.tcb_mut(tid)?.set_status(ThreadStatus::Pending);
        self.need_resched = true;
        crate::ktrace!("(Sched) yield_now() TID=", tid.as_u16());
        self.verify();
        Ok(())
    }

    /// Um tick do timer: dispara timers vencidos e cobra o quantum de
    /// `current`. Retorna `need_resched`.
    pub fn tick(&mut self) -> bool {
        self.now += 1;

        while let Some(timer) = self.timers.pop_expired(self.now) {
            self.fire_timer(timer);
        }

        if let Some(tid) = self.current {
            let expired = match self.threads.get_mut(tid) {
                Some(tcb) if tcb.status() == ThreadStatus::Running => {
                    tcb.accounting.charge_tick().then_some(tcb.priority())
                }
                _ => None,
            };
            if let Some(priority) = expired {
                crate::ktrace!("(Sched) Quantum esgotado. TID=", tid.as_u16());
                // Round-robin: vai para o fim do bucket, ainda Running
                self.runqueue.requeue(&mut self.threads, tid, priority);
                self.need_resched = true;
            }
        }

        self.verify();
        self.need_resched
    }

    /// Avança `ticks` ticks. Retorna `need_resched`.
    pub fn advance(&mut self, ticks: u64) -> bool {
        for _ in 0..ticks {
            self.tick();
        }
        self.need_resched
    }

    // =========================================================================
    // SONO E TIMERS
    // =========================================================================

    /// Dorme indefinidamente, até um `wakeup`.
    pub fn sleep(&mut self, tid: Tid) -> SchedResult<()> {
        self.require_idle(tid)?;
        self.block(tid, ThreadStatus::Sleeping, WaitData::None)?;
        self.verify();
        Ok(())
    }

    /// Dorme por `ticks` ticks. Com 0, equivale a `yield_now`.
    pub fn sleep_for(&mut self, tid: Tid, ticks: u64) -> SchedResult<()> {
        if ticks == 0 {
            return self.yield_now(tid);
        }
        self.require_idle(tid)?;
        let deadline = self.now.saturating_add(ticks);
        let id = self.timers.arm(deadline, TimerKind::Wake, Some(tid));
        crate::kdebug!("(Sched) Dormindo até tick ", deadline);
        self.block(tid, ThreadStatus::Sleeping, WaitData::Timer(id))?;
        self.verify();
        Ok(())
    }

    /// Acorda uma thread Sleeping antes da hora.
    pub fn wakeup(&mut self, tid: Tid) -> SchedResult<()> {
        let tcb = self.tcb(tid)?;
        if tcb.status() != ThreadStatus::Sleeping {
            return Err(SchedError::ThreadNotRunnable);
        }
        if let Some(id) = tcb.wait_data().timer() {
            self.timers.cancel(id);
        }
        self.unblock(tid, WaitData::None)?;
        self.verify();
        Ok(())
    }

    /// Arma um timer one-shot para daqui a `ticks` ticks.
    pub fn timer_set(&mut self, ticks: u64) -> TimerId {
        let id = self.timers.arm(self.now.saturating_add(ticks), TimerKind::Oneshot, None);
        crate::ktrace!("(Timer) Armado. ID=", id.as_u32());
        id
    }

    /// Desarma um timer. Quem o esperava volta a Pending.
    pub fn timer_cancel(&mut self, id: TimerId) -> SchedResult<()> {
        let timer = self.timers.cancel(id).ok_or(SchedError::InvalidHandle)?;
        if let Some(waiter) = timer.waiter {
            self.unblock(waiter, WaitData::None)?;
        }
        self.verify();
        Ok(())
    }

    /// Bloqueia `tid` até o timer `id` disparar.
    pub fn timer_wait(&mut self, tid: Tid, id: TimerId) -> SchedResult<()> {
        self.require_idle(tid)?;
        self.timers.set_waiter(id, tid)?;
        self.block(tid, ThreadStatus::TimerWaiting, WaitData::Timer(id))?;
        self.verify();
        Ok(())
    }

    fn fire_timer(&mut self, timer: Timer) {
        let Some(waiter) = timer.waiter else {
            return;
        };
        // Wake só acorda quem dorme; Oneshot só quem o espera
        let expected = match timer.kind {
            TimerKind::Wake => ThreadStatus::Sleeping,
            TimerKind::Oneshot => ThreadStatus::TimerWaiting,
        };
        let waiting = self.threads.get(waiter).is_some_and(|tcb| {
            tcb.status() == expected && tcb.wait_data().timer() == Some(timer.id)
        });
        if waiting {
            crate::kdebug!("(Timer) Acordando TID=", waiter.as_u16());
            // Não falha: o waiter acabou de ser validado
            let _ = self.unblock(waiter, WaitData::None);
        }
    }

    // =========================================================================
    // CONTEXTO E STACK
    // =========================================================================

    /// Guarda o `sp` salvo pela troca de contexto.
    pub fn save_context(&mut self, tid: Tid, sp: usize) -> SchedResult<()> {
        self.tcb_mut(tid)?.set_sp(sp)
    }

    /// Bytes de stack nunca usados (só com `CreateFlags::STACKTEST`).
    pub fn stack_free(&self, tid: Tid) -> SchedResult<usize> {
        let tcb = self.tcb(tid)?;
        if !tcb.flags().contains(CreateFlags::STACKTEST) {
            return Err(SchedError::InvalidArgument);
        }
        Ok(stack::measure_free(tcb.stack()))
    }

    // =========================================================================
    // TRANSIÇÕES INTERNAS
    // =========================================================================

    /// Tira da run-queue e bloqueia com o payload dado.
    ///
    /// Não verifica invariantes: o chamador ainda pode ter que encadear a
    /// thread numa fila secundária.
    pub(crate) fn block(&mut self, tid: Tid, status: ThreadStatus, wait: WaitData) -> SchedResult<()> {
        debug_assert!(status.is_blocked());
        let priority = self.require_idle(tid)?.priority();
        self.runqueue.remove(&mut self.threads, tid, priority);
        self.tcb_mut(tid)?.set_state(status, wait);
        if self.current == Some(tid) {
            self.need_resched = true;
        }
        crate::kdebug!("(Sched) Bloqueada TID=", tid.as_u16());
        crate::ktrace!(status.name());
        Ok(())
    }

    /// Devolve uma thread bloqueada à run-queue como Pending.
    pub(crate) fn unblock(&mut self, tid: Tid, wait: WaitData) -> SchedResult<()> {
        let tcb = self.tcb_mut(tid)?;
        if !tcb.status().is_blocked() {
            return Err(SchedError::ThreadNotRunnable);
        }
        debug_assert!(!tcb.is_on_msg_queue(), "unblock while still on a wait list");
        let priority = tcb.priority();
        tcb.set_state(ThreadStatus::Pending, wait);
        self.runqueue.push(&mut self.threads, tid, priority);
        self.request_resched_for(priority);
        crate::kdebug!("(Sched) Desbloqueada TID=", tid.as_u16());
        Ok(())
    }

    /// Pede reescalonamento se `priority` vence a thread atual.
    fn request_resched_for(&mut self, priority: Priority) {
        let wins = match self.current.and_then(|tid| self.threads.get(tid)) {
            Some(cur) if cur.status() == ThreadStatus::Running => priority.is_higher_than(cur.priority()),
            _ => true,
        };
        if wins {
            self.need_resched = true;
        }
    }

    /// Solta remetentes e esperas de resposta que dependem de `tid`.
    fn release_dependents(&mut self, tid: Tid) {
        let waiting: alloc::vec::Vec<Tid> = self
            .threads
            .iter()
            .filter(|t| match (t.status(), t.wait_data()) {
                (ThreadStatus::SendBlocked, WaitData::Outgoing { target, .. }) => *target == tid,
                (ThreadStatus::ReplyBlocked, WaitData::Peer(peer)) => *peer == tid,
                _ => false,
            })
            .map(Tcb::tid)
            .collect();

        for other in waiting {
            if self.status(other) == ThreadStatus::SendBlocked {
                self.forget_sender(tid, other);
            }
            crate::kdebug!("(Sched) Liberando dependente TID=", other.as_u16());
            let _ = self.unblock(other, WaitData::None);
        }
    }

    /// Verificação de invariantes após cada operação (somente debug).
    #[inline]
    pub(crate) fn verify(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        if let Err(violation) = super::debug::check_invariants(self) {
            super::debug::dump_threads(self);
            panic!("scheduler invariant violated: {}", violation);
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedConfig::default())
    }
}
