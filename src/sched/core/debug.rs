//! Ferramentas de Debug para o Scheduler

use super::scheduler::Scheduler;
use crate::klib::LinkKind;
use crate::sched::config::PRIORITY_LEVELS;
use crate::sched::task::stack;
use crate::sched::task::{CreateFlags, ThreadStatus, WaitData};
use crate::sys::Priority;

/// Imprime o estado de todas as threads conhecidas.
pub fn dump_threads(sched: &Scheduler) {
    crate::ktrace!("--- [TRACE] TABELA DE THREADS ---");
    match sched.current() {
        Some(tid) => crate::ktrace!("  - CURRENT TID:", tid.as_u16()),
        None => crate::ktrace!("  - CURRENT: None (idle)"),
    }
    crate::ktrace!("  - Tick:", sched.now());

    for tcb in sched.threads() {
        crate::klog!("    -> TID:", tcb.tid().as_u16(), " Prio:", tcb.priority().as_u8());
        crate::klog!(" ");
        crate::klog!(tcb.status().name());
        crate::klog!(" ");
        crate::klog!(tcb.name());
        if tcb.flags().contains(CreateFlags::STACKTEST) {
            let used = tcb.stack().size() - stack::measure_free(tcb.stack());
            crate::klog!(" StackUsada:", used, "/", tcb.stack().size());
        }
        crate::knl!();
    }

    crate::ktrace!("  - Prontas na RunQueue:", sched.runqueue.len());
    if let Some(priority) = sched.runqueue.highest_priority() {
        crate::ktrace!("  - Prioridade mais alta pronta:", priority.as_u8());
    }
    crate::ktrace!("  - Timers armados:", sched.timers.len());
    if let Some(deadline) = sched.timers.next_deadline() {
        crate::ktrace!("  - Próximo deadline:", deadline);
    }
    for timer in sched.timers.iter() {
        crate::klog!("    -> Timer:", timer.id.as_u32(), " Deadline:", timer.deadline);
        crate::klog!(" ");
        crate::klog!(timer.kind.name());
        if let Some(waiter) = timer.waiter {
            crate::klog!(" Waiter:", waiter.as_u16());
        }
        crate::knl!();
    }
    crate::ktrace!("--- [TRACE] FIM DO DUMP ---");
}

/// Confere as invariantes do TCB e das filas.
///
/// Retorna a primeira violação encontrada.
pub fn check_invariants(sched: &Scheduler) -> Result<(), &'static str> {
    let threads = &sched.threads;
    let mut running = 0;
    let mut runnable = 0;

    for tcb in threads.iter() {
        let tid = tcb.tid();
        let status = tcb.status();

        // TID único == índice do slot
        if !threads.get(tid).is_some_and(|t| core::ptr::eq(t, tcb)) {
            return Err("tid does not match its table slot");
        }

        // executável ⇔ encadeado na run-queue
        if status.is_runnable() != tcb.is_on_runqueue() {
            return Err("runnable status and run-queue linkage disagree");
        }
        if status.is_runnable() {
            runnable += 1;
            if !sched.runqueue.contains(threads, tid, tcb.priority()) {
                return Err("runnable thread missing from its priority bucket");
            }
        }

        if !tcb.wait_data().fits(status) {
            return Err("wait_data does not fit status");
        }

        if !tcb.stack().contains(tcb.sp()) {
            return Err("saved sp outside its stack");
        }

        if status == ThreadStatus::Running {
            running += 1;
            if sched.current() != Some(tid) {
                return Err("running thread is not current");
            }
        }

        // fila secundária ⇔ MutexBlocked / SendBlocked
        if status.uses_msg_queue() != tcb.is_on_msg_queue() {
            return Err("wait-queue linkage and status disagree");
        }
        match *tcb.wait_data() {
            WaitData::Mutex(id) if status == ThreadStatus::MutexBlocked => {
                let queued = sched
                    .mutexes
                    .get(id)
                    .is_some_and(|m| m.waiters.contains(threads, LinkKind::MsgQueue, tid));
                if !queued {
                    return Err("mutex waiter missing from the mutex wait list");
                }
            }
            WaitData::Outgoing { target, .. } => {
                let queued = threads
                    .get(target)
                    .is_some_and(|t| t.msg_waiters.contains(threads, LinkKind::MsgQueue, tid));
                if !queued {
                    return Err("sender missing from the receiver's sender list");
                }
            }
            _ => {}
        }
    }

    if running > 1 {
        return Err("more than one running thread");
    }
    if runnable != sched.runqueue.len() {
        return Err("run-queue holds threads that are not runnable");
    }

    // bit n ⇔ bucket n não vazio
    for level in 0..PRIORITY_LEVELS {
        let Some(priority) = Priority::new(level as u8) else {
            continue;
        };
        let bit = sched.runqueue.bitcache() & (1 << level) != 0;
        if bit == sched.runqueue.bucket(priority).is_empty() {
            return Err("run-queue bitcache out of sync");
        }
    }

    Ok(())
}
