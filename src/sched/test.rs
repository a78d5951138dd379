//! Testes do Escalonador (Scheduler)
//!
//! Self-test executado no boot com a feature `self_test`: cada caso monta um
//! scheduler próprio e percorre um cenário completo de transições.

use crate::ipc::{Message, SendOutcome};
use crate::klib::test_framework::{check, run_test_suite, SuiteReport, TestCase, TestResult};
use crate::sched::config::{SchedConfig, STACK_DEFAULT_SIZE};
use crate::sched::core::{check_invariants, Scheduler};
use crate::sched::task::{CreateFlags, ThreadStatus};
use crate::sys::Tid;

/// Casos de teste do scheduler
const SCHED_TESTS: &[TestCase] = &[
    TestCase::new("sched_priority_pick", test_priority_pick),
    TestCase::new("sched_sleep_ticks", test_sleep_ticks),
    TestCase::new("sched_ipc_rendezvous", test_ipc_rendezvous),
    TestCase::new("sched_mutex_waiters", test_mutex_waiters),
    TestCase::new("sched_stop_reap", test_stop_reap),
];

/// Executa todos os testes de scheduler
pub fn run_sched_tests() -> SuiteReport {
    run_test_suite("Scheduler", SCHED_TESTS)
}

fn fresh() -> Scheduler {
    Scheduler::new(SchedConfig::new().with_max_threads(8).with_stack_pool_size(16 * 1024))
}

fn spawn(s: &mut Scheduler, prio: u8) -> Option<Tid> {
    s.spawn("selftest", prio, STACK_DEFAULT_SIZE, CreateFlags::empty())
        .ok()
}

/// A cabeça do nível mais prioritário é escolhida
fn test_priority_pick() -> TestResult {
    let mut s = fresh();
    let (Some(_low), Some(high)) = (spawn(&mut s, 10), spawn(&mut s, 1)) else {
        return TestResult::Failed;
    };
    if s.schedule() != Some(high) {
        crate::kerror!("(Sched) Prioridade ignorada na escolha");
        return TestResult::Failed;
    }
    check(
        s.status(high) == ThreadStatus::Running && check_invariants(&s).is_ok(),
        "(Sched) Estado após schedule incorreto",
    )
}

/// Sono de 100 ticks volta à run-queue na mesma prioridade
fn test_sleep_ticks() -> TestResult {
    let mut s = fresh();
    let Some(t) = spawn(&mut s, 6) else {
        return TestResult::Failed;
    };
    if s.sleep_for(t, 100).is_err() {
        return TestResult::Failed;
    }
    s.advance(99);
    if s.status(t) != ThreadStatus::Sleeping {
        crate::kerror!("(Sched) Acordou cedo demais");
        return TestResult::Failed;
    }
    s.tick();
    let back = s
        .thread(t)
        .is_some_and(|tcb| tcb.status() == ThreadStatus::Pending && tcb.is_on_runqueue());
    check(back, "(Sched) Thread não voltou da espera")
}

/// Envio para destino em receive entrega direto
fn test_ipc_rendezvous() -> TestResult {
    let mut s = fresh();
    let (Some(a), Some(b)) = (spawn(&mut s, 4), spawn(&mut s, 4)) else {
        return TestResult::Failed;
    };
    if s.msg_receive(b) != Ok(None) {
        return TestResult::Failed;
    }
    if s.msg_send(a, b, Message::new(1, 0x42)) != Ok(SendOutcome::Delivered) {
        crate::kerror!("(IPC) Rendezvous não aconteceu");
        return TestResult::Failed;
    }
    let delivered = s
        .thread(b)
        .and_then(|tcb| tcb.delivered_message().copied());
    check(
        s.status(a) == ThreadStatus::ReplyBlocked
            && s.status(b) == ThreadStatus::Pending
            && delivered.is_some_and(|m| m.value == 0x42 && m.sender == a),
        "(IPC) Estados após rendezvous incorretos",
    )
}

/// Espera mais prioritária ganha o mutex primeiro
fn test_mutex_waiters() -> TestResult {
    let mut s = fresh();
    let (Some(owner), Some(low), Some(high)) =
        (spawn(&mut s, 5), spawn(&mut s, 9), spawn(&mut s, 2))
    else {
        return TestResult::Failed;
    };
    let m = s.mutex_create();
    let locked = s.mutex_lock(owner, m) == Ok(true)
        && s.mutex_lock(low, m) == Ok(false)
        && s.mutex_lock(high, m) == Ok(false);
    if !locked {
        return TestResult::Failed;
    }
    check(
        s.mutex_unlock(owner, m) == Ok(Some(high))
            && s.status(high) == ThreadStatus::Pending
            && s.status(low) == ThreadStatus::MutexBlocked,
        "(Mutex) Ordem de espera por prioridade violada",
    )
}

/// TID não é reaproveitado antes do reap
fn test_stop_reap() -> TestResult {
    let mut s = fresh();
    let Some(t) = spawn(&mut s, 3) else {
        return TestResult::Failed;
    };
    if s.stop(t).is_err() || s.status(t) != ThreadStatus::Stopped {
        return TestResult::Failed;
    }
    if spawn(&mut s, 3) == Some(t) {
        crate::kerror!("(Sched) TID reaproveitado antes do reap");
        return TestResult::Failed;
    }
    check(
        s.reap(t).is_ok() && s.status(t) == ThreadStatus::NotFound,
        "(Sched) Reap não liberou o TID",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_test_suite_passes() {
        let report = run_sched_tests();
        assert_eq!(report.failed, 0);
        assert_eq!(report.passed, SCHED_TESTS.len());
    }
}
