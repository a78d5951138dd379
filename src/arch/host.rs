//! CPU "de host".
//!
//! Não existe IRQ real aqui: o flag de interrupção é apenas modelado, para
//! que a disciplina de seção crítica continue observável em testes e em
//! alvos onde o controle de interrupções é feito fora do kernel.

use core::sync::atomic::{AtomicBool, Ordering};

use super::traits::InterruptControl;

/// Flag de interrupção modelado (true = habilitadas)
static IRQ_ENABLED: AtomicBool = AtomicBool::new(true);

/// Implementação de `InterruptControl` sem hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostCpu;

impl InterruptControl for HostCpu {
    #[inline]
    fn disable_interrupts() {
        IRQ_ENABLED.store(false, Ordering::Release);
    }

    #[inline]
    fn enable_interrupts() {
        IRQ_ENABLED.store(true, Ordering::Release);
    }

    #[inline]
    fn are_interrupts_enabled() -> bool {
        IRQ_ENABLED.load(Ordering::Acquire)
    }
}
