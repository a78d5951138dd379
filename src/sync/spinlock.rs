//! Spinlock de seção crítica
//!
//! `spin::Mutex` com interrupções desabilitadas enquanto o lock é mantido:
//! um handler de IRQ nunca encontra o scheduler no meio de uma transição.
//!
//! # Quando usar
//!
//! - Seções críticas MUITO curtas
//! - Estado tocado também por handlers de interrupção
//!
//! # Quando NÃO usar
//!
//! - Seções que podem demorar ou dormir

use core::marker::PhantomData;
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};

use crate::arch::traits::InterruptControl;

pub struct IrqSpinlock<T, C: InterruptControl> {
    inner: spin::Mutex<T>,
    _cpu: PhantomData<fn() -> C>,
}

impl<T, C: InterruptControl> IrqSpinlock<T, C> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: spin::Mutex::new(data),
            _cpu: PhantomData,
        }
    }

    /// Desabilita interrupções e adquire o lock.
    pub fn lock(&self) -> IrqSpinlockGuard<'_, T, C> {
        let interrupts_were_enabled = C::save_and_disable();
        IrqSpinlockGuard {
            guard: ManuallyDrop::new(self.inner.lock()),
            interrupts_were_enabled,
            _cpu: PhantomData,
        }
    }

    /// Tenta adquirir sem girar. Se falhar, as interrupções são restauradas.
    pub fn try_lock(&self) -> Option<IrqSpinlockGuard<'_, T, C>> {
        let interrupts_were_enabled = C::save_and_disable();
        match self.inner.try_lock() {
            Some(guard) => Some(IrqSpinlockGuard {
                guard: ManuallyDrop::new(guard),
                interrupts_were_enabled,
                _cpu: PhantomData,
            }),
            None => {
                C::restore(interrupts_were_enabled);
                None
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// Consome o lock e devolve o dado.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// Guard do spinlock - libera o lock e só então restaura as interrupções
pub struct IrqSpinlockGuard<'a, T, C: InterruptControl> {
    guard: ManuallyDrop<spin::MutexGuard<'a, T>>,
    interrupts_were_enabled: bool,
    _cpu: PhantomData<fn() -> C>,
}

impl<T, C: InterruptControl> Deref for IrqSpinlockGuard<'_, T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T, C: InterruptControl> DerefMut for IrqSpinlockGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T, C: InterruptControl> Drop for IrqSpinlockGuard<'_, T, C> {
    fn drop(&mut self) {
        // SAFETY: o guard interno é solto exatamente uma vez, aqui.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        C::restore(self.interrupts_were_enabled);
    }
}
