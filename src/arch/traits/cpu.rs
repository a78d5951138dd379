//! Interface Abstrata de CPU (HAL).
//! Define as operações de interrupção que qualquer arquitetura deve implementar.

pub trait InterruptControl {
    /// Desabilita interrupções globalmente (CLI).
    /// Crítico para seções atômicas do scheduler.
    fn disable_interrupts();

    /// Habilita interrupções globalmente (STI).
    fn enable_interrupts();

    /// Verifica se as interrupções estão habilitadas.
    fn are_interrupts_enabled() -> bool;

    /// Desabilita interrupções e retorna o estado anterior.
    #[inline]
    fn save_and_disable() -> bool {
        let was_enabled = Self::are_interrupts_enabled();
        Self::disable_interrupts();
        was_enabled
    }

    /// Restaura o estado salvo por `save_and_disable`.
    #[inline]
    fn restore(was_enabled: bool) {
        if was_enabled {
            Self::enable_interrupts();
        }
    }
}
