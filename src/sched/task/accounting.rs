//! Contabilidade de Recursos (Accounting)
//!
//! Rastreia o consumo de CPU de cada thread: despachos, trocas de contexto
//! e o quantum restante da fatia atual.

/// Estatísticas de uso de recursos de uma thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Accounting {
    /// Ticks em que a thread estava Running
    pub runtime_ticks: u64,

    /// Número de vezes que foi escolhida pelo scheduler
    pub dispatches: u64,

    /// Número de trocas de contexto voluntárias (yield, bloqueio)
    pub voluntary_switches: u64,

    /// Número de trocas de contexto involuntárias (preempção)
    pub involuntary_switches: u64,

    /// Quantum restante nesta fatia de tempo (em ticks)
    pub quantum_left: u32,
}

impl Accounting {
    /// Cria uma nova estrutura de contabilidade zerada
    pub const fn new() -> Self {
        Self {
            runtime_ticks: 0,
            dispatches: 0,
            voluntary_switches: 0,
            involuntary_switches: 0,
            quantum_left: 0,
        }
    }

    /// Registra o início da execução (chamado quando a thread ganha a CPU)
    pub fn start_exec(&mut self, quantum: u32) {
        self.dispatches += 1;
        self.quantum_left = quantum;
    }

    /// Cobra um tick da thread em execução.
    /// Retorna true se o quantum acabou.
    pub fn charge_tick(&mut self) -> bool {
        self.runtime_ticks += 1;
        if self.quantum_left > 0 {
            self.quantum_left -= 1;
        }
        self.quantum_left == 0
    }

    /// Incrementa contadores de troca de contexto
    pub fn account_switch(&mut self, voluntary: bool) {
        if voluntary {
            self.voluntary_switches += 1;
        } else {
            self.involuntary_switches += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantum_expires_after_n_ticks() {
        let mut acc = Accounting::new();
        acc.start_exec(3);
        assert!(!acc.charge_tick());
        assert!(!acc.charge_tick());
        assert!(acc.charge_tick());
        assert_eq!(acc.runtime_ticks, 3);
        assert_eq!(acc.dispatches, 1);
    }

    #[test]
    fn switches_are_split_by_kind() {
        let mut acc = Accounting::new();
        acc.account_switch(true);
        acc.account_switch(false);
        acc.account_switch(false);
        assert_eq!(acc.voluntary_switches, 1);
        assert_eq!(acc.involuntary_switches, 2);
    }
}
