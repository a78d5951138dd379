//! Constantes de configuração do Scheduler

/// Número de níveis de prioridade (buckets da run-queue).
/// Limitado a 32 pelo bitcache `u32` da run-queue.
pub const PRIORITY_LEVELS: usize = 16;

/// Prioridade máxima (0 = maior)
pub const PRIORITY_MAX: u8 = 0;

/// Prioridade mínima
pub const PRIORITY_MIN: u8 = (PRIORITY_LEVELS - 1) as u8;

/// Prioridade da tarefa Idle
pub const PRIORITY_IDLE: u8 = PRIORITY_MIN;

/// Prioridade padrão da thread principal
pub const PRIORITY_MAIN: u8 = PRIORITY_MIN - (PRIORITY_LEVELS / 2) as u8;

/// Capacidade padrão da tabela de threads (TID 1..=MAX_THREADS)
pub const MAX_THREADS: usize = 32;

/// Alinhamento das stacks (em bytes)
pub const STACK_ALIGN: usize = 16;

/// Menor stack aceita no spawn (em bytes)
pub const STACK_MIN_SIZE: usize = 256;

/// Tamanho padrão de stack (em bytes)
pub const STACK_DEFAULT_SIZE: usize = 1024;

/// Tamanho padrão do pool de stacks (em bytes)
pub const STACK_POOL_SIZE: usize = 64 * 1024;

/// Palavras reservadas no topo da stack para o frame inicial de contexto
pub const INITIAL_FRAME_WORDS: usize = 16;

/// Padrão pintado nas stacks com `CreateFlags::STACKTEST`
pub const STACK_MARKER: usize = usize::from_ne_bytes([0xA5; core::mem::size_of::<usize>()]);

/// Quantum padrão (Timeslice) em ticks do timer
pub const DEFAULT_QUANTUM: u32 = 10;

const _: () = assert!(PRIORITY_LEVELS <= 32);
const _: () = assert!(MAX_THREADS < u16::MAX as usize);
const _: () = assert!(STACK_MIN_SIZE > INITIAL_FRAME_WORDS * core::mem::size_of::<usize>());

/// Configuração de runtime do scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedConfig {
    /// Quantidade máxima de threads vivas (incluindo Stopped não colhidas)
    pub max_threads: usize,
    /// Bytes disponíveis para stacks
    pub stack_pool_size: usize,
    /// Ticks de CPU por despacho antes de preempção
    pub quantum: u32,
}

impl SchedConfig {
    pub const fn new() -> Self {
        Self {
            max_threads: MAX_THREADS,
            stack_pool_size: STACK_POOL_SIZE,
            quantum: DEFAULT_QUANTUM,
        }
    }

    pub const fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub const fn with_stack_pool_size(mut self, bytes: usize) -> Self {
        self.stack_pool_size = bytes;
        self
    }

    pub const fn with_quantum(mut self, ticks: u32) -> Self {
        self.quantum = ticks;
        self
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::new()
    }
}
