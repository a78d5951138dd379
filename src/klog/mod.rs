// =============================================================================
// KERNEL LOGGING SYSTEM - ZERO OVERHEAD
// =============================================================================
//
// Sistema de logging do núcleo de escalonamento com custo ZERO em release.
//
// ARQUITETURA:
// - Usa features do Cargo para compile-time filtering
// - Com feature "no_logs", TODOS os macros viram expressões vazias
// - SEM core::fmt - Apenas strings literais e valores em hexadecimal
// - SEM alocação
// - Escreve no sink registrado (serial, buffer de teste, ...)
//
// NÍVEIS DE LOG (do mais crítico ao menos):
// - ERROR: Violações de invariante e estados impossíveis
// - WARN:  Operações rejeitadas que indicam uso incorreto
// - INFO:  Ciclo de vida (spawn, stop, reap, init)
// - DEBUG: Transições de estado (block, wake, rendezvous)
// - TRACE: Cada decisão do scheduler
//
// COMO USAR:
//   kinfo!("(Sched) Scheduler inicializado");   // Apenas string
//   kinfo!("(Sched) spawn TID=", tid.as_u16()); // String + hex
//   klog!("TID=", tid, " Prio=", prio);         // Múltiplos valores
//
// =============================================================================

pub mod sink;

pub use sink::{set_sink, take_sink, LogSink};

// =============================================================================
// PREFIXOS COM CORES ANSI
// =============================================================================

pub const P_ERROR: &str = "\x1b[1;31m[ERRO]\x1b[0m ";
pub const P_WARN: &str = "\x1b[1;33m[WARN]\x1b[0m ";
pub const P_INFO: &str = "\x1b[32m[INFO]\x1b[0m ";
pub const P_DEBUG: &str = "\x1b[36m[DEBG]\x1b[0m ";
pub const P_TRACE: &str = "\x1b[35m[TRAC]\x1b[0m ";
pub const P_OK: &str = "\x1b[32m[OK]\x1b[0m ";
pub const P_FAIL: &str = "\x1b[1;31m[FAIL]\x1b[0m ";

/// Linha completa: prefixo, mensagem, valor opcional e CRLF.
#[doc(hidden)]
#[macro_export]
macro_rules! __kline {
    ($prefix:expr, $msg:expr) => {{
        $crate::klog::sink::emit_str($prefix);
        $crate::klog::sink::emit_str($msg);
        $crate::klog::sink::emit_nl();
    }};
    ($prefix:expr, $msg:expr, $val:expr) => {{
        $crate::klog::sink::emit_str($prefix);
        $crate::klog::sink::emit_str($msg);
        $crate::klog::sink::emit_hex($val as u64);
        $crate::klog::sink::emit_nl();
    }};
}

// =============================================================================
// NÍVEIS SEMPRE ATIVOS (exceto no_logs): ERROR, WARN, OK, FAIL
// =============================================================================

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kerror {
    ($($arg:expr),+ $(,)?) => { $crate::__kline!($crate::klog::P_ERROR, $($arg),+) };
}

#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kwarn {
    ($($arg:expr),+ $(,)?) => { $crate::__kline!($crate::klog::P_WARN, $($arg),+) };
}

/// kok! - Caso de teste aprovado.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kok {
    ($msg:expr) => { $crate::__kline!($crate::klog::P_OK, $msg) };
}

/// kfail! - Caso de teste reprovado.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! kfail {
    ($msg:expr) => { $crate::__kline!($crate::klog::P_FAIL, $msg) };
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kerror {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kwarn {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kok {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! kfail {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// INFO (log_info, log_debug, log_trace)
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! kinfo {
    ($($arg:expr),+ $(,)?) => { $crate::__kline!($crate::klog::P_INFO, $($arg),+) };
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_info", feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! kinfo {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// DEBUG (log_debug, log_trace)
// =============================================================================

#[cfg(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
))]
#[macro_export]
macro_rules! kdebug {
    ($($arg:expr),+ $(,)?) => { $crate::__kline!($crate::klog::P_DEBUG, $($arg),+) };
}

#[cfg(not(all(
    not(feature = "no_logs"),
    any(feature = "log_debug", feature = "log_trace")
)))]
#[macro_export]
macro_rules! kdebug {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// TRACE (log_trace)
// =============================================================================

#[cfg(all(not(feature = "no_logs"), feature = "log_trace"))]
#[macro_export]
macro_rules! ktrace {
    ($($arg:expr),+ $(,)?) => { $crate::__kline!($crate::klog::P_TRACE, $($arg),+) };
}

#[cfg(not(all(not(feature = "no_logs"), feature = "log_trace")))]
#[macro_export]
macro_rules! ktrace {
    ($($t:tt)*) => {{}};
}

// =============================================================================
// SAÍDA CRUA (dumps de tabela)
// =============================================================================

/// klog! - Pedaços de linha sem prefixo: strings e valores alternados,
/// começando por string. Feche a linha com `knl!()`.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! klog {
    () => {{}};
    ($msg:expr) => {{
        $crate::klog::sink::emit_str($msg);
    }};
    ($msg:expr, $val:expr $(, $rest:expr)*) => {{
        $crate::klog::sink::emit_str($msg);
        $crate::klog::sink::emit_hex($val as u64);
        $crate::klog!($($rest),*);
    }};
}

/// knl! - Fecha a linha.
#[cfg(not(feature = "no_logs"))]
#[macro_export]
macro_rules! knl {
    () => {{
        $crate::klog::sink::emit_nl();
    }};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! klog {
    ($($t:tt)*) => {{}};
}

#[cfg(feature = "no_logs")]
#[macro_export]
macro_rules! knl {
    () => {{}};
}
