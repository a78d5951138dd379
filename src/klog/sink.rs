// =============================================================================
// LOG SINK - ZERO OVERHEAD
// =============================================================================
//
// Destino final dos macros de log.
//
// ARQUITETURA:
// - SEM core::fmt - Formatação hexadecimal manual
// - SEM alocação - Apenas slices de bytes
// - O backend (UART, buffer em RAM, stdout do host) é registrado em runtime
//   via `set_sink`. Sem sink registrado, toda saída é descartada.
//
// FUNÇÕES DISPONÍVEIS:
// - emit(byte)       : Envia um byte
// - emit_str(s)      : Envia string
// - emit_hex(v)      : Envia u64 em hexadecimal
// - emit_nl()        : Envia newline (\r\n)
//
// NOTA IMPORTANTE:
// O lock protege apenas o registro do sink, não a linha de log. Em SMP ou
// com logs vindos de IRQ, linhas podem se intercalar. Aceitável para debug.
//
// =============================================================================

use spin::Mutex;

/// Backend de saída de log.
///
/// Implementações devem ser não-bloqueantes e NUNCA chamar os macros de log
/// (o sink não é reentrante).
pub trait LogSink: Sync {
    /// Escreve bytes brutos no dispositivo.
    fn write_bytes(&self, bytes: &[u8]);
}

/// Sink atualmente registrado
static SINK: Mutex<Option<&'static dyn LogSink>> = Mutex::new(None);

/// Registra o destino dos logs, substituindo o anterior.
pub fn set_sink(sink: &'static dyn LogSink) {
    *SINK.lock() = Some(sink);
}

/// Remove o sink registrado (logs passam a ser descartados).
pub fn take_sink() -> Option<&'static dyn LogSink> {
    SINK.lock().take()
}

#[inline]
fn current() -> Option<&'static dyn LogSink> {
    // Copia a referência e solta o lock antes de escrever
    *SINK.lock()
}

// =============================================================================
// FUNÇÕES DE ESCRITA - CORE
// =============================================================================

/// Envia um único byte.
#[inline]
pub fn emit(byte: u8) {
    if let Some(sink) = current() {
        sink.write_bytes(&[byte]);
    }
}

/// Envia uma string.
#[inline(never)]
pub fn emit_str(s: &str) {
    if let Some(sink) = current() {
        sink.write_bytes(s.as_bytes());
    }
}

/// Envia uma nova linha (CRLF).
#[inline(never)]
pub fn emit_nl() {
    if let Some(sink) = current() {
        sink.write_bytes(b"\r\n");
    }
}

// =============================================================================
// FUNÇÕES DE ESCRITA - FORMATAÇÃO NUMÉRICA
// =============================================================================

/// Envia um valor u64 em formato hexadecimal.
///
/// Formato de saída: 0x0123456789ABCDEF (sempre 18 caracteres)
#[inline(never)]
pub fn emit_hex(value: u64) {
    if let Some(sink) = current() {
        sink.write_bytes(&format_hex(value));
    }
}

/// Formata `value` como `0x` + 16 nibbles maiúsculos.
pub const fn format_hex(value: u64) -> [u8; 18] {
    let mut out = [0u8; 18];
    out[0] = b'0';
    out[1] = b'x';
    let mut i = 0;
    while i < 16 {
        let shift = 60 - (i * 4);
        out[2 + i] = nibble_to_ascii(((value >> shift) & 0xF) as u8);
        i += 1;
    }
    out
}

#[inline(always)]
const fn nibble_to_ascii(nibble: u8) -> u8 {
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'A' + (nibble - 10)
    }
}
