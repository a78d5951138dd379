//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno do núcleo.

pub mod list;
pub mod test_framework;

pub use list::{Link, LinkArena, LinkKind, TidList};

/// Alinha um endereço para cima.
///
/// # Exemplo
/// `align_up(10, 4) -> 12`
#[inline]
pub const fn align_up(addr: usize, align: usize) -> usize {
    (addr + align - 1) & !(align - 1)
}

/// Como `align_up`, mas `None` se o resultado não cabe em `usize`.
#[inline]
pub const fn checked_align_up(addr: usize, align: usize) -> Option<usize> {
    match addr.checked_add(align - 1) {
        Some(sum) => Some(sum & !(align - 1)),
        None => None,
    }
}

/// Verifica se um endereço está alinhado.
#[inline]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    (addr & (align - 1)) == 0
}
