//! Stacks de thread
//!
//! Cada TCB possui exclusivamente uma região de stack. As regiões vêm de um
//! `StackAllocator` no spawn e voltam para ele quando a thread é colhida.
//!
//! O alocador padrão (`HeapStackAllocator`) recorta as stacks de um pool
//! contíguo com `linked_list_allocator::Heap` (first fit).
//!
//! A stack cresce para baixo: o frame inicial de contexto fica no topo e o
//! ponteiro salvo (`sp`) aponta para ele. Com `STACKTEST`, o resto da região
//! é pintado com `STACK_MARKER` para que o uso máximo possa ser medido.

use alloc::boxed::Box;
use alloc::vec;
use core::alloc::Layout;
use core::mem::size_of;
use core::ptr::NonNull;

use linked_list_allocator::Heap;
use volatile::VolatilePtr;

use crate::klib::{align_up, checked_align_up, is_aligned};
use crate::sched::config::{INITIAL_FRAME_WORDS, STACK_ALIGN, STACK_MARKER, STACK_MIN_SIZE};
use crate::sys::{SchedError, SchedResult};

const WORD: usize = size_of::<usize>();

/// Região de memória de uma stack: `[start, start + size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackRegion {
    start: usize,
    size: usize,
}

impl StackRegion {
    /// # Safety
    /// `start..start + size` deve ser memória válida, alinhada a
    /// `STACK_ALIGN` e de uso exclusivo desta região.
    pub const unsafe fn from_raw(start: usize, size: usize) -> Self {
        Self { start, size }
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    /// Primeiro endereço além da região (topo da stack)
    pub const fn end(&self) -> usize {
        self.start + self.size
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end()
    }

    const fn words(&self) -> usize {
        self.size / WORD
    }

    /// Ponteiro volátil para a palavra `index` (contada a partir da base).
    ///
    /// # Safety
    /// `index < self.words()` e a região deve estar viva.
    unsafe fn word(&self, index: usize) -> VolatilePtr<'_, usize> {
        debug_assert!(index < self.words());
        let ptr = (self.start as *mut usize).add(index);
        VolatilePtr::new(NonNull::new_unchecked(ptr))
    }
}

/// Prepara uma stack recém-alocada e retorna o `sp` inicial.
///
/// Zera o frame inicial no topo; com `paint`, pinta o restante com
/// `STACK_MARKER`.
pub(crate) fn prepare(region: &StackRegion, paint: bool) -> usize {
    let words = region.words();
    let frame_base = words.saturating_sub(INITIAL_FRAME_WORDS);

    // SAFETY: todos os índices são < words e a região pertence à thread
    // sendo criada (ninguém mais a referencia ainda).
    unsafe {
        if paint {
            for i in 0..frame_base {
                region.word(i).write(STACK_MARKER);
            }
        }
        for i in frame_base..words {
            region.word(i).write(0);
        }
    }

    region.start + frame_base * WORD
}

/// Bytes nunca tocados desde o spawn (a partir da base da stack).
///
/// Só faz sentido para stacks pintadas com `STACKTEST`.
pub(crate) fn measure_free(region: &StackRegion) -> usize {
    let mut free = 0;
    // SAFETY: índices limitados a words; a thread ainda possui a região.
    unsafe {
        while free < region.words() && region.word(free).read() == STACK_MARKER {
            free += 1;
        }
    }
    free * WORD
}

/// Colaborador que fornece e recolhe stacks.
pub trait StackAllocator: Send {
    /// Aloca uma região de pelo menos `size` bytes, alinhada a `STACK_ALIGN`.
    fn allocate(&mut self, size: usize) -> SchedResult<StackRegion>;

    /// Devolve uma região obtida de `allocate`.
    fn release(&mut self, region: StackRegion);

    /// Bytes ainda disponíveis
    fn free_bytes(&self) -> usize;
}

/// Pool de stacks sobre `linked_list_allocator`.
pub struct HeapStackAllocator {
    heap: Heap,
    pool: NonNull<usize>,
    pool_words: usize,
}

// SAFETY: o pool é possuído exclusivamente por este alocador; o `Heap` só
// guarda ponteiros para dentro dele. Acesso é serializado pelo scheduler.
unsafe impl Send for HeapStackAllocator {}

impl HeapStackAllocator {
    /// Cria um pool de `bytes` bytes no heap do kernel.
    pub fn new(bytes: usize) -> Self {
        let pool_words = align_up(bytes.max(STACK_MIN_SIZE), STACK_ALIGN) / WORD;
        let pool = Box::into_raw(vec![0usize; pool_words].into_boxed_slice()) as *mut usize;
        // SAFETY: ponteiro vindo de Box::into_raw, nunca nulo.
        let pool = unsafe { NonNull::new_unchecked(pool) };
        // SAFETY: a região é nova, exclusiva e vive até o Drop.
        let heap = unsafe { Heap::new(pool.as_ptr() as *mut u8, pool_words * WORD) };

        crate::kdebug!("(Stack) Pool criado. Bytes=", (pool_words * WORD) as u64);
        Self {
            heap,
            pool,
            pool_words,
        }
    }

    /// Layout de uma stack de `size` bytes; tamanhos que nem cabem num
    /// `Layout` jamais caberiam no pool.
    fn layout(size: usize) -> SchedResult<Layout> {
        let size = checked_align_up(size, STACK_ALIGN).ok_or(SchedError::OutOfMemory)?;
        Layout::from_size_align(size, STACK_ALIGN).map_err(|_| SchedError::OutOfMemory)
    }
}

impl StackAllocator for HeapStackAllocator {
    fn allocate(&mut self, size: usize) -> SchedResult<StackRegion> {
        let layout = Self::layout(size)?;
        match self.heap.allocate_first_fit(layout) {
            Ok(ptr) => {
                let start = ptr.as_ptr() as usize;
                debug_assert!(is_aligned(start, STACK_ALIGN));
                Ok(StackRegion {
                    start,
                    size: layout.size(),
                })
            }
            Err(()) => {
                crate::kwarn!("(Stack) Pool esgotado. Pedido=", size as u64);
                Err(SchedError::OutOfMemory)
            }
        }
    }

    fn release(&mut self, region: StackRegion) {
        let (Ok(layout), Some(ptr)) = (
            Self::layout(region.size),
            NonNull::new(region.start as *mut u8),
        ) else {
            crate::kerror!("(Stack) Região inválida devolvida ao pool. Start=", region.start as u64);
            return;
        };
        // SAFETY: a região veio de `allocate` com o mesmo layout e o dono
        // (TCB colhido) não existe mais.
        unsafe { self.heap.deallocate(ptr, layout) };
    }

    fn free_bytes(&self) -> usize {
        self.heap.free()
    }
}

impl Drop for HeapStackAllocator {
    fn drop(&mut self) {
        let slice = core::ptr::slice_from_raw_parts_mut(self.pool.as_ptr(), self.pool_words);
        // SAFETY: reconstrói exatamente o Box criado em `new`.
        drop(unsafe { Box::from_raw(slice) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_aligned_and_disjoint() {
        let mut pool = HeapStackAllocator::new(8 * 1024);
        let a = pool.allocate(1000).unwrap();
        let b = pool.allocate(1000).unwrap();
        assert_eq!(a.start() % STACK_ALIGN, 0);
        assert_eq!(b.start() % STACK_ALIGN, 0);
        assert!(a.size() >= 1000 && a.size() % STACK_ALIGN == 0);
        assert!(a.end() <= b.start() || b.end() <= a.start());
    }

    #[test]
    fn oversized_request_is_rejected() {
        let mut pool = HeapStackAllocator::new(4 * 1024);
        assert_eq!(pool.allocate(usize::MAX - 4), Err(SchedError::OutOfMemory));
        assert_eq!(pool.allocate(usize::MAX / 2), Err(SchedError::OutOfMemory));
        assert!(pool.allocate(512).is_ok());
    }

    #[test]
    fn exhaustion_and_reuse() {
        let mut pool = HeapStackAllocator::new(4 * 1024);
        let a = pool.allocate(2048).unwrap();
        assert_eq!(pool.allocate(4096), Err(SchedError::OutOfMemory));
        let before = pool.free_bytes();
        pool.release(a);
        assert!(pool.free_bytes() > before);
        assert!(pool.allocate(3000).is_ok());
    }

    #[test]
    fn prepare_places_sp_inside_region() {
        let mut pool = HeapStackAllocator::new(4 * 1024);
        let region = pool.allocate(512).unwrap();
        let sp = prepare(&region, false);
        assert!(region.contains(sp));
        assert_eq!(sp, region.end() - INITIAL_FRAME_WORDS * WORD);
    }

    #[test]
    fn painted_stack_reports_free_bytes() {
        let mut pool = HeapStackAllocator::new(4 * 1024);
        let region = pool.allocate(512).unwrap();
        prepare(&region, true);
        let untouched = 512 - INITIAL_FRAME_WORDS * WORD;
        assert_eq!(measure_free(&region), untouched);

        // Simula a thread usando 4 palavras abaixo do frame inicial
        let used_words = 4;
        let first_used = untouched / WORD - used_words;
        unsafe {
            for i in first_used..untouched / WORD {
                region.word(i).write(0x1234);
            }
        }
        assert_eq!(measure_free(&region), untouched - used_words * WORD);
    }
}
