//! Lista duplamente encadeada por índice.
//!
//! Substitui os nós intrusivos (`rq_entry`, `msg_queue`) embutidos no TCB:
//! cada TCB guarda um `Link` por tipo de fila e a lista guarda apenas
//! cabeça/cauda. Os "ponteiros" são `Tid`s, resolvidos numa arena
//! (`LinkArena`, normalmente a tabela de threads).
//!
//! Assim o scheduler altera a pertença a filas sem manter duas referências
//! mutáveis para o mesmo TCB.
//!
//! Todas as operações são O(1), exceto `iter`/`contains`.

use crate::sys::Tid;

/// Qual dos dois encadeamentos do TCB está sendo usado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Bucket de prioridade da run-queue
    RunQueue,
    /// Fila secundária: espera de mutex ou remetentes de uma thread
    MsgQueue,
}

/// Nó de encadeamento embutido no TCB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    prev: Option<Tid>,
    next: Option<Tid>,
    linked: bool,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            prev: None,
            next: None,
            linked: false,
        }
    }

    /// O nó está atualmente em alguma lista?
    pub const fn is_linked(&self) -> bool {
        self.linked
    }

    pub const fn next(&self) -> Option<Tid> {
        self.next
    }

    pub const fn prev(&self) -> Option<Tid> {
        self.prev
    }
}

/// Armazenamento que resolve `Tid` → `Link`.
pub trait LinkArena {
    fn link(&self, tid: Tid, kind: LinkKind) -> Option<&Link>;
    fn link_mut(&mut self, tid: Tid, kind: LinkKind) -> Option<&mut Link>;
}

/// Cabeça de lista (FIFO com inserção arbitrária).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TidList {
    head: Option<Tid>,
    tail: Option<Tid>,
    len: usize,
}

impl TidList {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub const fn head(&self) -> Option<Tid> {
        self.head
    }

    pub const fn tail(&self) -> Option<Tid> {
        self.tail
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insere `tid` antes de `at`; com `at == None` insere no fim.
    pub fn insert_before<A: LinkArena + ?Sized>(
        &mut self,
        arena: &mut A,
        kind: LinkKind,
        at: Option<Tid>,
        tid: Tid,
    ) {
        debug_assert!(
            arena.link(tid, kind).is_some_and(|l| !l.linked),
            "insert of a missing or already linked node"
        );

        let prev = match at {
            Some(at) => arena.link(at, kind).and_then(|l| l.prev),
            None => self.tail,
        };

        match arena.link_mut(tid, kind) {
            Some(link) => {
                *link = Link {
                    prev,
                    next: at,
                    linked: true,
                }
            }
            None => return,
        }

        match prev {
            Some(p) => {
                if let Some(link) = arena.link_mut(p, kind) {
                    link.next = Some(tid);
                }
            }
            None => self.head = Some(tid),
        }

        match at {
            Some(a) => {
                if let Some(link) = arena.link_mut(a, kind) {
                    link.prev = Some(tid);
                }
            }
            None => self.tail = Some(tid),
        }

        self.len += 1;
    }

    /// Adiciona no fim (FIFO).
    pub fn push_back<A: LinkArena + ?Sized>(&mut self, arena: &mut A, kind: LinkKind, tid: Tid) {
        self.insert_before(arena, kind, None, tid);
    }

    /// Remove `tid` desta lista. Retorna false se o nó não estava encadeado.
    pub fn remove<A: LinkArena + ?Sized>(&mut self, arena: &mut A, kind: LinkKind, tid: Tid) -> bool {
        let link = match arena.link(tid, kind) {
            Some(link) if link.linked => *link,
            _ => return false,
        };
        debug_assert!(self.contains(arena, kind, tid), "node belongs to another list");

        match link.prev {
            Some(p) => {
                if let Some(prev) = arena.link_mut(p, kind) {
                    prev.next = link.next;
                }
            }
            None => self.head = link.next,
        }

        match link.next {
            Some(n) => {
                if let Some(next) = arena.link_mut(n, kind) {
                    next.prev = link.prev;
                }
            }
            None => self.tail = link.prev,
        }

        if let Some(node) = arena.link_mut(tid, kind) {
            *node = Link::new();
        }
        self.len -= 1;
        true
    }

    /// Remove e retorna a cabeça.
    pub fn pop_front<A: LinkArena + ?Sized>(&mut self, arena: &mut A, kind: LinkKind) -> Option<Tid> {
        let head = self.head?;
        self.remove(arena, kind, head);
        Some(head)
    }

    /// Move a cabeça para o fim (round-robin).
    pub fn rotate<A: LinkArena + ?Sized>(&mut self, arena: &mut A, kind: LinkKind) {
        if self.len > 1 {
            if let Some(head) = self.pop_front(arena, kind) {
                self.push_back(arena, kind, head);
            }
        }
    }

    pub fn iter<'a, A: LinkArena + ?Sized>(&self, arena: &'a A, kind: LinkKind) -> Iter<'a, A> {
        Iter {
            arena,
            kind,
            next: self.head,
            remaining: self.len,
        }
    }

    pub fn contains<A: LinkArena + ?Sized>(&self, arena: &A, kind: LinkKind, tid: Tid) -> bool {
        self.iter(arena, kind).any(|t| t == tid)
    }
}

/// Iterador da cabeça para a cauda.
pub struct Iter<'a, A: ?Sized> {
    arena: &'a A,
    kind: LinkKind,
    next: Option<Tid>,
    remaining: usize,
}

impl<A: LinkArena + ?Sized> Iterator for Iter<'_, A> {
    type Item = Tid;

    fn next(&mut self) -> Option<Tid> {
        // `remaining` limita a caminhada mesmo com encadeamento corrompido
        if self.remaining == 0 {
            return None;
        }
        let current = self.next?;
        self.remaining -= 1;
        self.next = self.arena.link(current, self.kind).and_then(|l| l.next);
        Some(current)
    }
}
