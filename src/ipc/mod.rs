//! # Inter-Process Communication (IPC)
//!
//! Mensagens síncronas entre threads. A mensagem é copiada por valor para o
//! `wait_data` do TCB de destino; não há buffers no kernel.
//!
//! ## Filosofia
//!
//! - **Rendezvous**: envio bloqueia até o destino receber e responder
//! - **Sem alocação**: a fila de remetentes usa o `msg_link` dos TCBs

/// Mensagem
pub mod message;

/// send / receive / reply
pub mod msg;

pub use message::Message;
pub use msg::SendOutcome;
