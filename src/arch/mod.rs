//! # Hardware Abstraction Layer (HAL)
//!
//! Ponte mínima entre o núcleo de escalonamento e o hardware.
//! O scheduler só precisa de uma coisa da CPU: ligar e desligar interrupções
//! em volta das transições de estado (seção crítica).
//!
//! - `traits/` define a interface (`InterruptControl`).
//! - `host` é a implementação usada no host e em alvos sem controle de IRQ.
//!   Portes reais (x86_64, ARM) fornecem seu próprio tipo implementando a trait.

pub mod host;
pub mod traits;

pub use host::HostCpu;
pub use traits::InterruptControl;
