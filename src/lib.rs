#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(docsrs, doc(cfg_hide(docsrs, loom)))]
#![warn(missing_docs, missing_debug_implementations)]

pub(crate) mod loom;

#[macro_use]
mod util;

mod deadline;
mod monitor;

pub mod error;
pub mod exclusive;
pub mod gate;
pub mod interrupt;
pub mod lock;
pub mod passthrough;
pub mod staged;

#[doc(inline)]
pub use self::error::{ConfigError, Interrupted, UnknownStage};
#[doc(inline)]
pub use self::exclusive::ExclusiveLock;
#[doc(inline)]
pub use self::gate::{GateBinding, Stage, StageGate};
#[doc(inline)]
pub use self::interrupt::Interrupt;
#[doc(inline)]
pub use self::lock::{LockStrategy, RawStageLock, StageGuard, StageLock};
#[doc(inline)]
pub use self::passthrough::PassthroughLock;
#[doc(inline)]
pub use self::staged::{Builder, StagedLock};
