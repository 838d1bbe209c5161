//! Thread-backed promises for concurrent calls against an Outpost panel.
//!
//! Extension code talks to the panel through blocking stub calls. Wrapping
//! a call in a [`Promise`] starts it on its own thread immediately; the
//! caller is free to issue further calls, block on any promise with
//! [`Promise::get`], chain follow-up work with [`Promise::then`] /
//! [`Promise::catch`], or gather a whole group with [`all`].
//!
//! ```rust
//! use outpost_promise::{all, Promise};
//!
//! let cpu: Promise<u32> = Promise::new(|| Ok(12));
//! let mem: Promise<u32> = Promise::new(|| Ok(48));
//!
//! let both = all(vec![cpu, mem]);
//! assert_eq!(both.get(), Ok(vec![12, 48]));
//! ```

pub mod combine;
pub mod error;
pub mod promise;

pub use combine::all;
pub use error::{CallError, Outcome};
pub use promise::Promise;
