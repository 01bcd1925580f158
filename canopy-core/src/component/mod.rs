//! Component Assembly
//!
//! Live instances ([`Component`]), the renderer-facing lifecycle options built
//! from a class meta ([`ComponentOptions`]) and the template boundary
//! ([`TemplateProvider`]).
//!
//! A renderer drives one instance like this:
//!
//! ```text
//! assemble ─► instantiate ─► before_create ─► data ─► created ─► before_mount ─► mounted
//!                                                        ... ─► before_destroy ─► destroyed
//! ```

mod assembler;
mod instance;
mod template;

pub use assembler::{assemble, ComponentOptions};
pub use instance::Component;
pub use template::{load_templates, RenderFn, TemplateProvider, TemplateRegistry, TemplateSet};
