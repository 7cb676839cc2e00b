//! HTTP request handlers.

mod agent;
mod debug;
mod health;
mod stream;
mod tabs;

pub use agent::{list_runs, pause, resume, start, stop, toggle};
pub use debug::list_components;
pub use health::{health_check, metrics_handler};
pub use stream::stream_run;
pub use tabs::{list_tabs, resolve_tab};
