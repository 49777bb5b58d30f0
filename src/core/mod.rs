pub mod cleanup;
pub mod gate;
pub mod job;
pub mod reconciler;
pub mod window;

pub use crate::domain::model::{Invoice, PendingAdjustment, Window};
pub use crate::domain::ports::{AccountStore, ConfigProvider, ErrorSink};
pub use crate::utils::error::Result;
