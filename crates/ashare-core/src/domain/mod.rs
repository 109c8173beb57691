//! 시세 동기화 도메인 모델.

mod concept;
mod financial;
mod source;
mod stock;
mod sync_failure;

pub use concept::*;
pub use financial::*;
pub use source::*;
pub use stock::*;
pub use sync_failure::*;
