//! # AShare Core
//!
//! A주 시세 동기화 서비스의 핵심 도메인 모델과 공통 기반을 제공합니다.
//!
//! - 종목/일봉/재무/개념 도메인 타입
//! - 내용 해시와 원격/로컬 비교(reconcile)
//! - 개념 구성 종목 코드 매칭
//! - 에러 분류, 설정 관리, 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod hash;
pub mod logging;
pub mod matching;
pub mod reconcile;

pub use self::config::*;
pub use domain::*;
pub use error::*;
pub use hash::*;
pub use logging::*;
pub use matching::*;
pub use reconcile::*;
