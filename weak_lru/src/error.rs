//! Error definitions / 错误定义

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("monitor interval must be non-zero / 监控间隔不能为零")]
  ZeroInterval,
}

pub type Result<T> = std::result::Result<T, Error>;
