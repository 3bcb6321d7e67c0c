//! Cache configuration / 缓存配置

use std::{fmt, sync::Arc, time::Duration};

use crate::{Error, MemSource, Result};

/// Default monitor interval (1 second)
/// 默认监控间隔（1 秒）
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Cost of one value / 单个值的成本
///
/// The running total saturates at `usize::MAX`.
/// 累计成本在 `usize::MAX` 处饱和。
pub type Coster<V> = Arc<dyn Fn(&V) -> usize + Send + Sync>;

/// Cache configuration, fixed at construction
/// 缓存配置，构造时确定
pub struct Conf<V> {
  /// Cost budget, 0 disables cost eviction / 成本上限，0 表示不按成本淘汰
  pub max_cost: usize,
  /// Cost of each value, default 1 / 每个值的成本，默认 1
  pub coster: Coster<V>,
  /// Pressure monitor, None disables it / 压力监控，None 表示关闭
  pub monitor: Option<MonitorConf>,
}

impl<V: 'static> Default for Conf<V> {
  fn default() -> Self {
    Self {
      max_cost: 0,
      coster: Arc::new(|_: &V| 1usize),
      monitor: MonitorConf::sys(),
    }
  }
}

impl<V> Conf<V> {
  #[must_use]
  pub fn max_cost(mut self, max_cost: usize) -> Self {
    self.max_cost = max_cost;
    self
  }

  #[must_use]
  pub fn coster(mut self, f: impl Fn(&V) -> usize + Send + Sync + 'static) -> Self {
    self.coster = Arc::new(f);
    self
  }

  #[must_use]
  pub fn monitor(mut self, monitor: Option<MonitorConf>) -> Self {
    self.monitor = monitor;
    self
  }

  pub(crate) fn check(&self) -> Result<()> {
    if let Some(m) = &self.monitor {
      m.check()?;
    }
    Ok(())
  }
}

impl<V> fmt::Debug for Conf<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Conf")
      .field("max_cost", &self.max_cost)
      .field("monitor", &self.monitor)
      .finish_non_exhaustive()
  }
}

/// Memory pressure monitor configuration
/// 内存压力监控配置
pub struct MonitorConf {
  /// Time between samples / 采样间隔
  pub interval: Duration,
  /// Where readings come from / 读数来源
  pub source: Box<dyn MemSource>,
}

impl MonitorConf {
  pub fn new(interval: Duration, source: impl MemSource) -> Self {
    Self {
      interval,
      source: Box::new(source),
    }
  }

  #[cfg(feature = "sys")]
  fn sys() -> Option<Self> {
    Some(Self::default())
  }

  #[cfg(not(feature = "sys"))]
  fn sys() -> Option<Self> {
    None
  }

  fn check(&self) -> Result<()> {
    if self.interval.is_zero() {
      return Err(Error::ZeroInterval);
    }
    Ok(())
  }
}

#[cfg(feature = "sys")]
impl Default for MonitorConf {
  fn default() -> Self {
    Self::new(DEFAULT_INTERVAL, crate::SysMem::default())
  }
}

impl fmt::Debug for MonitorConf {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MonitorConf")
      .field("interval", &self.interval)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::MemStat;

  #[test]
  fn zero_interval_rejected() {
    let monitor = MonitorConf::new(Duration::ZERO, || None::<MemStat>);
    let conf = Conf::<u8>::default().monitor(Some(monitor));
    assert!(matches!(conf.check(), Err(Error::ZeroInterval)));
  }

  #[test]
  fn default_coster_is_one() {
    let conf = Conf::<Vec<u8>>::default();
    assert_eq!((conf.coster)(&vec![0; 64]), 1);
    assert_eq!(conf.max_cost, 0);
    assert!(conf.check().is_ok());
  }
}
