//! Memory pressure monitor
//! 内存压力监控
//!
//! A timer thread fires once per interval while the cache holds entries:
//! 缓存非空时，定时线程每个间隔触发一次：
//!
//! ```text
//! Unregistered ──first set──► Armed ──interval──► Firing ─┬─ non-empty ─► Armed
//!                                                          └─ empty ─────► Unregistered
//! ```
//!
//! Each firing evicts `floor(pressure * len)` entries from the LRU end.
//! 每次触发从 LRU 端淘汰 `floor(pressure * len)` 个条目。

use std::{hash::Hash, io, sync::Weak, thread, time::Duration};

use log::debug;
use parking_lot::Mutex;

use crate::{MemSource, MemStat, MonitorConf, cache::Inner};

/// Observation recorded by the last firing
/// 最近一次触发记录的观测值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
  /// Reading, zeroed when the source had none / 读数，来源无数据时为零
  pub stat: MemStat,
  /// used / total
  pub pressure: f64,
  /// Firing counter, starts at 1 / 触发计数，从 1 开始
  pub cycle: u64,
  /// Entries evicted by this firing / 本次淘汰条目数
  pub evicted: usize,
  /// Entries left afterwards / 淘汰后剩余条目数
  pub len: usize,
}

/// Entries to evict for a pressure ratio, never more than `len`
/// 给定压力下应淘汰的条目数，不超过 `len`
#[inline]
pub fn evict_count(pressure: f64, len: usize) -> usize {
  if pressure.is_nan() {
    return 0;
  }
  let n = (pressure.clamp(0.0, 1.0) * len as f64).floor() as usize;
  n.min(len)
}

/// Monitor state, guarded by the cache lock
/// 监控状态，由缓存锁保护
pub(crate) struct Monitor {
  pub(crate) interval: Duration,
  source: Box<dyn MemSource>,
  armed: bool,
  cycle: u64,
  last: Option<Sample>,
}

impl Monitor {
  pub(crate) fn new(conf: MonitorConf) -> Self {
    Self {
      interval: conf.interval,
      source: conf.source,
      armed: false,
      cycle: 0,
      last: None,
    }
  }

  #[inline(always)]
  pub(crate) fn armed(&self) -> bool {
    self.armed
  }

  #[inline(always)]
  pub(crate) fn last(&self) -> Option<Sample> {
    self.last
  }

  /// Returns true on the Unregistered → Armed transition
  /// 从 Unregistered 转为 Armed 时返回 true
  pub(crate) fn arm(&mut self) -> bool {
    if self.armed {
      return false;
    }
    self.armed = true;
    true
  }

  pub(crate) fn disarm(&mut self) {
    self.armed = false;
  }

  /// Take one reading and bump the cycle counter
  /// 读取一次并递增周期计数
  pub(crate) fn read(&mut self) -> (MemStat, u64) {
    self.cycle += 1;
    let stat = self.source.read().unwrap_or_else(|| {
      debug!("cycle {}: no memory reading", self.cycle);
      MemStat::default()
    });
    (stat, self.cycle)
  }

  /// Store sample, disarm when the cache drained. Returns whether still armed.
  /// 保存采样，缓存清空时解除。返回是否仍处于 Armed。
  pub(crate) fn record(&mut self, sample: Sample) -> bool {
    debug!(
      "cycle {}: pressure {:.3}, released {}, evicted {}, left {}",
      sample.cycle, sample.pressure, sample.stat.released, sample.evicted, sample.len
    );
    self.last = Some(sample);
    if sample.len == 0 {
      self.armed = false;
      debug!("monitor disarmed");
    }
    self.armed
  }
}

/// Start the timer thread for an armed cache
/// 为已 Armed 的缓存启动定时线程
pub(crate) fn spawn<K, V>(cache: Weak<Mutex<Inner<K, V>>>, interval: Duration) -> io::Result<()>
where
  K: Hash + Eq + Send + 'static,
  V: Send + 'static,
{
  thread::Builder::new()
    .name("weak_lru_monitor".into())
    .spawn(move || run(cache, interval))?;
  debug!("monitor armed, interval {interval:?}");
  Ok(())
}

fn run<K: Hash + Eq, V>(cache: Weak<Mutex<Inner<K, V>>>, interval: Duration) {
  loop {
    thread::sleep(interval);
    // Cache dropped / 缓存已释放
    let Some(cache) = cache.upgrade() else {
      return;
    };
    let mut inner = cache.lock();
    if !inner.fire() {
      return;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn count_is_floor_and_bounded() {
    assert_eq!(evict_count(0.0, 10), 0);
    assert_eq!(evict_count(0.35, 10), 3);
    assert_eq!(evict_count(0.99, 10), 9);
    assert_eq!(evict_count(1.0, 10), 10);
    assert_eq!(evict_count(7.0, 10), 10);
    assert_eq!(evict_count(-1.0, 10), 0);
    assert_eq!(evict_count(f64::NAN, 10), 0);
    assert_eq!(evict_count(0.5, 0), 0);
  }

  #[test]
  fn record_disarms_on_empty() {
    let mut m = Monitor::new(MonitorConf::new(Duration::from_millis(1), || {
      Some(MemStat::new(10, 5))
    }));
    assert!(m.arm());
    assert!(!m.arm());

    let (stat, cycle) = m.read();
    assert_eq!(cycle, 1);
    assert_eq!(stat.pressure(), 0.5);

    let sample = Sample {
      stat,
      pressure: stat.pressure(),
      cycle,
      evicted: 1,
      len: 1,
    };
    assert!(m.record(sample));
    assert!(!m.record(Sample { len: 0, ..sample }));
    assert!(!m.armed());
    assert!(m.arm());
  }
}
