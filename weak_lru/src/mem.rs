//! Memory statistics for pressure eviction
//! 用于压力淘汰的内存统计

/// One memory reading in bytes
/// 一次内存读数（字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemStat {
  /// Memory available to the process / 进程可用内存
  pub total: u64,
  /// Memory held by live data / 存活数据占用内存
  pub used: u64,
  /// Mapped but returned to the OS, informational / 已映射但归还给系统，仅供观测
  pub released: u64,
}

impl MemStat {
  #[inline]
  pub const fn new(total: u64, used: u64) -> Self {
    Self {
      total,
      used,
      released: 0,
    }
  }

  #[inline]
  #[must_use]
  pub const fn released(mut self, released: u64) -> Self {
    self.released = released;
    self
  }

  /// used / total in [0, 1], 0 when total is unknown
  /// used / total，范围 [0, 1]，total 未知时为 0
  #[inline]
  pub fn pressure(&self) -> f64 {
    if self.total == 0 {
      return 0.0;
    }
    (self.used as f64 / self.total as f64).clamp(0.0, 1.0)
  }
}

/// Memory statistics provider polled by the monitor
/// 监控器轮询的内存统计来源
///
/// `None` means no reading this round, treated as zero pressure.
/// 返回 `None` 表示本轮无读数，按零压力处理。
pub trait MemSource: Send + 'static {
  fn read(&mut self) -> Option<MemStat>;
}

impl<F> MemSource for F
where
  F: FnMut() -> Option<MemStat> + Send + 'static,
{
  #[inline(always)]
  fn read(&mut self) -> Option<MemStat> {
    (self)()
  }
}

#[cfg(feature = "sys")]
pub use sys::SysMem;

#[cfg(feature = "sys")]
mod sys {
  use sysinfo::{
    MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System,
  };

  use super::{MemSource, MemStat};

  /// Process resident set against a memory ceiling
  /// 进程常驻内存相对于内存上限
  pub struct SysMem {
    sys: System,
    pid: Option<Pid>,
    limit: u64,
  }

  impl SysMem {
    /// `limit` in bytes, 0 uses the system (or cgroup) total
    /// `limit` 单位字节，0 表示使用系统（或 cgroup）总内存
    pub fn new(limit: u64) -> Self {
      let sys = System::new_with_specifics(
        RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
      );
      let pid = match sysinfo::get_current_pid() {
        Ok(pid) => Some(pid),
        Err(e) => {
          log::warn!("current pid unavailable: {e}");
          None
        }
      };
      Self { sys, pid, limit }
    }

    fn total(&mut self) -> u64 {
      if self.limit != 0 {
        return self.limit;
      }
      self.sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());
      let total = self.sys.total_memory();
      match self.sys.cgroup_limits() {
        Some(cg) if cg.total_memory != 0 => total.min(cg.total_memory),
        _ => total,
      }
    }
  }

  impl Default for SysMem {
    fn default() -> Self {
      Self::new(0)
    }
  }

  impl MemSource for SysMem {
    fn read(&mut self) -> Option<MemStat> {
      let pid = self.pid?;
      self.sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
      );
      let p = self.sys.process(pid)?;
      let used = p.memory();
      // Virtual pages not resident, closest to memory handed back to the OS
      // 未驻留的虚拟页，最接近归还给系统的内存
      let released = p.virtual_memory().saturating_sub(used);
      Some(MemStat::new(self.total(), used).released(released))
    }
  }
}
