//! Weak LRU cache that shrinks under memory pressure
//! 内存压力下自动收缩的弱 LRU 缓存
//!
//! Entries leave the cache three ways:
//! 条目通过三种方式离开缓存：
//!
//! - `rm` / 显式删除
//! - cost budget exceeded, coldest first / 超出成本预算，先淘汰最冷条目
//! - memory pressure, `floor(pressure * len)` coldest per monitor tick / 内存压力，每次监控淘汰 `floor(pressure * len)` 个最冷条目
//!
//! # Features
//!
//! - `sys` (default): `SysMem`, process RSS via sysinfo, used by the default monitor
//!
//! # 特性
//!
//! - `sys`（默认）：`SysMem`，通过 sysinfo 读取进程常驻内存，默认监控使用

#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod conf;
mod error;
mod list;
mod mem;
mod monitor;

pub use cache::WeakLru;
pub use conf::{Coster, Conf, DEFAULT_INTERVAL, MonitorConf};
pub use error::{Error, Result};
pub use list::{Handle, Iter, List};
#[cfg(feature = "sys")]
pub use mem::SysMem;
pub use mem::{MemSource, MemStat};
pub use monitor::{Sample, evict_count};
