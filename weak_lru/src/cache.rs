//! Cost-bounded LRU cache with pressure eviction
//! 带压力淘汰的成本受限 LRU 缓存
//!
//! # Complexity
//! 复杂度
//!
//! - get / set / rm: O(1) under one mutex
//! - cost eviction: O(k) for k evicted entries

use std::{borrow::Borrow, collections::HashMap, fmt, hash::Hash, sync::Arc};

use log::{trace, warn};
use parking_lot::Mutex;

use crate::{
  Conf, Coster, Handle, List, Result,
  monitor::{self, Monitor, Sample, evict_count},
};

/// List payload, key kept for reverse lookup on eviction
/// 链表载荷，保存键以便淘汰时反查索引
struct Entry<K, V> {
  key: K,
  val: V,
  cost: usize,
}

/// State guarded by the cache lock
/// 由缓存锁保护的状态
pub(crate) struct Inner<K, V> {
  index: HashMap<K, Handle>,
  list: List<Entry<K, V>>,
  cost: usize,
  max_cost: usize,
  coster: Coster<V>,
  monitor: Option<Monitor>,
}

impl<K: Hash + Eq, V> Inner<K, V> {
  fn new(conf: Conf<V>) -> Self {
    Self {
      index: HashMap::new(),
      list: List::new(),
      cost: 0,
      max_cost: conf.max_cost,
      coster: conf.coster,
      monitor: conf.monitor.map(Monitor::new),
    }
  }

  fn get<Q>(&mut self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let h = *self.index.get(key)?;
    self.list.promote(h);
    self.list.get(h).map(|e| &e.val)
  }

  fn peek<Q>(&self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let h = *self.index.get(key)?;
    self.list.get(h).map(|e| &e.val)
  }

  /// Insert at MRU end, replacing any entry for the key
  /// 插入 MRU 端，替换该键已有条目
  fn set(&mut self, key: K, val: V) -> Option<V>
  where
    K: Clone,
  {
    let old = self.rm(&key);
    // Total saturates at usize::MAX, the entry keeps what was actually added
    // 总成本在 usize::MAX 处饱和，条目只记录实际累加的部分
    let cost = (self.coster)(&val).min(usize::MAX - self.cost);
    let h = self.list.append(Entry {
      key: key.clone(),
      val,
      cost,
    });
    self.index.insert(key, h);
    self.cost += cost;
    old
  }

  fn rm<Q>(&mut self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    let h = self.index.remove(key)?;
    let e = self.list.pop(h)?;
    self.cost -= e.cost;
    Some(e.val)
  }

  fn evict_tail(&mut self) -> bool {
    let Some(e) = self.list.pop_tail() else {
      return false;
    };
    self.index.remove(&e.key);
    self.cost -= e.cost;
    true
  }

  /// Evict up to `n` coldest entries, returns how many went
  /// 淘汰至多 `n` 个最冷条目，返回实际数量
  fn evict_n(&mut self, n: usize) -> usize {
    let mut evicted = 0;
    while evicted < n && self.evict_tail() {
      evicted += 1;
    }
    evicted
  }

  /// Evict until cost fits the budget or nothing is left
  /// 淘汰直到成本不超预算或缓存为空
  fn evict_over(&mut self) {
    if self.max_cost == 0 {
      return;
    }
    while self.cost > self.max_cost {
      if !self.evict_tail() {
        // Single oversized value already gone, stop
        // 超大单值也已淘汰，停止
        break;
      }
      trace!("cost eviction, cost {} / {}", self.cost, self.max_cost);
    }
  }

  fn shrink(&mut self, pressure: f64) -> usize {
    self.evict_n(evict_count(pressure, self.list.len()))
  }

  /// One monitor firing, returns whether to stay armed
  /// 一次监控触发，返回是否保持 Armed
  pub(crate) fn fire(&mut self) -> bool {
    let Some(m) = self.monitor.as_mut() else {
      return false;
    };
    let (stat, cycle) = m.read();
    let pressure = stat.pressure();
    let evicted = self.shrink(pressure);
    let len = self.list.len();
    self.monitor.as_mut().is_some_and(|m| {
      m.record(Sample {
        stat,
        pressure,
        cycle,
        evicted,
        len,
      })
    })
  }
}

/// Concurrent LRU cache that evicts by cost budget and memory pressure
/// 按成本预算与内存压力淘汰的并发 LRU 缓存
///
/// Cloning is cheap and shares the same cache.
/// 克隆开销很小，共享同一缓存。
///
/// # Examples
/// ```
/// use weak_lru::{Conf, WeakLru};
///
/// let cache: WeakLru<&str, Vec<u8>> =
///   WeakLru::with_conf(Conf::default().max_cost(8).coster(|v: &Vec<u8>| v.len()))
///     .unwrap();
/// cache.set("a", vec![0; 4]);
/// cache.set("b", vec![0; 4]);
/// cache.get("a");
/// cache.set("c", vec![0; 4]);
///
/// assert!(cache.get("b").is_none());
/// assert_eq!(cache.cost(), 8);
/// ```
pub struct WeakLru<K, V> {
  inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K, V> Clone for WeakLru<K, V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<K, V> WeakLru<K, V>
where
  K: Hash + Eq + Clone + Send + 'static,
  V: Send + 'static,
{
  /// Unbounded cost, default pressure monitor
  /// 成本不限，使用默认压力监控
  pub fn new() -> Self {
    Self::build(Conf::default())
  }

  pub fn with_max_cost(max_cost: usize) -> Self {
    Self::build(Conf::default().max_cost(max_cost))
  }

  pub fn with_conf(conf: Conf<V>) -> Result<Self> {
    conf.check()?;
    Ok(Self::build(conf))
  }

  fn build(conf: Conf<V>) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner::new(conf))),
    }
  }

  /// Get a clone of the value and mark it most recently used
  /// 获取值的克隆并标记为最近使用
  pub fn get<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
  {
    self.inner.lock().get(key).cloned()
  }

  /// Get without touching recency
  /// 获取值但不更新访问顺序
  pub fn peek<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    V: Clone,
  {
    self.inner.lock().peek(key).cloned()
  }

  pub fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.inner.lock().index.contains_key(key)
  }

  /// Insert or overwrite as most recently used, then enforce the cost budget.
  /// Arms the pressure monitor when this is the first entry.
  /// 插入或覆盖为最近使用，然后执行成本预算。首个条目时启动压力监控。
  pub fn set(&self, key: K, val: V) {
    let old = {
      let mut inner = self.inner.lock();
      let old = inner.set(key, val);
      if inner.list.len() == 1 {
        self.arm(&mut inner);
      }
      inner.evict_over();
      old
    };
    // Replaced value dropped outside the lock
    // 被替换的值在锁外释放
    drop(old);
  }

  /// Remove entry, no-op when absent
  /// 删除条目，不存在时不做任何事
  pub fn rm<Q>(&self, key: &Q) -> Option<V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.inner.lock().rm(key)
  }

  pub fn len(&self) -> usize {
    self.inner.lock().index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Sum of costs of present values / 当前值的成本之和
  pub fn cost(&self) -> usize {
    self.inner.lock().cost
  }

  pub fn max_cost(&self) -> usize {
    self.inner.lock().max_cost
  }

  /// Return cached value or compute and cache it.
  /// 返回缓存值，未命中则计算并缓存。
  ///
  /// Not atomic: `init` runs without the lock, so concurrent misses on one
  /// key may each run `init` and the last `set` wins. On `Err` nothing is
  /// cached and the error is returned as is.
  /// 非原子：`init` 在锁外执行，同一键并发未命中时可能各自计算，最后一次 `set` 生效。
  /// 出错时不缓存，原样返回错误。
  pub fn try_get_with<E>(
    &self,
    key: K,
    init: impl FnOnce() -> std::result::Result<V, E>,
  ) -> std::result::Result<V, E>
  where
    V: Clone,
  {
    if let Some(v) = self.get(&key) {
      return Ok(v);
    }
    let v = init()?;
    self.set(key, v.clone());
    Ok(v)
  }

  /// Infallible `try_get_with`, same race
  /// 不会失败的 `try_get_with`，竞争行为相同
  pub fn get_with(&self, key: K, init: impl FnOnce() -> V) -> V
  where
    V: Clone,
  {
    if let Some(v) = self.get(&key) {
      return v;
    }
    let v = init();
    self.set(key, v.clone());
    v
  }

  /// Evict `floor(pressure * len)` coldest entries now, returns the count
  /// 立即淘汰 `floor(pressure * len)` 个最冷条目，返回数量
  pub fn shrink(&self, pressure: f64) -> usize {
    self.inner.lock().shrink(pressure)
  }

  /// Whether the pressure monitor thread is scheduled
  /// 压力监控线程是否在运行
  pub fn is_armed(&self) -> bool {
    self.inner.lock().monitor.as_ref().is_some_and(Monitor::armed)
  }

  pub fn last_sample(&self) -> Option<Sample> {
    self.inner.lock().monitor.as_ref().and_then(Monitor::last)
  }

  fn arm(&self, inner: &mut Inner<K, V>) {
    let Some(m) = inner.monitor.as_mut() else {
      return;
    };
    if !m.arm() {
      return;
    }
    if let Err(e) = monitor::spawn(Arc::downgrade(&self.inner), m.interval) {
      warn!("spawn monitor: {e}");
      m.disarm();
    }
  }
}

impl<K, V> Default for WeakLru<K, V>
where
  K: Hash + Eq + Clone + Send + 'static,
  V: Send + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<K, V> fmt::Debug for WeakLru<K, V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let inner = self.inner.lock();
    f.debug_struct("WeakLru")
      .field("len", &inner.list.len())
      .field("cost", &inner.cost)
      .field("max_cost", &inner.max_cost)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  type Cache = Inner<String, usize>;

  fn cache(max_cost: usize) -> Cache {
    Inner::new(Conf::default().max_cost(max_cost).monitor(None))
  }

  // Index and list describe the same set, cost matches
  // 索引与链表一致，成本匹配
  fn check(c: &Cache) {
    assert_eq!(c.index.len(), c.list.len());
    let mut cost = 0;
    for (h, e) in c.list.iter() {
      assert_eq!(c.index.get(&e.key), Some(&h));
      cost += e.cost;
    }
    assert_eq!(cost, c.cost);
  }

  fn lru_keys(c: &Cache) -> Vec<String> {
    let mut keys: Vec<_> = c.list.iter().map(|(_, e)| e.key.clone()).collect();
    keys.reverse();
    keys
  }

  #[test]
  fn tail_is_least_recent() {
    let mut c = cache(0);
    for k in ["a", "b", "c", "d"] {
      c.set(k.into(), 1);
    }
    c.get("b");
    c.set("a".into(), 2);
    c.get("c");
    check(&c);
    assert_eq!(lru_keys(&c), ["d", "b", "a", "c"]);

    assert!(c.evict_tail());
    assert!(c.peek("d").is_none());
    check(&c);
  }

  #[test]
  fn random_ops_keep_invariants() {
    let mut c = Inner::<String, usize>::new(
      Conf::default()
        .max_cost(50)
        .coster(|v: &usize| v % 7)
        .monitor(None),
    );
    let mut x: u64 = 0x9e37_79b9_7f4a_7c15;
    for _ in 0..2000 {
      x ^= x << 13;
      x ^= x >> 7;
      x ^= x << 17;
      let key = (x % 40).to_string();
      match x % 5 {
        0 => {
          c.rm(key.as_str());
        }
        1 => {
          c.get(key.as_str());
        }
        2 => {
          c.shrink(0.1);
        }
        _ => {
          c.set(key, (x % 23) as usize);
          c.evict_over();
        }
      }
      check(&c);
      assert!(c.cost <= 50);
    }
  }

  #[test]
  fn oversized_value_empties_cache() {
    let mut c = Inner::<String, usize>::new(
      Conf::default()
        .max_cost(10)
        .coster(|v: &usize| *v)
        .monitor(None),
    );
    c.set("a".into(), 3);
    c.set("b".into(), 20);
    c.evict_over();
    assert_eq!(c.list.len(), 0);
    assert_eq!(c.cost, 0);
    check(&c);
  }

  #[test]
  fn huge_costs_saturate() {
    const HALF: usize = usize::MAX / 2 + 1;
    let mut c = Inner::<String, usize>::new(
      Conf::default().coster(|v: &usize| *v).monitor(None),
    );
    c.set("a".into(), HALF);
    c.set("b".into(), HALF);
    assert_eq!(c.cost, usize::MAX);
    check(&c);

    c.rm("a");
    assert_eq!(c.cost, usize::MAX - HALF);
    check(&c);
    c.rm("b");
    assert_eq!(c.cost, 0);
  }

  #[test]
  fn fire_without_monitor_disarms() {
    let mut c = cache(0);
    c.set("a".into(), 1);
    assert!(!c.fire());
  }
}
