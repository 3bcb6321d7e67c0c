//! Ordered list for LRU tracking
//! 用于 LRU 跟踪的有序链表
//!
//! # Complexity
//! 复杂度
//!
//! - append / prepend: O(1), may grow the arena
//! - pop / pop_tail / promote: O(1), never allocate
//!
//! Nodes live in a slot arena and link by `Handle` (slot index), so the index
//! can hold plain copies of handles without owning the nodes.
//! 节点存放在槽位数组中，通过 `Handle`（槽位下标）互相链接，
//! 索引只需保存句柄副本，不拥有节点。
//!
//! ```text
//! head (MRU) ─► [a] ◄──► [b] ◄──► [c] ◄── tail (LRU)
//!               next ─►       ◄─ prev
//! ```

/// Stable handle of a node, valid until the node is popped
/// 节点句柄，在节点被弹出前有效
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
  /// Slot index / 槽位下标
  #[inline(always)]
  pub fn index(self) -> usize {
    self.0
  }
}

struct Node<T> {
  val: T,
  // Towards head / 指向头部
  prev: Option<Handle>,
  // Towards tail / 指向尾部
  next: Option<Handle>,
}

/// Doubly linked list, head is most recently used
/// 双向链表，头部为最近使用
///
/// Not synchronized, the owner must serialize access.
/// 非线程安全，由持有者负责串行访问。
pub struct List<T> {
  slots: Vec<Option<Node<T>>>,
  free: Vec<usize>,
  head: Option<Handle>,
  tail: Option<Handle>,
  len: usize,
}

impl<T> Default for List<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> List<T> {
  /// Create empty list, no allocation
  /// 创建空链表，不分配内存
  #[inline]
  pub const fn new() -> Self {
    Self {
      slots: Vec::new(),
      free: Vec::new(),
      head: None,
      tail: None,
      len: 0,
    }
  }

  #[inline(always)]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline(always)]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Most recently used node / 最近使用的节点
  #[inline(always)]
  pub fn head(&self) -> Option<Handle> {
    self.head
  }

  /// Least recently used node / 最久未使用的节点
  #[inline(always)]
  pub fn tail(&self) -> Option<Handle> {
    self.tail
  }

  #[inline]
  pub fn get(&self, h: Handle) -> Option<&T> {
    self.node(h).map(|n| &n.val)
  }

  #[inline]
  pub fn get_mut(&mut self, h: Handle) -> Option<&mut T> {
    self.node_mut(h).map(|n| &mut n.val)
  }

  /// Insert at head (MRU end)
  /// 插入头部（MRU 端）
  pub fn append(&mut self, val: T) -> Handle {
    let h = self.alloc(Node {
      val,
      prev: None,
      next: self.head,
    });
    self.link_head(h);
    h
  }

  /// Insert at tail (LRU end)
  /// 插入尾部（LRU 端）
  pub fn prepend(&mut self, val: T) -> Handle {
    let h = self.alloc(Node {
      val,
      prev: self.tail,
      next: None,
    });
    match self.tail {
      Some(t) => {
        if let Some(n) = self.node_mut(t) {
          n.next = Some(h);
        }
      }
      None => self.head = Some(h),
    }
    self.tail = Some(h);
    h
  }

  /// Remove node wherever it sits and return its value.
  /// Returns None if the slot is already free.
  /// 移除任意位置的节点并返回其值，槽位已空闲时返回 None。
  ///
  /// Passing a handle whose slot was reused by a later insert removes that
  /// newer node; callers must only pass live handles from this list.
  /// 若句柄的槽位已被复用，将移除新节点；调用方只能传入本链表的有效句柄。
  pub fn pop(&mut self, h: Handle) -> Option<T> {
    self.unlink(h)?;
    let node = self.slots.get_mut(h.0)?.take()?;
    self.free.push(h.0);
    self.len -= 1;
    Some(node.val)
  }

  /// Remove and return the LRU value
  /// 移除并返回最久未使用的值
  #[inline]
  pub fn pop_tail(&mut self) -> Option<T> {
    let t = self.tail?;
    self.pop(t)
  }

  /// Move existing node to head without freeing its slot
  /// 将已有节点移到头部，不释放槽位
  pub fn promote(&mut self, h: Handle) -> bool {
    if self.node(h).is_none() {
      return false;
    }
    if self.head == Some(h) {
      return true;
    }
    self.unlink(h);
    let head = self.head;
    if let Some(n) = self.node_mut(h) {
      n.next = head;
    }
    self.link_head(h);
    true
  }

  /// Drop all nodes, keep arena capacity
  /// 清空所有节点，保留容量
  pub fn clear(&mut self) {
    self.slots.clear();
    self.free.clear();
    self.head = None;
    self.tail = None;
    self.len = 0;
  }

  /// Iterate from head (MRU) to tail (LRU)
  /// 从头部（MRU）到尾部（LRU）迭代
  pub fn iter(&self) -> Iter<'_, T> {
    Iter {
      list: self,
      cur: self.head,
    }
  }

  #[inline(always)]
  fn node(&self, h: Handle) -> Option<&Node<T>> {
    self.slots.get(h.0).and_then(Option::as_ref)
  }

  #[inline(always)]
  fn node_mut(&mut self, h: Handle) -> Option<&mut Node<T>> {
    self.slots.get_mut(h.0).and_then(Option::as_mut)
  }

  fn alloc(&mut self, node: Node<T>) -> Handle {
    self.len += 1;
    match self.free.pop() {
      Some(i) => {
        self.slots[i] = Some(node);
        Handle(i)
      }
      None => {
        self.slots.push(Some(node));
        Handle(self.slots.len() - 1)
      }
    }
  }

  // Node's `next` must already point at the old head
  // 调用前节点的 next 须已指向旧头部
  fn link_head(&mut self, h: Handle) {
    match self.head {
      Some(old) => {
        if let Some(n) = self.node_mut(old) {
          n.prev = Some(h);
        }
      }
      None => self.tail = Some(h),
    }
    self.head = Some(h);
  }

  fn unlink(&mut self, h: Handle) -> Option<()> {
    let node = self.node_mut(h)?;
    let (prev, next) = (node.prev.take(), node.next.take());

    match prev {
      Some(p) => {
        if let Some(n) = self.node_mut(p) {
          n.next = next;
        }
      }
      None => self.head = next,
    }

    match next {
      Some(nx) => {
        if let Some(n) = self.node_mut(nx) {
          n.prev = prev;
        }
      }
      None => self.tail = prev,
    }

    Some(())
  }
}

/// Head to tail iterator / 头到尾迭代器
pub struct Iter<'a, T> {
  list: &'a List<T>,
  cur: Option<Handle>,
}

impl<'a, T> Iterator for Iter<'a, T> {
  type Item = (Handle, &'a T);

  fn next(&mut self) -> Option<Self::Item> {
    let h = self.cur?;
    let node = self.list.node(h)?;
    self.cur = node.next;
    Some((h, &node.val))
  }
}
