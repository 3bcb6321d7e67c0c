use aok::{OK, Void};
use log::info;
use weak_lru::List;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

fn order(l: &List<&'static str>) -> Vec<&'static str> {
  l.iter().map(|(_, v)| *v).collect()
}

#[test]
fn test_append_prepend() -> Void {
  info!("> 头尾插入");

  let mut l = List::new();
  assert!(l.head().is_none() && l.tail().is_none());

  let b = l.append("b");
  assert_eq!(l.head(), Some(b));
  assert_eq!(l.tail(), Some(b));

  let a = l.prepend("a");
  let c = l.append("c");
  assert_eq!(order(&l), ["c", "b", "a"]);
  assert_eq!(l.head(), Some(c));
  assert_eq!(l.tail(), Some(a));
  assert_eq!(l.len(), 3);
  OK
}

#[test]
fn test_pop_tail_is_lru() -> Void {
  info!("> 尾部弹出最久未使用");

  let mut l = List::new();
  let x = l.append("x");
  l.append("y");
  l.append("z");
  // Touch x / 访问 x
  l.promote(x);

  assert_eq!(l.pop_tail(), Some("y"));
  assert_eq!(l.pop_tail(), Some("z"));
  assert_eq!(l.pop_tail(), Some("x"));
  assert_eq!(l.pop_tail(), None);
  assert!(l.is_empty());
  assert!(l.head().is_none() && l.tail().is_none());
  OK
}

#[test]
fn test_pop_handle() -> Void {
  let mut l = List::new();
  let a = l.append("a");
  let b = l.append("b");
  let c = l.append("c");

  assert_eq!(l.pop(c), Some("c"));
  assert_eq!(l.head(), Some(b));
  assert_eq!(l.pop(a), Some("a"));
  assert_eq!(l.tail(), Some(b));
  assert_eq!(l.get(b), Some(&"b"));
  // Already removed / 已移除
  assert_eq!(l.pop(a), None);

  if let Some(v) = l.get_mut(b) {
    *v = "B";
  }
  assert_eq!(order(&l), ["B"]);

  l.clear();
  assert!(l.is_empty());
  assert_eq!(l.pop_tail(), None);
  OK
}
