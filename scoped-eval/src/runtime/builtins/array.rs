use super::arg;
use super::callback;
use super::native_fn;
use super::relative_index;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::Realm;
use crate::runtime::value::Obj;
use crate::runtime::value::ObjectKind;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use std::cmp::Ordering;

// Elements of `this` as an array, or a TypeError naming the method.
fn this_elements(rt: &Runtime, this: &Value, method: &str) -> Result<(Obj, Vec<Value>)> {
  if let Value::Object(o) = this {
    if let Some(elements) = o.array_elements() {
      return Ok((o.clone(), elements));
    };
  };
  Err(rt.type_error(format!("Array.prototype.{method} called on a non-array")))
}

fn with_elements<T>(obj: &Obj, f: impl FnOnce(&mut Vec<Value>) -> T) -> Option<T> {
  let mut data = obj.borrow_mut();
  if data.frozen {
    return None;
  };
  match &mut data.kind {
    ObjectKind::Array(elements) => Some(f(elements)),
    _ => None,
  }
}

fn array_constructor(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  if let [Value::Number(n)] = args {
    if *n < 0.0 || n.fract() != 0.0 || *n >= u32::MAX as f64 {
      return Err(rt.range_error("Invalid array length"));
    };
    return Ok(Value::array(vec![Value::Undefined; *n as usize]));
  };
  Ok(Value::array(args.iter().cloned()))
}

fn array_is_array(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Bool(arg(args, 0).as_object().is_some_and(Obj::is_array)))
}

fn array_of(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::array(args.iter().cloned()))
}

fn array_from(rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let source = arg(args, 0);
  let items = match &source {
    Value::Undefined | Value::Null => {
      return Err(rt.type_error(format!("{} is not iterable", conv::to_string(&source))))
    }
    Value::Object(o) if !o.is_array() => {
      // Array-likes: anything with a length.
      let len = conv::to_integer_or_infinity(&rt.get(&source, "length")?).max(0.0) as usize;
      let mut items = Vec::with_capacity(len);
      for i in 0..len {
        items.push(rt.get(&source, &i.to_string())?);
      }
      items
    }
    _ => rt.iterate(&source)?,
  };
  let mapper = arg(args, 1);
  if mapper.is_undefined() {
    return Ok(Value::array(items));
  };
  let mapper = callback(rt, &mapper)?;
  let mut out = Vec::with_capacity(items.len());
  for (i, item) in items.into_iter().enumerate() {
    out.push(rt.call(&mapper, Value::Undefined, &[item, Value::from(i as f64)])?);
  }
  Ok(Value::array(out))
}

fn array_push(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (obj, _) = this_elements(rt, &this, "push")?;
  let len = with_elements(&obj, |e| {
    e.extend(args.iter().cloned());
    e.len()
  });
  match len {
    Some(len) => Ok(Value::Number(len as f64)),
    None => Err(rt.type_error("Cannot add property, object is not extensible")),
  }
}

fn array_pop(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let (obj, _) = this_elements(rt, &this, "pop")?;
  Ok(with_elements(&obj, |e| e.pop()).flatten().unwrap_or_default())
}

fn array_shift(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let (obj, _) = this_elements(rt, &this, "shift")?;
  let shifted = with_elements(&obj, |e| (!e.is_empty()).then(|| e.remove(0)));
  Ok(shifted.flatten().unwrap_or_default())
}

fn array_unshift(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (obj, elements) = this_elements(rt, &this, "unshift")?;
  let len = with_elements(&obj, |e| {
    e.splice(0..0, args.iter().cloned());
    e.len()
  });
  Ok(Value::Number(len.unwrap_or(elements.len()) as f64))
}

fn array_slice(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "slice")?;
  let len = elements.len();
  let start = relative_index(&arg(args, 0), len, 0);
  let end = relative_index(&arg(args, 1), len, len);
  Ok(Value::array(
    elements.into_iter().take(end).skip(start),
  ))
}

fn array_splice(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (obj, elements) = this_elements(rt, &this, "splice")?;
  let len = elements.len();
  let start = relative_index(&arg(args, 0), len, 0);
  let delete_count = match args.len() {
    0 => 0,
    1 => len - start,
    _ => (conv::to_integer_or_infinity(&args[1]).max(0.0) as usize).min(len - start),
  };
  let inserted = args.iter().skip(2).cloned();
  let removed = with_elements(&obj, |e| {
    e.splice(start..start + delete_count, inserted).collect::<Vec<_>>()
  });
  Ok(Value::array(removed.unwrap_or_default()))
}

fn array_concat(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, mut elements) = this_elements(rt, &this, "concat")?;
  for value in args {
    match value.as_object().and_then(Obj::array_elements) {
      Some(items) => elements.extend(items),
      None => elements.push(value.clone()),
    };
  }
  Ok(Value::array(elements))
}

fn array_join(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "join")?;
  let separator = match arg(args, 0) {
    Value::Undefined => ",".into(),
    sep => conv::to_string(&sep),
  };
  let parts: Vec<String> = elements
    .iter()
    .map(|e| match e {
      Value::Undefined | Value::Null => String::new(),
      e => conv::to_string(e).to_string(),
    })
    .collect();
  Ok(Value::from(parts.join(&*separator)))
}

fn array_to_string(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  array_join(rt, this, &[])
}

fn array_index_of(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "indexOf")?;
  let target = arg(args, 0);
  let start = relative_index(&arg(args, 1), elements.len(), 0);
  let found = elements
    .iter()
    .enumerate()
    .skip(start)
    .find(|(_, e)| conv::strict_equals(e, &target));
  Ok(Value::Number(found.map_or(-1.0, |(i, _)| i as f64)))
}

fn array_last_index_of(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "lastIndexOf")?;
  let target = arg(args, 0);
  let found = elements
    .iter()
    .enumerate()
    .rev()
    .find(|(_, e)| conv::strict_equals(e, &target));
  Ok(Value::Number(found.map_or(-1.0, |(i, _)| i as f64)))
}

fn array_includes(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "includes")?;
  let target = arg(args, 0);
  let start = relative_index(&arg(args, 1), elements.len(), 0);
  Ok(Value::Bool(
    elements
      .iter()
      .skip(start)
      .any(|e| conv::same_value_zero(e, &target)),
  ))
}

// Calls `f(element, index, array)` for each element present when iteration started.
fn each(
  rt: &mut Runtime,
  this: &Value,
  method: &str,
  args: &[Value],
  mut visit: impl FnMut(usize, Value, Value) -> Option<bool>,
) -> Result<()> {
  let (_, elements) = this_elements(rt, this, method)?;
  let f = callback(rt, &arg(args, 0))?;
  let this_arg = arg(args, 1);
  for (i, element) in elements.into_iter().enumerate() {
    let result = rt.call(&f, this_arg.clone(), &[
      element.clone(),
      Value::Number(i as f64),
      this.clone(),
    ])?;
    if visit(i, element, result) == Some(false) {
      break;
    };
  }
  Ok(())
}

fn array_map(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut out = Vec::new();
  each(rt, &this, "map", args, |_, _, result| {
    out.push(result);
    None
  })?;
  Ok(Value::array(out))
}

fn array_filter(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut out = Vec::new();
  each(rt, &this, "filter", args, |_, element, result| {
    if conv::to_boolean(&result) {
      out.push(element);
    };
    None
  })?;
  Ok(Value::array(out))
}

fn array_for_each(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  each(rt, &this, "forEach", args, |_, _, _| None)?;
  Ok(Value::Undefined)
}

fn array_find(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut found = Value::Undefined;
  each(rt, &this, "find", args, |_, element, result| {
    let hit = conv::to_boolean(&result);
    if hit {
      found = element;
    };
    Some(!hit)
  })?;
  Ok(found)
}

fn array_find_index(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut found = -1.0;
  each(rt, &this, "findIndex", args, |i, _, result| {
    let hit = conv::to_boolean(&result);
    if hit {
      found = i as f64;
    };
    Some(!hit)
  })?;
  Ok(Value::Number(found))
}

fn array_some(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut any = false;
  each(rt, &this, "some", args, |_, _, result| {
    any = conv::to_boolean(&result);
    Some(!any)
  })?;
  Ok(Value::Bool(any))
}

fn array_every(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let mut all = true;
  each(rt, &this, "every", args, |_, _, result| {
    all = conv::to_boolean(&result);
    Some(all)
  })?;
  Ok(Value::Bool(all))
}

fn array_reduce(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "reduce")?;
  let f = callback(rt, &arg(args, 0))?;
  let mut items = elements.into_iter().enumerate();
  let mut acc = match args.get(1) {
    Some(initial) => initial.clone(),
    None => match items.next() {
      Some((_, first)) => first,
      None => return Err(rt.type_error("Reduce of empty array with no initial value")),
    },
  };
  for (i, element) in items {
    acc = rt.call(&f, Value::Undefined, &[
      acc,
      element,
      Value::Number(i as f64),
      this.clone(),
    ])?;
  }
  Ok(acc)
}

fn array_reverse(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let (obj, _) = this_elements(rt, &this, "reverse")?;
  with_elements(&obj, |e| e.reverse());
  Ok(this)
}

fn array_fill(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (obj, elements) = this_elements(rt, &this, "fill")?;
  let len = elements.len();
  let value = arg(args, 0);
  let start = relative_index(&arg(args, 1), len, 0);
  let end = relative_index(&arg(args, 2), len, len);
  with_elements(&obj, |e| {
    for slot in e.iter_mut().take(end).skip(start) {
      *slot = value.clone();
    }
  });
  Ok(this)
}

fn flatten_into(out: &mut Vec<Value>, elements: Vec<Value>, depth: f64) {
  for element in elements {
    match element.as_object().and_then(Obj::array_elements) {
      Some(inner) if depth >= 1.0 => flatten_into(out, inner, depth - 1.0),
      _ => out.push(element),
    };
  }
}

fn array_flat(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "flat")?;
  let depth = match arg(args, 0) {
    Value::Undefined => 1.0,
    d => conv::to_integer_or_infinity(&d),
  };
  let mut out = Vec::new();
  flatten_into(&mut out, elements, depth);
  Ok(Value::array(out))
}

// Stable merge sort. The comparator is user code, so it may be inconsistent and may throw;
// neither can be allowed to break the sort itself.
fn merge_sort(
  items: Vec<Value>,
  cmp: &mut impl FnMut(&Value, &Value) -> Result<Ordering>,
) -> Result<Vec<Value>> {
  if items.len() <= 1 {
    return Ok(items);
  };
  let mut left = items;
  let right = left.split_off(left.len() / 2);
  let left = merge_sort(left, cmp)?;
  let right = merge_sort(right, cmp)?;
  let mut out = Vec::with_capacity(left.len() + right.len());
  let mut right = right.into_iter().peekable();
  for l in left {
    while let Some(r) = right.peek() {
      if cmp(r, &l)? == Ordering::Less {
        out.extend(right.next());
      } else {
        break;
      };
    }
    out.push(l);
  }
  out.extend(right);
  Ok(out)
}

fn array_sort(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (obj, elements) = this_elements(rt, &this, "sort")?;
  let comparator = arg(args, 0);
  let comparator = if comparator.is_undefined() {
    None
  } else {
    Some(callback(rt, &comparator)?)
  };
  // Undefined always sorts last and is never passed to the comparator.
  let (defined, undefined): (Vec<Value>, Vec<Value>) =
    elements.into_iter().partition(|e| !e.is_undefined());
  let mut cmp = |a: &Value, b: &Value| -> Result<Ordering> {
    match &comparator {
      Some(f) => {
        let n = conv::to_number(&rt.call(f, Value::Undefined, &[a.clone(), b.clone()])?);
        Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
      }
      None => {
        let (a, b) = (conv::to_string(a), conv::to_string(b));
        Ok(a.encode_utf16().cmp(b.encode_utf16()))
      }
    }
  };
  let mut sorted = merge_sort(defined, &mut cmp)?;
  sorted.extend(undefined);
  with_elements(&obj, |e| *e = sorted);
  Ok(this)
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.array_prototype.clone();
  let ctor = define_constructor(
    realm,
    "Array",
    &proto,
    array_constructor,
    Some(native_fn(array_constructor)),
  );
  define_method(&ctor, "isArray", array_is_array);
  define_method(&ctor, "of", array_of);
  define_method(&ctor, "from", array_from);
  let methods: [(&str, fn(&mut Runtime, Value, &[Value]) -> Result<Value>); 27] = [
    ("push", array_push),
    ("pop", array_pop),
    ("shift", array_shift),
    ("unshift", array_unshift),
    ("slice", array_slice),
    ("splice", array_splice),
    ("concat", array_concat),
    ("join", array_join),
    ("toString", array_to_string),
    ("indexOf", array_index_of),
    ("lastIndexOf", array_last_index_of),
    ("includes", array_includes),
    ("map", array_map),
    ("filter", array_filter),
    ("forEach", array_for_each),
    ("reduce", array_reduce),
    ("find", array_find),
    ("findIndex", array_find_index),
    ("some", array_some),
    ("every", array_every),
    ("reverse", array_reverse),
    ("sort", array_sort),
    ("fill", array_fill),
    ("flat", array_flat),
    ("at", array_at),
    ("keys", array_keys),
    ("entries", array_entries),
  ];
  for (name, f) in methods {
    define_method(&proto, name, f);
  }
}

fn array_at(rt: &mut Runtime, this: Value, args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "at")?;
  let n = conv::to_integer_or_infinity(&arg(args, 0));
  let i = if n < 0.0 { elements.len() as f64 + n } else { n };
  Ok(if i >= 0.0 {
    elements.get(i as usize).cloned().unwrap_or_default()
  } else {
    Value::Undefined
  })
}

fn array_keys(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "keys")?;
  Ok(Value::array((0..elements.len()).map(|i| Value::Number(i as f64))))
}

fn array_entries(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let (_, elements) = this_elements(rt, &this, "entries")?;
  Ok(Value::array(
    elements
      .into_iter()
      .enumerate()
      .map(|(i, e)| Value::array([Value::Number(i as f64), e])),
  ))
}

#[cfg(test)]
mod tests {
  use crate::runtime::value::Value;
  use crate::runtime::vm::Runtime;
  use serde_json::json;

  fn method(rt: &mut Runtime, this: &Value, name: &str, args: &[Value]) -> Value {
    let f = rt.get(this, name).unwrap();
    rt.call(&f, this.clone(), args).unwrap()
  }

  #[test]
  fn test_mutators() {
    let mut rt = Runtime::new(None);
    let arr = Value::from(json!([1, 2, 3]));
    assert_eq!(method(&mut rt, &arr, "push", &[Value::from(4)]), Value::from(4));
    assert_eq!(method(&mut rt, &arr, "shift", &[]), Value::from(1));
    let removed = method(&mut rt, &arr, "splice", &[Value::from(1), Value::from(1), Value::from("x")]);
    assert_eq!(removed.to_json(), json!([3]));
    assert_eq!(arr.to_json(), json!([2, "x", 4]));
    method(&mut rt, &arr, "reverse", &[]);
    assert_eq!(arr.to_json(), json!([4, "x", 2]));
    assert_eq!(method(&mut rt, &arr, "join", &[Value::from("-")]), Value::from("4-x-2"));
  }

  #[test]
  fn test_sort() {
    let mut rt = Runtime::new(None);
    let arr = Value::from(json!([10, 9, 1, null, 100]));
    method(&mut rt, &arr, "sort", &[]);
    assert_eq!(arr.to_json(), json!([1, 10, 100, 9, null]));
    let by_number = Value::native("cmp", |_, _, args| {
      Ok(Value::Number(
        crate::runtime::conv::to_number(&args[0]) - crate::runtime::conv::to_number(&args[1]),
      ))
    });
    let arr = Value::from(json!([3, 1, 2]));
    method(&mut rt, &arr, "sort", &[by_number]);
    assert_eq!(arr.to_json(), json!([1, 2, 3]));
  }

  #[test]
  fn test_accessors() {
    let mut rt = Runtime::new(None);
    let arr = Value::from(json!([1, [2, [3]], 4]));
    assert_eq!(method(&mut rt, &arr, "slice", &[Value::from(-2)]).to_json(), json!([[2, [3]], 4]));
    assert_eq!(method(&mut rt, &arr, "flat", &[]).to_json(), json!([1, 2, [3], 4]));
    assert_eq!(method(&mut rt, &arr, "indexOf", &[Value::from(4)]), Value::from(2));
    assert_eq!(method(&mut rt, &arr, "includes", &[Value::from(5)]), Value::Bool(false));
    assert_eq!(method(&mut rt, &arr, "at", &[Value::from(-1)]), Value::from(4));
    let nan = Value::from(json!([1]));
    method(&mut rt, &nan, "push", &[Value::Number(f64::NAN)]);
    assert_eq!(method(&mut rt, &nan, "includes", &[Value::Number(f64::NAN)]), Value::Bool(true));
    assert_eq!(method(&mut rt, &nan, "indexOf", &[Value::Number(f64::NAN)]), Value::from(-1));
  }
}
