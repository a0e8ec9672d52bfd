//! `Date`, always in UTC: local-time getters and the string forms use a zero offset.

use super::arg;
use super::native_fn;
use crate::error::Result;
use crate::runtime::conv;
use crate::runtime::conv::Hint;
use crate::runtime::realm::define_constructor;
use crate::runtime::realm::define_method;
use crate::runtime::realm::Realm;
use crate::runtime::value::Obj;
use crate::runtime::value::ObjectKind;
use crate::runtime::value::Value;
use crate::runtime::vm::Runtime;
use chrono::DateTime;
use chrono::Datelike;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::SecondsFormat;
use chrono::Timelike;
use chrono::Utc;

const MS_PER_DAY: f64 = 86_400_000.0;
const MAX_TIME: f64 = 8.64e15;
const DISPLAY_FORMAT: &str = "%a %b %d %Y %H:%M:%S GMT+0000 (Coordinated Universal Time)";
// Date-time forms without an offset, read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
];

fn time_clip(t: f64) -> f64 {
  if !t.is_finite() || t.abs() > MAX_TIME {
    f64::NAN
  } else {
    t.trunc() + 0.0
  }
}

fn to_datetime(t: f64) -> Option<DateTime<Utc>> {
  let t = time_clip(t);
  if t.is_nan() {
    return None;
  };
  DateTime::<Utc>::from_timestamp_millis(t as i64)
}

fn from_datetime(dt: DateTime<Utc>) -> f64 {
  time_clip(dt.timestamp_millis() as f64)
}

/// Broken-down UTC time of a valid time value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Fields {
  pub year: i64,
  /// Zero-based, as scripts see it.
  pub month: i64,
  pub day: i64,
  pub hours: i64,
  pub minutes: i64,
  pub seconds: i64,
  pub millis: i64,
  pub weekday: i64,
}

pub fn fields(t: f64) -> Option<Fields> {
  let dt = to_datetime(t)?;
  Some(Fields {
    year: dt.year().into(),
    month: dt.month0().into(),
    day: dt.day().into(),
    hours: dt.hour().into(),
    minutes: dt.minute().into(),
    seconds: dt.second().into(),
    millis: dt.timestamp_subsec_millis().into(),
    weekday: dt.weekday().num_days_from_sunday().into(),
  })
}

/// A time value from possibly out-of-range components, which carry over as in `Date.UTC`.
pub fn make_time(parts: [f64; 7]) -> f64 {
  if parts.iter().any(|p| !p.is_finite()) {
    return f64::NAN;
  };
  let [year, month, day, hours, minutes, seconds, millis] = parts.map(f64::trunc);
  let year = year + (month / 12.0).floor();
  let month = month.rem_euclid(12.0);
  if year.abs() > 400_000.0 {
    return f64::NAN;
  };
  let Some(first) = NaiveDate::from_ymd_opt(year as i32, month as u32 + 1, 1) else {
    return f64::NAN;
  };
  let epoch = DateTime::<Utc>::UNIX_EPOCH.date_naive();
  let days = first.signed_duration_since(epoch).num_days() as f64 + day - 1.0;
  let time = ((hours * 60.0 + minutes) * 60.0 + seconds) * 1000.0 + millis;
  time_clip(days * MS_PER_DAY + time)
}

/// `toISOString` output, or None for an invalid date.
pub fn iso_string(t: f64) -> Option<String> {
  let dt = to_datetime(t)?;
  let year = dt.year();
  if (0..=9999).contains(&year) {
    return Some(dt.to_rfc3339_opts(SecondsFormat::Millis, true));
  };
  // Expanded years carry a sign and six digits.
  let sign = if year < 0 { '-' } else { '+' };
  Some(format!(
    "{sign}{:06}{}",
    year.unsigned_abs(),
    dt.format("-%m-%dT%H:%M:%S%.3fZ")
  ))
}

/// `Date.prototype.toString` output.
pub fn display_string(t: f64) -> String {
  match to_datetime(t) {
    Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
    None => "Invalid Date".to_string(),
  }
}

/// Parses the ISO format `toISOString` produces, and its date-only and minute-precision
/// prefixes. Strings without an offset are read as UTC.
pub fn parse_iso(s: &str) -> Option<f64> {
  let s = s.trim();
  if let Ok(dt) = s.parse::<DateTime<Utc>>() {
    return Some(from_datetime(dt));
  };
  if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
    return Some(from_datetime(dt.with_timezone(&Utc)));
  };
  let body = s.strip_suffix('Z').unwrap_or(s);
  if let Some(dt) = NAIVE_FORMATS
    .iter()
    .find_map(|f| NaiveDateTime::parse_from_str(body, f).ok())
  {
    return Some(from_datetime(dt.and_utc()));
  };
  let date = match body.len() {
    4 => format!("{body}-01-01"),
    7 => format!("{body}-01"),
    _ => body.to_string(),
  };
  let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;
  Some(from_datetime(date.and_hms_opt(0, 0, 0)?.and_utc()))
}

fn now() -> f64 {
  Utc::now().timestamp_millis() as f64
}

fn this_time(rt: &Runtime, this: &Value) -> Result<f64> {
  match this.as_object().map(|o| match o.borrow().kind {
    ObjectKind::Date(t) => Some(t),
    _ => None,
  }) {
    Some(Some(t)) => Ok(t),
    _ => Err(rt.type_error("this is not a Date object.")),
  }
}

fn date_from_args(args: &[Value]) -> f64 {
  match args {
    [] => now(),
    [single] => match conv::to_primitive(single, Hint::Number) {
      Value::String(s) => parse_iso(&s).unwrap_or(f64::NAN),
      v => time_clip(conv::to_number(&v)),
    },
    _ => {
      let mut parts = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
      for (slot, a) in parts.iter_mut().zip(args) {
        *slot = conv::to_number(a);
      }
      if (0.0..=99.0).contains(&parts[0].trunc()) {
        parts[0] = 1900.0 + parts[0].trunc();
      };
      make_time(parts)
    }
  }
}

fn date_call(_rt: &mut Runtime, _this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(display_string(now())))
}

fn date_construct(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Object(Obj::new(
    ObjectKind::Date(date_from_args(args)),
    None,
  )))
}

fn date_utc(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  let mut parts = [f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
  for (slot, a) in parts.iter_mut().zip(args) {
    *slot = conv::to_number(a);
  }
  Ok(Value::Number(make_time(parts)))
}

fn date_parse(_rt: &mut Runtime, _this: Value, args: &[Value]) -> Result<Value> {
  Ok(Value::Number(
    parse_iso(&conv::to_string(&arg(args, 0))).unwrap_or(f64::NAN),
  ))
}

fn date_to_iso_string(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let t = this_time(rt, &this)?;
  iso_string(t)
    .map(Value::from)
    .ok_or_else(|| rt.range_error("Invalid time value"))
}

fn date_to_json(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  let t = this_time(rt, &this)?;
  Ok(iso_string(t).map_or(Value::Null, Value::from))
}

fn date_to_string(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::from(display_string(this_time(rt, &this)?)))
}

fn date_get_time(rt: &mut Runtime, this: Value, _args: &[Value]) -> Result<Value> {
  Ok(Value::Number(this_time(rt, &this)?))
}

fn field_getter(get: fn(&Fields) -> i64) -> impl Fn(&mut Runtime, Value, &[Value]) -> Result<Value> {
  move |rt, this, _| {
    let t = this_time(rt, &this)?;
    Ok(Value::Number(fields(t).map_or(f64::NAN, |f| get(&f) as f64)))
  }
}

pub fn install(realm: &mut Realm) {
  let proto = realm.intrinsics.date_prototype.clone();
  let ctor = define_constructor(realm, "Date", &proto, date_call, Some(native_fn(date_construct)));
  define_method(&ctor, "now", |_, _, _| Ok(Value::Number(now())));
  define_method(&ctor, "UTC", date_utc);
  define_method(&ctor, "parse", date_parse);
  define_method(&proto, "getTime", date_get_time);
  define_method(&proto, "valueOf", date_get_time);
  define_method(&proto, "toISOString", date_to_iso_string);
  define_method(&proto, "toJSON", date_to_json);
  define_method(&proto, "toString", date_to_string);
  define_method(&proto, "getTimezoneOffset", |rt, this, _| {
    let t = this_time(rt, &this)?;
    Ok(Value::Number(if t.is_nan() { f64::NAN } else { 0.0 }))
  });
  let getters: [(&str, fn(&Fields) -> i64); 8] = [
    ("FullYear", |f| f.year),
    ("Month", |f| f.month),
    ("Date", |f| f.day),
    ("Day", |f| f.weekday),
    ("Hours", |f| f.hours),
    ("Minutes", |f| f.minutes),
    ("Seconds", |f| f.seconds),
    ("Milliseconds", |f| f.millis),
  ];
  for (field, get) in getters {
    define_method(&proto, &format!("get{field}"), field_getter(get));
    define_method(&proto, &format!("getUTC{field}"), field_getter(get));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_make_time_carries_components() {
    assert_eq!(make_time([1970.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]), 0.0);
    assert_eq!(make_time([1969.0, 12.0, 2.0, 0.0, 0.0, 0.0, 0.0]), MS_PER_DAY);
    assert_eq!(make_time([1970.0, 0.0, 0.0, 24.0, 0.0, 0.0, -1.0]), -1.0);
    assert_eq!(
      fields(make_time([2000.0, 1.0, 29.0, 0.0, 0.0, 0.0, 0.0])).map(|f| (f.year, f.month, f.day)),
      Some((2000, 1, 29))
    );
    assert!(make_time([f64::NAN, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]).is_nan());
  }

  #[test]
  fn test_iso_string() {
    assert_eq!(iso_string(0.0).as_deref(), Some("1970-01-01T00:00:00.000Z"));
    assert_eq!(iso_string(1_700_000_000_123.0).as_deref(), Some("2023-11-14T22:13:20.123Z"));
    assert_eq!(iso_string(-1.0).as_deref(), Some("1969-12-31T23:59:59.999Z"));
    assert_eq!(iso_string(f64::NAN), None);
    assert_eq!(iso_string(-62_198_755_200_000.0).as_deref(), Some("-000001-01-01T00:00:00.000Z"));
    assert_eq!(display_string(f64::NAN), "Invalid Date");
    assert_eq!(display_string(0.0), "Thu Jan 01 1970 00:00:00 GMT+0000 (Coordinated Universal Time)");
  }

  #[test]
  fn test_parse_iso() {
    assert_eq!(parse_iso("2023-11-14T22:13:20.123Z"), Some(1_700_000_000_123.0));
    assert_eq!(parse_iso("1970-01-02"), Some(MS_PER_DAY));
    assert_eq!(parse_iso("1970-01-01T01:00+01:00"), Some(0.0));
    assert_eq!(parse_iso("1970"), Some(0.0));
    assert_eq!(parse_iso("1970-01"), Some(0.0));
    assert_eq!(parse_iso("1970-01-01 00:00:01"), Some(1000.0));
    assert_eq!(parse_iso("1970-13-01"), None);
    assert_eq!(parse_iso("yesterday"), None);
  }

  #[test]
  fn test_date_objects() {
    let mut rt = Runtime::new(None);
    let ctor = rt.realm().globals["Date"].clone();
    let date = rt.construct(&ctor, &[Value::from(86_400_000)]).unwrap();
    let get_day = rt.get(&date, "getDay").unwrap();
    assert_eq!(rt.call(&get_day, date.clone(), &[]).unwrap(), Value::from(5));
    let to_iso = rt.get(&date, "toISOString").unwrap();
    assert_eq!(rt.call(&to_iso, date.clone(), &[]).unwrap(), Value::from("1970-01-02T00:00:00.000Z"));
    let invalid = rt.construct(&ctor, &[Value::from("not a date")]).unwrap();
    let err = rt.call(&to_iso, invalid, &[]).unwrap_err();
    assert_eq!(err.to_string(), "Uncaught RangeError: Invalid time value");
    let utc = rt.construct(&ctor, &[Value::from(2020), Value::from(0), Value::from(31)]).unwrap();
    let get_month = rt.get(&utc, "getMonth").unwrap();
    assert_eq!(rt.call(&get_month, utc, &[]).unwrap(), Value::from(0));
  }
}
