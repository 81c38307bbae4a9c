//! Deterministic example value generation.
//!
//! Examples are pseudo-random but reproducible: the generator is seeded
//! from a name, so the same design produces the same examples on every
//! run. Declared examples and defaults always win over generated values.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

use crate::design::{AttrId, Design, TypeId};
use crate::types::{DataType, Primitive, is_primitive};
use crate::validation::{Format, ValidationRules};

/// Name-seeded random source plus the per-generation recursion guard.
pub struct ExampleGenerator {
    rng: StdRng,
    seen: HashSet<TypeId>,
}

impl ExampleGenerator {
    /// Seeds the generator from a name; the same name always yields the
    /// same sequence.
    pub fn new(seed: &str) -> Self {
        let mut h = DefaultHasher::new();
        seed.hash(&mut h);
        ExampleGenerator {
            rng: StdRng::seed_from_u64(h.finish()),
            seen: HashSet::new(),
        }
    }

    fn word(&mut self, min: usize, max: usize) -> String {
        let n = self.rng.gen_range(min..=max.max(min));
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(n)
            .map(char::from)
            .collect()
    }

    fn int(&mut self, rules: &ValidationRules) -> i64 {
        let lo = rules.minimum.map(|m| m.ceil() as i64).unwrap_or(-10_000);
        let hi = rules.maximum.map(|m| m.floor() as i64).unwrap_or(10_000);
        if lo >= hi { lo } else { self.rng.gen_range(lo..=hi) }
    }

    fn uint(&mut self, rules: &ValidationRules) -> u64 {
        let lo = rules.minimum.map(|m| m.max(0.0).ceil() as u64).unwrap_or(0);
        let hi = rules.maximum.map(|m| m.max(0.0).floor() as u64).unwrap_or(10_000);
        if lo >= hi { lo } else { self.rng.gen_range(lo..=hi) }
    }

    fn float(&mut self, rules: &ValidationRules) -> f64 {
        let lo = rules.minimum.unwrap_or(-10_000.0);
        let hi = rules.maximum.unwrap_or(10_000.0);
        if lo >= hi {
            lo
        } else {
            // Two decimal places keep the output readable.
            (self.rng.gen_range(lo..hi) * 100.0).round() / 100.0
        }
    }

    fn string(&mut self, rules: &ValidationRules) -> String {
        if let Some(format) = rules.format {
            return self.formatted(format);
        }
        let min = rules.min_length.unwrap_or(3);
        let max = rules.max_length.unwrap_or(min.max(12));
        self.word(min, max)
    }

    fn formatted(&mut self, format: Format) -> String {
        match format {
            Format::Date => "2015-08-06".to_string(),
            Format::DateTime => "2015-08-06T09:23:58Z".to_string(),
            Format::Uuid => {
                let mut bytes = [0u8; 16];
                self.rng.fill(&mut bytes);
                format!(
                    "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
                    bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6],
                    bytes[7], bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13],
                    bytes[14], bytes[15],
                )
            }
            Format::Email => format!("{}@example.com", self.word(3, 8)),
            Format::Hostname => format!("{}.example.com", self.word(3, 8)),
            Format::Ipv4 => {
                let octets: [u8; 4] = self.rng.r#gen();
                format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
            }
            Format::Ipv6 => "2001:db8::ff00:42:8329".to_string(),
            Format::Ip => {
                let octets: [u8; 4] = self.rng.r#gen();
                format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
            }
            Format::Uri => format!("https://example.com/{}", self.word(3, 8)),
            Format::Mac => "01:23:45:67:89:ab".to_string(),
            Format::Cidr => "192.168.100.0/24".to_string(),
            Format::Regexp => "^[a-z]+$".to_string(),
            Format::Json => "{\"key\":\"value\"}".to_string(),
            Format::Rfc1123 => "Mon, 04 Jun 2018 19:36:28 GMT".to_string(),
        }
    }
}

/// Example value for an attribute. Declared examples win, then the default
/// value, then an enum member, then a generated value of the type.
pub fn attr_example(d: &Design, aid: AttrId, g: &mut ExampleGenerator) -> Value {
    let att = d.attr(aid);
    if let Some(ex) = att.examples.first() {
        return ex.value.clone();
    }
    if let Some(def) = &att.default_value {
        return def.clone();
    }
    let rules = att.validation.clone().unwrap_or_default();
    if !rules.values.is_empty() {
        let i = g.rng.gen_range(0..rules.values.len());
        return rules.values[i].clone();
    }
    match att.ty.clone() {
        Some(ty) => typed_example(d, &ty, &rules, g),
        None => Value::Null,
    }
}

/// Example value for a bare type description.
pub fn type_example(d: &Design, dt: &DataType, g: &mut ExampleGenerator) -> Value {
    typed_example(d, dt, &ValidationRules::default(), g)
}

fn typed_example(d: &Design, dt: &DataType, rules: &ValidationRules, g: &mut ExampleGenerator) -> Value {
    match dt {
        DataType::Primitive(p) => primitive_example(*p, rules, g),
        DataType::Array { elem } => {
            let min = rules.min_length.unwrap_or(1);
            let max = rules.max_length.unwrap_or(min.max(3));
            let n = g.rng.gen_range(min..=max.max(min));
            (0..n).map(|_| attr_example(d, *elem, g)).collect()
        }
        DataType::Map { key, elem } => {
            // Only primitive-keyed maps generate entries; JSON keys must
            // render as strings.
            let keyable = d
                .attr(*key)
                .ty
                .as_ref()
                .is_some_and(|kt| is_primitive(d, kt));
            if !keyable {
                return json!({});
            }
            let n = g.rng.gen_range(1..=3usize);
            let mut out = serde_json::Map::new();
            for _ in 0..n {
                let k = match attr_example(d, *key, g) {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                let v = attr_example(d, *elem, g);
                out.insert(k, v);
            }
            Value::Object(out)
        }
        DataType::Object(o) => {
            let mut out = serde_json::Map::new();
            for (name, fid) in o.iter() {
                out.insert(name.to_string(), attr_example(d, fid, g));
            }
            Value::Object(out)
        }
        DataType::UserType(t) | DataType::ResultType(t) => {
            // Recursion guard: a type being generated yields null when it
            // reaches itself.
            if !g.seen.insert(*t) {
                return Value::Null;
            }
            let v = attr_example(d, d.type_node(*t).attr, g);
            g.seen.remove(t);
            v
        }
    }
}

fn primitive_example(p: Primitive, rules: &ValidationRules, g: &mut ExampleGenerator) -> Value {
    match p {
        Primitive::Boolean => json!(g.rng.r#gen::<bool>()),
        Primitive::Int | Primitive::Int32 | Primitive::Int64 => json!(g.int(rules)),
        Primitive::UInt | Primitive::UInt32 | Primitive::UInt64 => json!(g.uint(rules)),
        Primitive::Float32 | Primitive::Float64 => json!(g.float(rules)),
        Primitive::String | Primitive::Bytes => json!(g.string(rules)),
        Primitive::Any => json!(g.word(3, 8)),
    }
}
