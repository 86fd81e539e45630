//! Wire encoder: the inverse traversal of the streaming decoder.

use std::collections::HashMap;

use wirespec_buffers::ChunkedBytes;

use crate::spec::Spec;
use crate::value::DecodedValue;

/// Lowers a [`DecodedValue`] into its wire representation under a spec.
///
/// The traversal binds length variables left to right, exactly as decoding
/// does, so selector and length fields must precede the fields that depend on
/// them. Pairing a value with a spec node of the wrong shape is a programmer
/// error and panics.
pub struct Encoder {
    spec: Spec,
}

impl Encoder {
    pub fn new(spec: Spec) -> Self {
        Self { spec }
    }

    /// Encodes one value. Each call starts from an empty environment.
    pub fn encode(&self, value: &DecodedValue) -> ChunkedBytes {
        let mut env = HashMap::new();
        encode_node(&self.spec, value, &mut env)
    }
}

fn encode_node(
    spec: &Spec,
    value: &DecodedValue,
    env: &mut HashMap<String, u64>,
) -> ChunkedBytes {
    match (spec, value) {
        (Spec::Skip(len), DecodedValue::Empty) => ChunkedBytes::zeros(*len as usize),
        (Spec::Integer(int), DecodedValue::Integer(value)) => int.encode(*value),
        (Spec::Variable(int, name), DecodedValue::Integer(value)) => {
            env.insert(name.clone(), *value);
            int.encode(*value)
        }
        (Spec::Bytes(name), DecodedValue::Bytes(bytes)) => {
            let declared = lookup(env, name);
            if bytes.len() as u64 != declared {
                panic!(
                    "bytes field `{name}` holds {} bytes but its length variable says {declared}",
                    bytes.len()
                );
            }
            bytes.clone()
        }
        (Spec::Seq(specs), DecodedValue::Seq(values)) => {
            if specs.len() != values.len() {
                panic!(
                    "sequence of {} spec nodes cannot encode {} values",
                    specs.len(),
                    values.len()
                );
            }
            let mut out = ChunkedBytes::new();
            for (child_spec, child) in specs.iter().zip(values) {
                out.append(encode_node(child_spec, child, env));
            }
            out
        }
        (Spec::Until(name, inner), DecodedValue::Seq(values)) => {
            let declared = lookup(env, name) as usize;
            // Same scope isolation as the decoder's sub-parse.
            let mut inner_env = HashMap::new();
            let mut out = ChunkedBytes::new();
            for child in values {
                out.append(encode_node(inner, child, &mut inner_env));
            }
            out.resize(declared);
            out
        }
        (Spec::Repeat(name, inner), DecodedValue::Seq(values)) => {
            let declared = lookup(env, name);
            if values.len() as u64 != declared {
                panic!(
                    "repetition holds {} values but its count variable `{name}` says {declared}",
                    values.len()
                );
            }
            let mut out = ChunkedBytes::new();
            for child in values {
                out.append(encode_node(inner, child, env));
            }
            out
        }
        (
            Spec::Switch {
                selector,
                cases,
                default,
            },
            value,
        ) => {
            let chosen = cases.get(&lookup(env, selector)).unwrap_or(&**default);
            encode_node(chosen, value, env)
        }
        (spec, value) => panic!("cannot encode {value:?} against {spec:?}"),
    }
}

fn lookup(env: &HashMap<String, u64>, name: &str) -> u64 {
    match env.get(name) {
        Some(value) => *value,
        None => panic!("unbound length variable `{name}`"),
    }
}
