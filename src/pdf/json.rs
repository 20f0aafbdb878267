//! JSON projection of PDF objects
//!
//! Names and strings keep every byte (mapped onto U+0000..U+00FF), streams
//! become `{dictionary, buffer}` and references become
//! `{object_number, generation_number}`.

use lopdf::{Dictionary, Object, Stream};
use serde_json::{json, Map, Value};

use super::parser::latin1;

pub fn object_to_json(object: &Object) -> Value {
    match object {
        Object::Null => Value::Null,
        Object::Boolean(value) => Value::Bool(*value),
        Object::Integer(value) => json!(*value),
        Object::Real(value) => json!(*value as f64),
        Object::Name(name) => Value::String(latin1(name)),
        Object::String(bytes, _) => Value::String(latin1(bytes)),
        Object::Array(items) => Value::Array(items.iter().map(object_to_json).collect()),
        Object::Dictionary(dict) => dictionary_to_json(dict),
        Object::Stream(stream) => stream_to_json(stream),
        Object::Reference((number, generation)) => json!({
            "object_number": number,
            "generation_number": generation,
        }),
    }
}

pub fn dictionary_to_json(dict: &Dictionary) -> Value {
    dictionary_without(dict, &[])
}

/// Dictionary projection with `excluded` keys left out
pub fn dictionary_without(dict: &Dictionary, excluded: &[&[u8]]) -> Value {
    let map: Map<String, Value> = dict
        .iter()
        .filter(|(key, _)| !excluded.contains(&key.as_slice()))
        .map(|(key, value)| (latin1(key), object_to_json(value)))
        .collect();
    Value::Object(map)
}

pub fn stream_to_json(stream: &Stream) -> Value {
    json!({
        "dictionary": dictionary_to_json(&stream.dict),
        "buffer": latin1(&stream.content),
    })
}
