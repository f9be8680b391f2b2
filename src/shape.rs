use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::Handle;

/// Wire description of an [`ApiValue`](crate::value::ApiValue) tree:
/// identical in shape, except every `Function` leaf has been replaced
/// by the [`Handle`] under which the exporting peer registered it.
///
/// The wire grammar (see the module-level docs of `capnode`) is a JSON
/// object tagged by `type`; `serde`'s internal tagging reproduces it
/// directly, since each variant names its own payload field
/// (`value` for the data-bearing variants, `methodId` for `Function`).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    #[serde(rename = "string")]
    Str { value: String },
    #[serde(rename = "number")]
    Number { value: serde_json::Number },
    Object { value: BTreeMap<String, Shape> },
    Array { value: Vec<Shape> },
    Function {
        #[serde(rename = "methodId")]
        method_id: Handle,
    },
}
