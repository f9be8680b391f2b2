use crate::error::{CapnodeError, CapnodeErrorKind, Result};
use crate::id::IdSource;
use crate::shape::Shape;
use crate::tables::MethodTable;
use crate::value::ApiValue;

/// Recursion depth past which `serialize` refuses to continue and
/// reports [`CapnodeErrorKind::InvalidValue`].
///
/// The specification asks the Serializer to reject cyclic input
/// graphs. `ApiValue` is an owned tree (`Object`/`Array` hold their
/// children by value, not by shared `Rc`/`RefCell` reference), so a
/// true reference cycle cannot be constructed in the first place --
/// Rust's ownership rules enforce the specification's acyclicity
/// precondition at the type level. This depth cap instead guards
/// against the practical failure mode of a deeply nested (but finite)
/// tree blowing the stack, which the identity-tracking cycle check in
/// a dynamically-typed host language would not catch either.
const MAX_DEPTH: usize = 256;

/// Walks a local [`ApiValue`] tree, producing its [`Shape`] and
/// registering every `Function` leaf in `methods` under a fresh
/// handle minted by `ids`.
pub fn serialize(value: &ApiValue, methods: &MethodTable, ids: &dyn IdSource) -> Result<Shape> {
    serialize_at_depth(value, methods, ids, 0)
}

fn serialize_at_depth(value: &ApiValue, methods: &MethodTable, ids: &dyn IdSource, depth: usize) -> Result<Shape> {
    if depth > MAX_DEPTH {
        return Err(CapnodeError::new(
            CapnodeErrorKind::InvalidValue,
            format!("value nesting exceeds maximum depth of {}", MAX_DEPTH),
        ));
    }
    match value {
        ApiValue::String(s) => Ok(Shape::Str { value: s.clone() }),
        ApiValue::Number(n) => Ok(Shape::Number { value: n.clone() }),
        ApiValue::Array(items) => {
            let mut shapes = Vec::with_capacity(items.len());
            for item in items {
                shapes.push(serialize_at_depth(item, methods, ids, depth + 1)?);
            }
            Ok(Shape::Array { value: shapes })
        }
        ApiValue::Object(entries) => {
            let mut shapes = std::collections::BTreeMap::new();
            for (k, v) in entries {
                shapes.insert(k.clone(), serialize_at_depth(v, methods, ids, depth + 1)?);
            }
            Ok(Shape::Object { value: shapes })
        }
        ApiValue::Function(f) => {
            let handle = ids.next_handle();
            methods.insert(handle.clone(), f.clone());
            Ok(Shape::Function { method_id: handle })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::test_support::CountingIdSource;

    #[test]
    fn primitives_round_trip_shape() {
        let methods = MethodTable::new();
        let ids = CountingIdSource::default();
        let v = ApiValue::object(vec![
            ("name".to_string(), ApiValue::str("alice")),
            ("age".to_string(), ApiValue::num(30)),
        ]);
        let shape = serialize(&v, &methods, &ids).unwrap();
        let json = serde_json::to_value(&shape).unwrap();
        assert_eq!(json["type"], "object");
        assert_eq!(json["value"]["name"]["value"], "alice");
        assert_eq!(json["value"]["age"]["value"], 30);
    }

    #[test]
    fn function_leaves_register_distinct_handles() {
        let methods = MethodTable::new();
        let ids = CountingIdSource::default();
        let f = ApiValue::function(|_args| Box::pin(async { Ok(ApiValue::str("hi")) }));
        let v = ApiValue::array(vec![f.clone(), f]);
        let shape = serialize(&v, &methods, &ids).unwrap();
        match shape {
            Shape::Array { value } => {
                let ids: Vec<_> = value
                    .into_iter()
                    .map(|s| match s {
                        Shape::Function { method_id } => method_id,
                        _ => panic!("expected function shape"),
                    })
                    .collect();
                assert_ne!(ids[0], ids[1]);
                assert_eq!(methods.len(), 2);
            }
            _ => panic!("expected array shape"),
        }
    }

    #[test]
    fn excessive_depth_is_rejected() {
        let methods = MethodTable::new();
        let ids = CountingIdSource::default();
        let mut v = ApiValue::str("leaf");
        for _ in 0..(MAX_DEPTH + 10) {
            v = ApiValue::array(vec![v]);
        }
        let err = serialize(&v, &methods, &ids).unwrap_err();
        assert_eq!(err.kind, CapnodeErrorKind::InvalidValue);
    }
}
