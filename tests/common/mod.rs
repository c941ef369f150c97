//! Shared slice definitions for integration tests.

#![allow(dead_code)]

use substore::prelude::*;

/// `counter` slice: `{count: 0, inc}`.
pub fn counter_slice(cut: ScopedMutator, _read: GlobalReader) -> Record {
    let inc = {
        let cut = cut.clone();
        SliceAction::new(move |_| {
            cut.update(|rec| {
                let n = rec.get("count").and_then(Value::as_int).unwrap_or(0);
                Some(Record::new().field("count", n + 1))
            });
            Ok(Value::Null)
        })
    };
    Record::new().field("count", 0).action("inc", inc)
}

/// `todo` slice: `{items: [], add}`.
pub fn todo_slice(cut: ScopedMutator, _read: GlobalReader) -> Record {
    let add = {
        let cut = cut.clone();
        SliceAction::new(move |args| {
            let item = args.first().cloned().unwrap_or(Value::Null);
            cut.update(move |rec| {
                let mut items = rec
                    .get("items")
                    .and_then(Value::as_array)
                    .unwrap_or(&[])
                    .to_vec();
                items.push(item);
                Some(Record::new().field("items", items))
            });
            Ok(Value::Null)
        })
    };
    Record::new()
        .field("items", Vec::<Value>::new())
        .action("add", add)
}

/// `auth` slice: `{user: null, login}`.
pub fn auth_slice(cut: ScopedMutator, _read: GlobalReader) -> Record {
    let login = {
        let cut = cut.clone();
        SliceAction::new(move |args| {
            let name = args
                .first()
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::Precondition("login requires a user name".into()))?;
            cut.patch(Record::new().field("user", name));
            Ok(Value::Null)
        })
    };
    Record::new()
        .field("user", Value::Null)
        .action("login", login)
}

/// `cart` slice: `{items: [], add, checkout}`. `checkout` reads
/// `auth.user` through the global reader and fails when unauthenticated.
pub fn cart_slice(cut: ScopedMutator, read: GlobalReader) -> Record {
    let add = {
        let cut = cut.clone();
        SliceAction::new(move |args| {
            let item = args.first().cloned().unwrap_or(Value::Null);
            cut.update(move |rec| {
                let mut items = rec
                    .get("items")
                    .and_then(Value::as_array)
                    .unwrap_or(&[])
                    .to_vec();
                items.push(item);
                Some(Record::new().field("items", items))
            });
            Ok(Value::Null)
        })
    };
    let checkout = SliceAction::new(move |_| {
        let state = read.read();
        let user = state
            .slice("auth")
            .and_then(|r| r.get("user"))
            .cloned()
            .unwrap_or(Value::Null);
        if user.is_null() {
            return Err(Error::Precondition("not authenticated".into()));
        }
        let items = state
            .slice("cart")
            .and_then(|r| r.get("items"))
            .and_then(Value::as_array)
            .map(<[Value]>::len)
            .unwrap_or(0);
        Ok(Value::Int(items as i64))
    });
    Record::new()
        .field("items", Vec::<Value>::new())
        .action("add", add)
        .action("checkout", checkout)
}

/// Invoke an action on a live store by slice key and action name.
pub fn invoke(store: &Store, slice: &str, action: &str, args: &[Value]) -> Result<Value> {
    let record = store
        .get_state()
        .slice(slice)
        .cloned()
        .unwrap_or_else(|| panic!("no slice `{slice}`"));
    record.invoke(action, args)
}

/// Read a single field of a slice on a live store.
pub fn field_of(store: &Store, slice: &str, field: &str) -> Option<Value> {
    store
        .get_state()
        .slice(slice)
        .and_then(|r| r.get(field))
        .cloned()
}
